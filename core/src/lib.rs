//! Outbound REST client layer for the Cloudflare v4 API.
//!
//! # Overview
//! A host application hands `Request` values to a `RequestRouter`, which
//! picks the client whose endpoint the URL belongs to. The client runs the
//! call pipeline: authentication, dispatch through an injected `Transport`,
//! merging of paginated GET results, and normalization of every failure into
//! the `{result, success, errors, messages}` envelope.
//!
//! # Design
//! - Calls are synchronous and blocking; pages of one call go out strictly
//!   in order.
//! - `ApiClient::call_api` never returns an error. Transport and decode
//!   failures become a `success: false` result and are logged.
//! - Per-API behavior is an `ApiBackend` implementation; `CloudflareBackend`
//!   is the one shipped here.
//! - Config, credentials and logging belong to the host and are reached
//!   through the `Integration` context.

pub mod client;
pub mod cloudflare;
pub mod error;
pub mod http;
pub mod integration;
pub mod router;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::{ApiBackend, ApiCaller, ApiClient};
pub use cloudflare::{CloudflareBackend, CloudflareClient};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Request, StringMap};
pub use integration::{Config, DataStore, DefaultConfig, Integration, Logger, MemoryDataStore, TracingLogger};
pub use router::{RequestRouter, RestRouter, RouteOutcome, RouteParams, RouteTable};
pub use transport::{Transport, UreqTransport};
pub use types::{ApiResponse, ErrorRecord};
