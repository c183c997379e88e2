//! Error types for the API client pipeline.
//!
//! # Design
//! These errors never leave `ApiClient::call_api`: the pipeline converts every
//! variant into the normalized failure result. They exist so the individual
//! steps (encode, send, decode, paginate) can propagate with `?` and so a
//! backend can inspect the raw failure when extracting a readable message.
//! `HttpError` keeps the raw body because upstream APIs put structured error
//! payloads there.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP status (DNS, connect, TLS, timeout).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body was not valid JSON.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request body could not be encoded as JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A route handler rejected the request before it reached the transport.
    #[error("invalid route: {0}")]
    InvalidRoute(String),
}

impl ApiError {
    /// HTTP status carried by the error, or 0 when none was received.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::HttpError { status, .. } => *status,
            _ => 0,
        }
    }

    /// Raw response body, when the server sent one.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::HttpError { body, .. } => Some(body),
            _ => None,
        }
    }
}
