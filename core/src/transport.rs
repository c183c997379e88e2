//! The network boundary.
//!
//! # Design
//! `Transport` is the only seam that performs I/O. Clients own their transport
//! (boxed) instead of reaching for a shared global, so tests inject a scripted
//! one and hosts can swap it at runtime. A transport reports every HTTP status
//! as data; only failures that produced no response at all become errors.
//!
//! Calls are blocking and a client issues them strictly one after another.
//! Timeouts are transport configuration, not pipeline behavior.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::integration::Config;

pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// One transport instance can back several clients.
impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).send(request)
    }
}

/// Blocking transport on top of a `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Disables ureq's status-code-as-error behavior so 4xx/5xx responses
    /// reach the pipeline as data.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Reads `timeout_seconds` from the host configuration.
    pub fn from_config(config: &dyn Config) -> Self {
        let timeout = config
            .integer("timeout_seconds")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        Self::with_timeout(timeout)
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url.as_str();
        let body = request.body.as_deref();

        let result = match &request.method {
            HttpMethod::Get => match body {
                Some(b) => prepare(self.agent.get(url), request).force_send_body().send(b.as_bytes()),
                None => prepare(self.agent.get(url), request).call(),
            },
            HttpMethod::Delete => match body {
                Some(b) => prepare(self.agent.delete(url), request).force_send_body().send(b.as_bytes()),
                None => prepare(self.agent.delete(url), request).call(),
            },
            HttpMethod::Post => match body {
                Some(b) => prepare(self.agent.post(url), request).send(b.as_bytes()),
                None => prepare(self.agent.post(url), request).send_empty(),
            },
            HttpMethod::Put => match body {
                Some(b) => prepare(self.agent.put(url), request).send(b.as_bytes()),
                None => prepare(self.agent.put(url), request).send_empty(),
            },
            HttpMethod::Patch => match body {
                Some(b) => prepare(self.agent.patch(url), request).send(b.as_bytes()),
                None => prepare(self.agent.patch(url), request).send_empty(),
            },
            HttpMethod::Other(method) => {
                return Err(ApiError::Transport(format!("unsupported HTTP method {method}")));
            }
        };

        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn prepare<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    for (key, value) in &request.query {
        builder = builder.query(key, value);
    }
    builder
}
