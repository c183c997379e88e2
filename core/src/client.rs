//! The call pipeline shared by every backend.
//!
//! # Design
//! `ApiClient<B>` owns the control flow of one logical call:
//! `before_send` → `send_request` → `paginated_results`, with every failure
//! caught at `call_api` and turned into the backend's normalized error
//! result. What differs per upstream API (auth headers, success predicate,
//! error-body shape, endpoint) lives behind the small `ApiBackend` trait, so
//! the orchestrator is generic over it instead of relying on subclassing.
//!
//! `ApiCaller` is the object-safe face of a client that routers hold, which
//! lets one router mix clients for different backends.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Request, APPLICATION_JSON, CONTENT_TYPE};
use crate::integration::Integration;
use crate::transport::Transport;
use crate::types::ApiResponse;

/// Page cap applied when the host config has no `max_pages`.
pub const DEFAULT_MAX_PAGES: u64 = 100;

/// Attached to `result_info.notify` once pages have been merged.
pub const PAGINATION_NOTICE: &str =
    "Backend has taken care of pagination. Output is merged in results.";

const REDACTED_HEADERS: [&str; 2] = ["authorization", "x-auth-key"];

/// Per-API behavior plugged into the pipeline.
pub trait ApiBackend: Send + Sync {
    /// Tag used in log lines.
    fn client_name(&self) -> &str;

    /// Base URL for dispatch and for routing.
    fn endpoint(&self) -> &str;

    /// Attach authentication and scrub the outbound request.
    fn before_send(&self, integration: &Integration, request: Request) -> Request;

    /// Whether a decoded body reports success.
    fn response_ok(&self, response: &Value) -> bool;

    /// Human-readable message for a failed call.
    fn error_message(&self, error: &ApiError) -> String {
        error.to_string()
    }

    /// The failure result handed back to callers.
    fn create_api_error(&self, integration: &Integration, message: &str) -> Value {
        integration.logger().error(message);
        ApiResponse::failure(message).into()
    }
}

/// What routers need from a client, independent of its backend type.
pub trait ApiCaller: Send + Sync {
    fn client_name(&self) -> &str;
    fn endpoint(&self) -> &str;
    fn call_api(&self, request: Request) -> Value;
    fn should_route_request(&self, request: &Request) -> bool;
    fn path_of(&self, request: &Request) -> String;
}

pub struct ApiClient<B> {
    backend: B,
    integration: Arc<Integration>,
    transport: Box<dyn Transport>,
    max_pages: u64,
}

impl<B: ApiBackend> ApiClient<B> {
    pub fn new(backend: B, integration: Arc<Integration>, transport: Box<dyn Transport>) -> Self {
        let max_pages = integration
            .config()
            .integer("max_pages")
            .filter(|pages| *pages > 0)
            .unwrap_or(DEFAULT_MAX_PAGES);
        Self {
            backend,
            integration,
            transport,
            max_pages,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn integration(&self) -> &Integration {
        &self.integration
    }

    pub fn set_transport(&mut self, transport: Box<dyn Transport>) {
        self.transport = transport;
    }

    /// Run one logical call. Never fails: errors come back as the backend's
    /// normalized failure result.
    pub fn call_api(&self, request: Request) -> Value {
        let request = self.backend.before_send(&self.integration, request);

        let outcome = self
            .send_request(&request)
            .and_then(|response| self.paginated_results(&request, response));

        match outcome {
            Ok(response) => response,
            Err(error) => {
                let message = self.backend.error_message(&error);
                self.log_api_call(&request_dump(&request), true);
                self.log_api_call(
                    &json!({
                        "type": "response",
                        "code": error.status(),
                        "body": message,
                        "detail": format!("{error:?}"),
                    }),
                    true,
                );
                self.backend.create_api_error(&self.integration, &message)
            }
        }
    }

    /// Execute a single wire request and decode its JSON body.
    ///
    /// A decoded body the backend does not consider successful is logged
    /// and still returned.
    pub fn send_request(&self, request: &Request) -> Result<Value, ApiError> {
        let wire = self.build_http_request(request)?;
        let debug = self.integration.config().flag("debug");

        if debug {
            self.log_api_call(&wire_dump(&wire), false);
        }

        let response = self.transport.send(&wire)?;

        if debug {
            self.log_api_call(
                &json!({"type": "wire-response", "status": response.status, "body": response.body}),
                false,
            );
        }

        check_status(&response)?;

        let decoded: Value = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))?;

        if !self.backend.response_ok(&decoded) {
            self.log_api_call(&json!({"type": "response", "body": decoded}), true);
        }

        Ok(decoded)
    }

    /// Resolve the URL against the endpoint and encode the body.
    pub fn build_http_request(&self, request: &Request) -> Result<HttpRequest, ApiError> {
        let json_body = request.header(CONTENT_TYPE) == Some(APPLICATION_JSON);

        let body = match request.body() {
            Value::Null => None,
            Value::Object(map) if map.is_empty() && request.is_get() => None,
            Value::String(raw) if !json_body => Some(raw.clone()),
            other => Some(
                serde_json::to_string(other)
                    .map_err(|e| ApiError::SerializationError(e.to_string()))?,
            ),
        };

        Ok(HttpRequest {
            method: HttpMethod::parse(request.method()),
            url: resolve_url(self.backend.endpoint(), request.url()),
            headers: request
                .headers()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            query: request
                .parameters()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            body,
        })
    }

    /// Fetch pages 2..=total_pages of a GET and concatenate their `result`
    /// arrays onto the first page.
    pub fn paginated_results(&self, request: &Request, response: Value) -> Result<Value, ApiError> {
        if !request.is_get() {
            return Ok(response);
        }
        let Some(total_pages) = total_pages(&response) else {
            return Ok(response);
        };

        let last_page = if total_pages > self.max_pages {
            self.log_warning(&format!(
                "upstream reported {total_pages} pages, fetching only the first {}",
                self.max_pages
            ));
            self.max_pages
        } else {
            total_pages
        };

        let mut merged = response;
        let mut paged = request.clone();
        let mut current_page = 2;

        while current_page <= last_page {
            let mut parameters = request.parameters().clone();
            parameters.insert("page".to_string(), current_page.to_string());
            paged.set_parameters(parameters);

            let page = self.send_request(&paged)?;
            append_results(&mut merged, page);
            mark_merged(&mut merged);

            current_page += 1;
        }

        Ok(merged)
    }

    /// Everything in the request URL after this client's endpoint.
    pub fn path_of(&self, request: &Request) -> String {
        let url = request.url();
        let endpoint = self.backend.endpoint();
        match url.find(endpoint) {
            Some(start) if !endpoint.is_empty() => url[start + endpoint.len()..].to_string(),
            _ => url.to_string(),
        }
    }

    pub fn should_route_request(&self, request: &Request) -> bool {
        let endpoint = self.backend.endpoint();
        !endpoint.is_empty() && request.url().contains(endpoint)
    }

    /// Log `[<client name>] <payload>`; non-string payloads are pretty-printed.
    pub fn log_api_call(&self, payload: &Value, is_error: bool) {
        let message = format!("[{}] {}", self.backend.client_name(), printable(payload));
        let logger = self.integration.logger();
        if is_error {
            logger.error(&message);
        } else {
            logger.debug(&message);
        }
    }

    fn log_warning(&self, message: &str) {
        self.integration
            .logger()
            .warn(&format!("[{}] {message}", self.backend.client_name()));
    }
}

impl<B: ApiBackend> ApiCaller for ApiClient<B> {
    fn client_name(&self) -> &str {
        self.backend.client_name()
    }

    fn endpoint(&self) -> &str {
        self.backend.endpoint()
    }

    fn call_api(&self, request: Request) -> Value {
        ApiClient::call_api(self, request)
    }

    fn should_route_request(&self, request: &Request) -> bool {
        ApiClient::should_route_request(self, request)
    }

    fn path_of(&self, request: &Request) -> String {
        ApiClient::path_of(self, request)
    }
}

/// Map non-2xx statuses to `ApiError::HttpError`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}

fn resolve_url(endpoint: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") || endpoint.is_empty() {
        return url.to_string();
    }
    let base = endpoint.trim_end_matches('/');
    format!("{base}/{}", url.trim_start_matches('/'))
}

fn total_pages(response: &Value) -> Option<u64> {
    match response.get("result_info")?.get("total_pages")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn append_results(merged: &mut Value, page: Value) {
    let Value::Object(fields) = merged else {
        return;
    };
    let results = fields
        .entry("result")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !results.is_array() {
        *results = Value::Array(Vec::new());
    }
    if let (Value::Array(acc), Some(Value::Array(items))) = (results, page.get("result")) {
        acc.extend(items.iter().cloned());
    }
}

fn mark_merged(merged: &mut Value) {
    if let Some(info) = merged.get_mut("result_info").and_then(Value::as_object_mut) {
        info.insert("notify".to_string(), Value::from(PAGINATION_NOTICE));
        info.insert("page".to_string(), Value::from(-1));
        info.insert("count".to_string(), Value::from(-1));
    }
}

fn redact_headers<'a>(headers: impl Iterator<Item = (&'a String, &'a String)>) -> Value {
    let map = headers
        .map(|(name, value)| {
            let shown = if REDACTED_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
                "[redacted]".to_string()
            } else {
                value.clone()
            };
            (name.clone(), Value::String(shown))
        })
        .collect();
    Value::Object(map)
}

fn request_dump(request: &Request) -> Value {
    json!({
        "type": "request",
        "method": request.method(),
        "path": request.url(),
        "headers": redact_headers(request.headers().iter()),
        "params": request.parameters(),
        "body": request.body(),
    })
}

fn wire_dump(wire: &HttpRequest) -> Value {
    json!({
        "type": "wire-request",
        "method": wire.method.as_str(),
        "url": wire.url,
        "headers": redact_headers(wire.headers.iter().map(|(k, v)| (k, v))),
        "query": wire.query,
        "body": wire.body,
    })
}

fn printable(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
