//! Cloudflare v4 client backend.
//!
//! # Design
//! Credentials come from the host's data store on every call, so a key
//! rotated in the host takes effect without rebuilding the client. The auth
//! scheme is picked from the credential's shape: legacy global API keys are
//! 37 lowercase hex characters and travel as `X-Auth-Key` + `X-Auth-Email`;
//! anything else is treated as an API token and sent as a bearer header.
//! A token that happens to look like a legacy key is misclassified; the
//! heuristic is kept because hosts store both kinds in the same field.

use std::sync::Arc;

use serde_json::Value;

use crate::client::{ApiBackend, ApiClient};
use crate::error::ApiError;
use crate::http::{Request, StringMap, APPLICATION_JSON, CONTENT_TYPE};
use crate::integration::{Config, Integration};
use crate::transport::Transport;
use crate::types::ApiResponse;

pub const CLIENT_API_NAME: &str = "CLIENT API";
pub const ENDPOINT: &str = "https://api.cloudflare.com/client/v4/";

pub const X_AUTH_KEY: &str = "X-Auth-Key";
pub const X_AUTH_EMAIL: &str = "X-Auth-Email";
pub const AUTHORIZATION: &str = "Authorization";
pub const USER_AGENT: &str = "User-Agent";

/// Browser-side form token; never forwarded upstream.
pub const CSRF_TOKEN_FIELD: &str = "cfCSRFToken";

const LEGACY_KEY_LEN: usize = 37;

/// Headers `before_send` owns; caller-supplied copies are dropped.
const MANAGED_HEADERS: [&str; 5] = [X_AUTH_KEY, X_AUTH_EMAIL, AUTHORIZATION, CONTENT_TYPE, USER_AGENT];

#[derive(Debug, Clone)]
pub struct CloudflareBackend {
    endpoint: String,
}

impl CloudflareBackend {
    pub fn new() -> Self {
        Self::with_endpoint(ENDPOINT)
    }

    /// Point the backend somewhere other than the public API.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let mut endpoint = endpoint.into();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        Self { endpoint }
    }
}

impl Default for CloudflareBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// True for a legacy global API key: 37 lowercase hex characters.
pub fn is_legacy_api_key(key: &str) -> bool {
    key.len() == LEGACY_KEY_LEN && key.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// `cf-api-core/<version>`, prefixed by the host's `user_agent_prefix` when set.
pub fn user_agent(config: &dyn Config) -> String {
    let own = concat!("cf-api-core/", env!("CARGO_PKG_VERSION"));
    match config.string("user_agent_prefix") {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}; {own}"),
        _ => own.to_string(),
    }
}

impl ApiBackend for CloudflareBackend {
    fn client_name(&self) -> &str {
        CLIENT_API_NAME
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn before_send(&self, integration: &Integration, mut request: Request) -> Request {
        let mut headers: StringMap = request
            .headers()
            .iter()
            .filter(|(name, _)| !MANAGED_HEADERS.iter().any(|m| m.eq_ignore_ascii_case(name)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let store = integration.data_store();
        match store.client_v4_api_key() {
            Some(key) if is_legacy_api_key(&key) => {
                headers.insert(X_AUTH_KEY.to_string(), key);
                headers.insert(
                    X_AUTH_EMAIL.to_string(),
                    store.cloudflare_email().unwrap_or_default(),
                );
            }
            Some(token) if !token.is_empty() => {
                headers.insert(AUTHORIZATION.to_string(), format!("Bearer {token}"));
            }
            _ => integration
                .logger()
                .debug(&format!("[{CLIENT_API_NAME}] no API credential stored, sending without auth")),
        }

        headers.insert(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string());
        headers.insert(USER_AGENT.to_string(), user_agent(integration.config()));
        request.set_headers(headers);

        if let Value::Object(body) = request.body() {
            if body.contains_key(CSRF_TOKEN_FIELD) {
                let mut scrubbed = body.clone();
                scrubbed.remove(CSRF_TOKEN_FIELD);
                request.set_body(Value::Object(scrubbed));
            }
        }

        request
    }

    fn response_ok(&self, response: &Value) -> bool {
        response.get("success").and_then(Value::as_bool) == Some(true)
    }

    /// First `errors[].message` of the upstream body, else the error text.
    fn error_message(&self, error: &ApiError) -> String {
        error
            .body()
            .and_then(|body| serde_json::from_str::<Value>(body).ok())
            .and_then(|json| {
                json.get("errors")?
                    .get(0)?
                    .get("message")?
                    .as_str()
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| error.to_string())
    }

    fn create_api_error(&self, integration: &Integration, message: &str) -> Value {
        integration.logger().error(message);
        ApiResponse::failure(message).into()
    }
}

pub type CloudflareClient = ApiClient<CloudflareBackend>;

impl ApiClient<CloudflareBackend> {
    /// Client for the public Cloudflare API.
    pub fn cloudflare(integration: Arc<Integration>, transport: Box<dyn Transport>) -> Self {
        ApiClient::new(CloudflareBackend::new(), integration, transport)
    }

    /// `GET zones/:zone_tag`
    pub fn zone_get_details(&self, zone_tag: &str) -> Value {
        self.call_api(Request::get(format!("zones/{zone_tag}")))
    }
}
