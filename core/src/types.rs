//! Result envelope shared by every backend.
//!
//! # Design
//! `ApiClient::call_api` returns `serde_json::Value` so that successful calls
//! hand back the decoded body untouched, extra fields included. These typed
//! views exist for constructing the normalized failure result and for callers
//! that want to read the envelope without indexing into JSON by hand.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the `errors` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorRecord {
    /// Upstream error code; empty for locally produced failures. Upstream
    /// codes may be numbers, so any JSON scalar is accepted and kept as text.
    #[serde(default, deserialize_with = "code_as_string")]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Typed view of the `{result, success, errors, messages}` envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ErrorRecord>,
    #[serde(default)]
    pub messages: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_info: Option<Value>,
}

impl ApiResponse {
    /// The normalized failure: null result and a single error with an empty code.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            result: Value::Null,
            success: false,
            errors: vec![ErrorRecord {
                code: String::new(),
                message: message.into(),
            }],
            messages: Vec::new(),
            result_info: None,
        }
    }

    /// Read the envelope out of a decoded body. Missing fields take defaults.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// First error message, if any.
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(|e| e.message.as_str())
    }
}

impl From<ApiResponse> for Value {
    fn from(response: ApiResponse) -> Self {
        serde_json::to_value(response).unwrap_or(Value::Null)
    }
}

fn code_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
