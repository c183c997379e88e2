//! Host-side collaborators shared by every client.
//!
//! # Design
//! The host application owns configuration, credential storage and log
//! sinks. The client layer only reads them, through the narrow traits below,
//! bundled into one `Integration` value that the router hands to each client
//! it builds. All traits are `Send + Sync` so the context can sit behind an
//! `Arc`.

use std::sync::Arc;

use serde_json::{Map, Value};

/// Read-only key/value configuration lookup.
pub trait Config: Send + Sync {
    fn get_value(&self, key: &str) -> Option<Value>;

    /// Truthiness of a key: `true`, non-zero numbers and non-empty strings.
    fn flag(&self, key: &str) -> bool {
        match self.get_value(key) {
            Some(Value::Bool(b)) => b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            Some(Value::String(s)) => !s.is_empty() && s != "0" && s != "false",
            _ => false,
        }
    }

    /// Non-negative integer value, accepting numeric strings.
    fn integer(&self, key: &str) -> Option<u64> {
        match self.get_value(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn string(&self, key: &str) -> Option<String> {
        match self.get_value(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Configuration backed by a JSON object document.
#[derive(Debug, Clone, Default)]
pub struct DefaultConfig {
    values: Map<String, Value>,
}

impl DefaultConfig {
    /// Parse `raw` as a JSON object. Anything else yields an empty config.
    pub fn new(raw: &str) -> Self {
        let values = match serde_json::from_str(raw) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Self { values }
    }

    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

impl Config for DefaultConfig {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }
}

/// Credential source for the Cloudflare API.
pub trait DataStore: Send + Sync {
    fn client_v4_api_key(&self) -> Option<String>;
    fn cloudflare_email(&self) -> Option<String>;
}

/// Credentials held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataStore {
    pub api_key: Option<String>,
    pub email: Option<String>,
}

impl MemoryDataStore {
    pub fn new(api_key: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            email: Some(email.into()),
        }
    }
}

impl DataStore for MemoryDataStore {
    fn client_v4_api_key(&self) -> Option<String> {
        self.api_key.clone()
    }

    fn cloudflare_email(&self) -> Option<String> {
        self.email.clone()
    }
}

/// Leveled sink for pre-formatted log lines.
pub trait Logger: Send + Sync {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Forwards to `tracing` under the `cf_api` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, message: &str) {
        tracing::error!(target: "cf_api", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "cf_api", "{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "cf_api", "{message}");
    }
}

/// Shared context every client is bound to.
#[derive(Clone)]
pub struct Integration {
    config: Arc<dyn Config>,
    data_store: Arc<dyn DataStore>,
    logger: Arc<dyn Logger>,
}

impl Integration {
    pub fn new(
        config: Arc<dyn Config>,
        data_store: Arc<dyn DataStore>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            config,
            data_store,
            logger,
        }
    }

    /// Context that logs through `tracing`.
    pub fn with_tracing(config: Arc<dyn Config>, data_store: Arc<dyn DataStore>) -> Self {
        Self::new(config, data_store, Arc::new(TracingLogger))
    }

    pub fn config(&self) -> &dyn Config {
        self.config.as_ref()
    }

    pub fn data_store(&self) -> &dyn DataStore {
        self.data_store.as_ref()
    }

    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }
}

impl std::fmt::Debug for Integration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Integration").finish_non_exhaustive()
    }
}
