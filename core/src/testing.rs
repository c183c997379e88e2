//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::integration::{DefaultConfig, Integration, Logger, MemoryDataStore};
use crate::transport::Transport;

/// Replays queued responses in order and records every request it was given.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, ApiError>>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push_json(&self, status: u16, body: Value) {
        self.push_raw(status, &body.to_string());
    }

    pub(crate) fn push_raw(&self, status: u16, body: &str) {
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }));
    }

    pub(crate) fn push_error(&self, error: ApiError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub(crate) fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.sent.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no scripted response left".to_string())))
    }
}

#[derive(Default)]
pub(crate) struct RecordingLogger {
    lines: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingLogger {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn at(&self, level: &str) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line.clone())
            .collect()
    }

    pub(crate) fn errors(&self) -> Vec<String> {
        self.at("error")
    }

    pub(crate) fn warnings(&self) -> Vec<String> {
        self.at("warn")
    }

    pub(crate) fn debugs(&self) -> Vec<String> {
        self.at("debug")
    }
}

impl Logger for RecordingLogger {
    fn error(&self, message: &str) {
        self.lines.lock().unwrap().push(("error", message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.lines.lock().unwrap().push(("warn", message.to_string()));
    }

    fn debug(&self, message: &str) {
        self.lines.lock().unwrap().push(("debug", message.to_string()));
    }
}

pub(crate) fn integration(
    config: &str,
    store: MemoryDataStore,
    logger: Arc<RecordingLogger>,
) -> Arc<Integration> {
    Arc::new(Integration::new(
        Arc::new(DefaultConfig::new(config)),
        Arc::new(store),
        logger,
    ))
}
