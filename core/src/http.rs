//! Request value object and the plain-data wire types.
//!
//! # Design
//! `Request` is what callers and the router hand to a client: a verb, a
//! (possibly relative) URL, headers, query parameters and a JSON body. Its
//! collections are only ever replaced as a whole through the setters, so a
//! pagination rewrite or an auth hook never mutates a map another owner is
//! still looking at.
//!
//! `HttpRequest` / `HttpResponse` describe a single wire exchange as owned
//! data. The pipeline builds the former and interprets the latter; the
//! `Transport` in between is the only code that touches the network.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const APPLICATION_JSON: &str = "application/json";

/// Ordered string map used for headers and query parameters.
pub type StringMap = BTreeMap<String, String>;

/// A logical API call as seen by clients and routers.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: String,
    url: String,
    headers: StringMap,
    parameters: StringMap,
    body: Value,
}

impl Request {
    /// No validation happens here; a bad verb or URL is rejected by the
    /// transport when the request is sent.
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        parameters: StringMap,
        body: Value,
    ) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: StringMap::new(),
            parameters,
            body,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url, StringMap::new(), Value::Null)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn set_method(&mut self, method: impl Into<String>) {
        self.method = method.into();
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn headers(&self) -> &StringMap {
        &self.headers
    }

    pub fn set_headers(&mut self, headers: StringMap) {
        self.headers = headers;
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn parameters(&self) -> &StringMap {
        &self.parameters
    }

    pub fn set_parameters(&mut self, parameters: StringMap) {
        self.parameters = parameters;
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn set_body(&mut self, body: Value) {
        self.body = body;
    }

    /// True when the verb is GET, ignoring case.
    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// HTTP method of a wire request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    /// Anything else; transports decide whether they can send it.
    Other(String),
}

impl HttpMethod {
    pub fn parse(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            _ => HttpMethod::Other(method.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Other(method) => method,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data. Every status is represented
/// here; interpreting it is the pipeline's job.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
