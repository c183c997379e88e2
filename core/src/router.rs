//! Dispatch of inbound requests to the client that owns their endpoint.
//!
//! # Design
//! `RequestRouter` keeps one `RestRouter` per registered API family, each
//! wrapping a client built once from the shared `Integration`. Selection is
//! first match in registration order on `ApiCaller::should_route_request`,
//! so with overlapping endpoints the earlier registration always wins.
//!
//! A `RestRouter` looks the request's path up in its `RouteTable`. A hit runs
//! the handler; a miss proxies the request straight to `call_api`. Results
//! come back as `RouteOutcome`, which keeps "nobody claimed this request"
//! apart from "a client handled it and returned a failure".

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::client::ApiCaller;
use crate::error::ApiError;
use crate::http::{HttpMethod, Request};
use crate::integration::Integration;

pub type RouteHandler =
    Box<dyn Fn(&dyn ApiCaller, Request, &RouteParams) -> Result<Value, ApiError> + Send + Sync>;

/// Values captured by `{name}` placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(BTreeMap<String, String>);

impl RouteParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn require(&self, name: &str) -> Result<&str, ApiError> {
        self.get(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::InvalidRoute(format!("missing path parameter `{name}`")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

struct Route {
    method: HttpMethod,
    segments: Vec<Segment>,
    handler: RouteHandler,
}

impl Route {
    fn matches(&self, method: &HttpMethod, path: &[&str]) -> Option<RouteParams> {
        if &self.method != method || self.segments.len() != path.len() {
            return None;
        }
        let mut params = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(literal) if literal.as_str() == *part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), (*part).to_string());
                }
            }
        }
        Some(RouteParams(params))
    }
}

/// Ordered method + path pattern table. Patterns use `{name}` placeholders,
/// e.g. `zones/{zone_id}/settings`.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<F>(mut self, method: &str, pattern: &str, handler: F) -> Self
    where
        F: Fn(&dyn ApiCaller, Request, &RouteParams) -> Result<Value, ApiError> + Send + Sync + 'static,
    {
        let segments = split_path(pattern)
            .into_iter()
            .map(|part| match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(part.to_string()),
            })
            .collect();
        self.routes.push(Route {
            method: HttpMethod::parse(method),
            segments,
            handler: Box::new(handler),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// First route matching `method` and `path`.
    pub fn resolve(&self, method: &str, path: &str) -> Option<(&RouteHandler, RouteParams)> {
        let method = HttpMethod::parse(method);
        let parts = split_path(path);
        self.routes
            .iter()
            .find_map(|route| route.matches(&method, &parts).map(|params| (&route.handler, params)))
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|r| (r.method.as_str(), &r.segments)))
            .finish()
    }
}

fn split_path(path: &str) -> Vec<&str> {
    let path = path.split('?').next().unwrap_or_default();
    path.split('/').filter(|part| !part.is_empty()).collect()
}

/// Result of routing one request.
#[derive(Debug)]
pub enum RouteOutcome {
    /// A client took the request; the value may still describe a failure.
    Handled(Value),
    /// No registered client claims the request's URL.
    Unmatched,
    /// A route handler rejected the request.
    Error(ApiError),
}

impl RouteOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, RouteOutcome::Handled(_))
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            RouteOutcome::Handled(value) => Some(value),
            _ => None,
        }
    }
}

/// One client plus the routes it serves.
pub struct RestRouter {
    client: Box<dyn ApiCaller>,
    routes: RouteTable,
}

impl RestRouter {
    pub fn new(client: Box<dyn ApiCaller>, routes: RouteTable) -> Self {
        Self { client, routes }
    }

    pub fn client(&self) -> &dyn ApiCaller {
        self.client.as_ref()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn route(&self, request: Request) -> RouteOutcome {
        let path = self.client.path_of(&request);
        match self.routes.resolve(request.method(), &path) {
            Some((handler, params)) => match handler(self.client.as_ref(), request, &params) {
                Ok(value) => RouteOutcome::Handled(value),
                Err(error) => RouteOutcome::Error(error),
            },
            None => RouteOutcome::Handled(self.client.call_api(request)),
        }
    }
}

pub struct RequestRouter {
    integration: Arc<Integration>,
    routers: Vec<RestRouter>,
}

impl RequestRouter {
    pub fn new(integration: Arc<Integration>) -> Self {
        Self {
            integration,
            routers: Vec::new(),
        }
    }

    /// Build a client from the shared context and register it after all
    /// existing ones.
    pub fn add_router<C, F>(&mut self, factory: F, routes: RouteTable)
    where
        C: ApiCaller + 'static,
        F: FnOnce(Arc<Integration>) -> C,
    {
        let client = factory(Arc::clone(&self.integration));
        self.routers.push(RestRouter::new(Box::new(client), routes));
    }

    pub fn routers(&self) -> &[RestRouter] {
        &self.routers
    }

    /// Hand `request` to the first client whose endpoint appears in its URL.
    pub fn route(&self, request: Request) -> RouteOutcome {
        let Some(router) = self
            .routers
            .iter()
            .find(|router| router.client().should_route_request(&request))
        else {
            return RouteOutcome::Unmatched;
        };

        let outcome = router.route(request);
        if let RouteOutcome::Error(error) = &outcome {
            self.integration
                .logger()
                .error(&format!("[{}] {error}", router.client().client_name()));
        }
        outcome
    }
}
