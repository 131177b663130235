//! Route matching and per-request dispatch.
//!
//! Routes are tried newest first; the first whose verb and path pattern
//! match wins. For the winning route the dispatcher
//! 1. casts and checks declared route values (these become the positional args)
//! 2. builds the parameter bag from query, body and raw route values, route winning
//! 3. validates the bag against the definition
//! 4. runs the handler with a fresh [`RequestContext`]

mod context;
mod response;

use std::sync::Arc;

use http::Method;
use serde_json::Value;
use tracing::{debug, warn};

pub use context::{ActionContext, RequestContext, RouteArgs};
pub use response::{
    Headers, Reply, Response, CONTENT_TYPE, HTML_CONTENT_TYPE, JSON_CONTENT_TYPE,
    TEXT_CONTENT_TYPE,
};

pub use crate::definition::ParamBag;
use crate::definition::ActionDefinition;
use crate::error::{DispatchError, HandlerError};
use crate::path::PathPattern;
use crate::validation::{validate_route_values, Validator};

pub type HandlerResult = Result<Reply, HandlerError>;

/// Boxed request handler.
pub type HandlerFn = dyn Fn(&mut RequestContext<'_>, &RouteArgs) -> HandlerResult + Send + Sync;

/// An incoming request, already split into its parts by the host.
#[derive(Clone, Debug, Default)]
pub struct DispatchRequest {
    pub method: Method,
    /// Path with the application mountpoint already removed.
    pub path: String,
    pub query_params: ParamBag,
    pub body_params: ParamBag,
}

impl DispatchRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query_params.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body_params.insert(name.into(), value.into());
        self
    }

    pub fn with_body_params(mut self, params: ParamBag) -> Self {
        self.body_params = params;
        self
    }
}

pub(crate) struct Route {
    verb: Method,
    pattern: PathPattern,
    definition: Arc<ActionDefinition>,
    handler: Arc<HandlerFn>,
}

/// Declared routes in declaration order.
#[derive(Default)]
pub(crate) struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub(crate) fn push(
        &mut self,
        pattern: PathPattern,
        definition: Arc<ActionDefinition>,
        handler: Arc<HandlerFn>,
    ) {
        self.routes.push(Route {
            verb: definition.verb.clone(),
            pattern,
            definition,
            handler,
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.routes.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.routes
            .iter()
            .map(|route| (&route.verb, route.pattern.source()))
    }

    pub(crate) fn dispatch(&self, request: &DispatchRequest) -> Result<Response, DispatchError> {
        let found = self.routes.iter().rev().find_map(|route| {
            if route.verb != request.method {
                return None;
            }
            route.pattern.matches(&request.path).map(|m| (route, m))
        });

        let Some((route, matched)) = found else {
            debug!(method = %request.method, path = %request.path, "no matching action");
            return Ok(Response::not_found(&request.method, &request.path));
        };

        let raw_route_values: Vec<(String, Value)> = matched
            .named
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect();

        let mut args = raw_route_values.clone();
        validate_route_values(&route.definition.route_parameters, &mut args)
            .inspect_err(|e| warn!(path = %request.path, error = %e, "route parameter rejected"))?;
        let args = RouteArgs::new(args);

        let mut params = request.query_params.clone();
        params.extend(request.body_params.clone());
        params.extend(raw_route_values);

        Validator::new(&route.definition, route.pattern.placeholders())
            .validate(&mut params)
            .inspect_err(|e| warn!(path = %request.path, error = %e, "request parameters rejected"))?;

        let mut ctx = RequestContext::new(request, params, matched.splat);
        match (route.handler)(&mut ctx, &args) {
            Ok(reply) => Ok(ctx.finish(reply)),
            Err(HandlerError::Halt(response)) => {
                debug!(status = response.status, path = %request.path, "handler halted");
                Ok(response)
            }
            Err(HandlerError::Failed(error)) => Err(DispatchError::Handler(error)),
        }
    }
}
