use std::ops::Deref;

use http::Method;
use serde_json::Value;

use super::response::{
    pretty_json, Headers, Reply, Response, HTML_CONTENT_TYPE, JSON_CONTENT_TYPE,
    TEXT_CONTENT_TYPE,
};
use super::DispatchRequest;
use crate::definition::ParamBag;
use crate::error::HandlerError;

/// The request-scoped surface handlers and actions work against.
pub trait ActionContext {
    /// Validated, cast parameters.
    fn params(&self) -> &ParamBag;

    fn param(&self, name: &str) -> Option<&Value> {
        self.params().get(name)
    }

    fn status(&self) -> u16;

    fn set_status(&mut self, status: u16);

    /// Switch the content type to JSON and return the pretty-printed body.
    /// Any status set earlier is kept.
    fn json_response(&mut self, body: &Value) -> Reply;

    /// Build an early JSON error response. Return it with `?` or `Err(..)`.
    fn json_halt(&self, message: &str, status: u16, extras: ParamBag) -> HandlerError {
        HandlerError::Halt(Response::json_error(status, message, extras))
    }

    fn halt(&self, response: Response) -> HandlerError {
        HandlerError::Halt(response)
    }
}

/// Placeholder values handed to a handler positionally, in path order.
/// Declared route parameters are cast; the rest are strings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteArgs {
    names: Vec<String>,
    values: Vec<Value>,
}

impl RouteArgs {
    pub fn new(pairs: Vec<(String, Value)>) -> Self {
        let (names, values) = pairs.into_iter().unzip();
        Self { names, values }
    }

    /// Value of the named placeholder. With duplicate names the last one wins.
    pub fn named(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .rposition(|n| n == name)
            .and_then(|i| self.values.get(i))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// String form of positional argument `index`.
    pub fn str(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(Value::as_str)
    }
}

impl Deref for RouteArgs {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.values
    }
}

/// Per-request state: validated params, wildcard captures and the response
/// status and content type accumulated by the handler.
#[derive(Debug)]
pub struct RequestContext<'r> {
    request: &'r DispatchRequest,
    params: ParamBag,
    splat: Vec<String>,
    status: u16,
    content_type: String,
}

impl<'r> RequestContext<'r> {
    pub fn new(request: &'r DispatchRequest, params: ParamBag, splat: Vec<String>) -> Self {
        Self {
            request,
            params,
            splat,
            status: 200,
            content_type: TEXT_CONTENT_TYPE.to_string(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.request.method
    }

    pub fn path(&self) -> &str {
        &self.request.path
    }

    pub fn request(&self) -> &DispatchRequest {
        self.request
    }

    /// Values captured by `*` wildcards, in path order.
    pub fn splat(&self) -> &[String] {
        &self.splat
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Accepts a full MIME type or one of the short names `json`, `html`, `text`.
    pub fn set_content_type(&mut self, content_type: &str) {
        self.content_type = match content_type {
            "json" => JSON_CONTENT_TYPE,
            "html" => HTML_CONTENT_TYPE,
            "text" | "txt" => TEXT_CONTENT_TYPE,
            other => other,
        }
        .to_string();
    }

    /// Combine the handler's reply with the accumulated status and content type.
    pub(crate) fn finish(self, reply: Reply) -> Response {
        match reply {
            Reply::Response(response) => response,
            Reply::Body(body) => Response::with_content(self.status, &self.content_type, body),
            Reply::Empty => Response::new(self.status, Headers::new(), vec![Vec::new()]),
        }
    }
}

impl ActionContext for RequestContext<'_> {
    fn params(&self) -> &ParamBag {
        &self.params
    }

    fn status(&self) -> u16 {
        self.status
    }

    fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    fn json_response(&mut self, body: &Value) -> Reply {
        self.content_type = JSON_CONTENT_TYPE.to_string();
        Reply::Body(pretty_json(body).into_bytes())
    }
}
