//! The data model of a declared action.
//!
//! An [`ActionDefinition`] is produced once, at application build time, by
//! [`DefinitionBuilder`](crate::builder::DefinitionBuilder). After that it is
//! shared read-only between the dispatcher, the documentation renderer and the
//! OpenAPI exporter.

use std::ops::Deref;

use http::Method;
use serde_json::Value;

use crate::cast::Cast;
use crate::matcher::Matcher;
use crate::path;

/// Request parameters, keyed by name.
pub type ParamBag = serde_json::Map<String, Value>;

/// Names the routing layer uses for its own captures.
pub const RESERVED_PARAMETER_NAMES: [&str; 2] = ["splat", "captures"];

#[derive(Clone, Debug)]
pub struct Parameter {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub matcher: Matcher,
    pub cast: Cast,
}

impl Parameter {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
        matcher: Matcher,
        cast: Cast,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            matcher,
            cast,
        }
    }
}

/// A parameter that comes from a `:name` placeholder in the path. It is
/// always required, since the route only matches when the segment is present.
#[derive(Clone, Debug)]
pub struct RouteParameter(Parameter);

impl RouteParameter {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        matcher: Matcher,
        cast: Cast,
    ) -> Self {
        Self(Parameter::new(name, description, true, matcher, cast))
    }

    pub fn as_parameter(&self) -> &Parameter {
        &self.0
    }
}

impl Deref for RouteParameter {
    type Target = Parameter;

    fn deref(&self) -> &Parameter {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PossibleResponse {
    pub status: u16,
    pub description: String,
    pub example: Option<Value>,
}

impl PossibleResponse {
    pub fn new(status: u16, description: impl Into<String>, example: Option<Value>) -> Self {
        Self {
            status,
            description: description.into(),
            example,
        }
    }

    pub fn has_body(&self) -> bool {
        self.example.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct ActionDefinition {
    pub verb: Method,
    pub path: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
    pub route_parameters: Vec<RouteParameter>,
    pub responses: Vec<PossibleResponse>,
}

impl ActionDefinition {
    pub fn new(verb: Method, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
            description: String::new(),
            parameters: Vec::new(),
            route_parameters: Vec::new(),
            responses: Vec::new(),
        }
    }

    /// Request parameters followed by route parameters.
    pub fn all_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .chain(self.route_parameters.iter().map(RouteParameter::as_parameter))
    }

    pub fn all_parameter_names(&self) -> Vec<&str> {
        self.all_parameters().map(|p| p.name.as_str()).collect()
    }

    pub fn declares(&self, name: &str) -> bool {
        self.all_parameters().any(|p| p.name == name)
    }

    pub fn has_description(&self) -> bool {
        !self.description.is_empty()
    }

    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }

    pub fn has_route_parameters(&self) -> bool {
        !self.route_parameters.is_empty()
    }

    pub fn has_responses(&self) -> bool {
        !self.responses.is_empty()
    }

    /// Every `:name` placeholder in the path, in order.
    pub fn placeholders(&self) -> Vec<String> {
        path::placeholder_names(&self.path)
    }

    /// Placeholders that were never declared as route parameters. They still
    /// reach the handler, unvalidated and as strings.
    pub fn implicit_placeholders(&self) -> Vec<String> {
        self.placeholders()
            .into_iter()
            .filter(|name| !self.route_parameters.iter().any(|p| &p.name == name))
            .collect()
    }
}
