//! Accumulates declarations until an action is declared.
//!
//! `describe`, `param`, `route_param` and `responds_with` all write into the
//! same pending definition, which is created lazily on first use.
//! [`DefinitionBuilder::finalize`] consumes it, attaches verb and path, and
//! runs the declaration-time checks:
//! - no parameter uses a name the router reserves (`splat`, `captures`)
//! - request and route parameters share one namespace without duplicates
//! - every route parameter has a matching `:name` placeholder in the path

use std::collections::HashSet;

use http::Method;
use serde_json::Value;

use crate::cast::Cast;
use crate::definition::{
    ActionDefinition, Parameter, PossibleResponse, RouteParameter, RESERVED_PARAMETER_NAMES,
};
use crate::error::DefinitionError;
use crate::matcher::Matcher;
use crate::path;

#[derive(Debug, Default)]
struct Pending {
    description: String,
    parameters: Vec<Parameter>,
    route_parameters: Vec<RouteParameter>,
    responses: Vec<PossibleResponse>,
}

#[derive(Debug, Default)]
pub struct DefinitionBuilder {
    pending: Option<Pending>,
}

impl DefinitionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&mut self) -> &mut Pending {
        self.pending.get_or_insert_with(Pending::default)
    }

    /// True when declarations have been made since the last `finalize`.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn describe(&mut self, text: impl Into<String>) -> &mut Self {
        self.pending().description = text.into();
        self
    }

    pub fn param(&mut self, parameter: Parameter) -> &mut Self {
        self.pending().parameters.push(parameter);
        self
    }

    pub fn route_param(&mut self, parameter: RouteParameter) -> &mut Self {
        self.pending().route_parameters.push(parameter);
        self
    }

    pub fn responds_with(
        &mut self,
        status: u16,
        description: impl Into<String>,
        example: Option<Value>,
    ) -> &mut Self {
        self.pending()
            .responses
            .push(PossibleResponse::new(status, description, example));
        self
    }

    /// Shorthand for an optional request parameter.
    pub fn optional(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        matcher: Matcher,
        cast: Cast,
    ) -> &mut Self {
        self.param(Parameter::new(name, description, false, matcher, cast))
    }

    /// Shorthand for a required request parameter.
    pub fn required(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        matcher: Matcher,
        cast: Cast,
    ) -> &mut Self {
        self.param(Parameter::new(name, description, true, matcher, cast))
    }

    /// Take the pending declarations and turn them into a definition for
    /// `verb` + `path`. The builder is empty afterwards, whether or not the
    /// checks pass.
    pub fn finalize(
        &mut self,
        verb: Method,
        path: &str,
    ) -> Result<ActionDefinition, DefinitionError> {
        let pending = self.pending.take().unwrap_or_default();

        let definition = ActionDefinition {
            verb,
            path: path.to_string(),
            description: pending.description,
            parameters: pending.parameters,
            route_parameters: pending.route_parameters,
            responses: pending.responses,
        };

        check_reserved_names(&definition)?;
        check_unique_names(&definition)?;
        check_route_parameters_in_path(&definition)?;

        Ok(definition)
    }
}

fn check_reserved_names(definition: &ActionDefinition) -> Result<(), DefinitionError> {
    match definition
        .all_parameter_names()
        .into_iter()
        .find(|name| RESERVED_PARAMETER_NAMES.contains(name))
    {
        Some(name) => Err(DefinitionError::ReservedParameterName {
            name: name.to_string(),
        }),
        None => Ok(()),
    }
}

fn check_unique_names(definition: &ActionDefinition) -> Result<(), DefinitionError> {
    let mut seen = HashSet::new();
    for name in definition.all_parameter_names() {
        if !seen.insert(name) {
            return Err(DefinitionError::ConflictingParameterName {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn check_route_parameters_in_path(definition: &ActionDefinition) -> Result<(), DefinitionError> {
    let placeholders = path::placeholder_names(&definition.path);
    for parameter in &definition.route_parameters {
        if !placeholders.contains(&parameter.name) {
            return Err(DefinitionError::RouteParameterNotInPath {
                name: parameter.name.clone(),
                path: definition.path.clone(),
            });
        }
    }
    Ok(())
}
