//! Request parameter validation against an [`ActionDefinition`].
//!
//! The steps run in a fixed order over a mutable parameter bag:
//! 1. every required parameter must be present (by key, `null` counts as present)
//! 2. each present declared parameter is cast
//! 3. the cast value is checked against the parameter's matcher
//! 4. keys that are neither declared nor path placeholders are removed

use serde_json::Value;
use tracing::warn;

use crate::definition::{ActionDefinition, ParamBag, Parameter, RouteParameter};
use crate::error::ValidationError;
use crate::matcher::ValueType;

/// Cast `raw` and check it against the parameter's matcher.
pub fn cast_and_check(parameter: &Parameter, raw: Value) -> Result<Value, ValidationError> {
    let value = parameter.cast.apply(raw);
    if parameter.matcher.matches(&value) {
        Ok(value)
    } else {
        Err(ValidationError::ParameterTypeMismatch {
            name: parameter.name.clone(),
            expected: parameter.matcher.describe(),
            actual: ValueType::of(&value).name().to_string(),
        })
    }
}

/// Cast and check the values captured for declared route parameters, in place.
/// Values for undeclared placeholders are left as strings.
pub fn validate_route_values(
    route_parameters: &[RouteParameter],
    values: &mut [(String, Value)],
) -> Result<(), ValidationError> {
    for parameter in route_parameters {
        for (name, value) in values.iter_mut() {
            if *name == parameter.name {
                *value = cast_and_check(parameter, std::mem::take(value))?;
            }
        }
    }
    Ok(())
}

pub struct Validator<'a> {
    definition: &'a ActionDefinition,
    placeholders: &'a [String],
}

impl<'a> Validator<'a> {
    /// `placeholders` are the `:name` segments of the route's path; they are
    /// always allowed through, declared or not.
    pub fn new(definition: &'a ActionDefinition, placeholders: &'a [String]) -> Self {
        Self {
            definition,
            placeholders,
        }
    }

    fn is_allowed(&self, key: &str) -> bool {
        self.definition.declares(key) || self.placeholders.iter().any(|p| p == key)
    }

    pub fn validate(&self, params: &mut ParamBag) -> Result<(), ValidationError> {
        for parameter in self.definition.all_parameters() {
            if parameter.required && !params.contains_key(&parameter.name) {
                return Err(ValidationError::MissingParameter {
                    name: parameter.name.clone(),
                });
            }
        }

        for parameter in self.definition.all_parameters() {
            if let Some(slot) = params.get_mut(&parameter.name) {
                *slot = cast_and_check(parameter, slot.take())?;
            }
        }

        let disallowed: Vec<String> = params
            .keys()
            .filter(|key| !self.is_allowed(key))
            .cloned()
            .collect();
        for key in disallowed {
            warn!(
                parameter = %key,
                path = %self.definition.path,
                "Discarding disallowed parameter"
            );
            params.remove(&key);
        }

        Ok(())
    }
}
