use std::path::PathBuf;

use thiserror::Error;

use crate::dispatcher::{ParamBag, Response};

/// Programming mistakes in an action declaration. These abort application
/// start-up and are never produced while serving requests.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error(":{name} is a reserved magic parameter name")]
    ReservedParameterName { name: String },

    #[error(
        ":{name} mentioned twice as a possible parameter. Note that URL parameters and \
         request parameters share a namespace."
    )]
    ConflictingParameterName { name: String },

    #[error("Parameter :{name} not present in path {path:?}")]
    RouteParameterNotInPath { name: String, path: String },

    #[error("Path pattern {path:?} could not be compiled")]
    InvalidPathPattern {
        path: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to read Markdown file {path:?}")]
    MarkdownFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-request parameter problems. The dispatcher returns these to the host,
/// which decides how to surface them (usually as a 4xx response).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing parameter :{name}")]
    MissingParameter { name: String },

    #[error("Received {actual}, expected {expected} for :{name}")]
    ParameterTypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },
}

impl ValidationError {
    /// Name of the offending parameter.
    pub fn parameter(&self) -> &str {
        match self {
            Self::MissingParameter { name } | Self::ParameterTypeMismatch { name, .. } => name,
        }
    }

    /// Render as the standard `{"error": ...}` JSON body, merging any extra
    /// attributes the host wants to expose.
    pub fn to_response(&self, status: u16, extras: ParamBag) -> Response {
        Response::json_error(status, &self.to_string(), extras)
    }
}

/// Outcome of a handler that did not produce a regular reply.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Deliberate early response, e.g. `json_halt`. The dispatcher returns it as-is.
    #[error("request halted early")]
    Halt(Response),

    /// The handler failed; the dispatcher propagates this to the host.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Handler(anyhow::Error),
}

#[derive(Debug, Error)]
pub enum DocumentationError {
    #[error("failed to render the HTML documentation template")]
    Template(#[from] minijinja::Error),

    #[error("failed to serialize the OpenAPI document as YAML")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to serialize the OpenAPI document as JSON")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_parameter() {
        let missing = ValidationError::MissingParameter {
            name: "name".into(),
        };
        assert_eq!(missing.to_string(), "Missing parameter :name");
        assert_eq!(missing.parameter(), "name");

        let mismatch = ValidationError::ParameterTypeMismatch {
            name: "number".into(),
            expected: "Integer".into(),
            actual: "String".into(),
        };
        assert_eq!(
            mismatch.to_string(),
            "Received String, expected Integer for :number"
        );
    }

    #[test]
    fn definition_errors_read_like_declaration_mistakes() {
        let err = DefinitionError::RouteParameterNotInPath {
            name: "thing_id".into(),
            path: "/thing/:id".into(),
        };
        assert_eq!(
            err.to_string(),
            "Parameter :thing_id not present in path \"/thing/:id\""
        );

        let err = DefinitionError::ReservedParameterName {
            name: "captures".into(),
        };
        assert!(err
            .to_string()
            .contains(":captures is a reserved magic parameter name"));
    }

    #[test]
    fn validation_error_renders_json_body() {
        let err = ValidationError::MissingParameter {
            name: "diameter".into(),
        };
        let mut extras = ParamBag::new();
        extras.insert("parameter".into(), "diameter".into());

        let response = err.to_response(422, extras);
        assert_eq!(response.status, 422);

        let body: serde_json::Value = serde_json::from_slice(&response.body_bytes()).unwrap();
        assert_eq!(body["error"], "Missing parameter :diameter");
        assert_eq!(body["parameter"], "diameter");
    }
}
