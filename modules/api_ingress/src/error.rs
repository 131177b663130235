use apiary::{DispatchError, DocumentationError, ParamBag};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::convert::into_http_response;

#[derive(Debug, Error)]
pub enum IngressError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("{0}")]
    BadRequest(String),
    #[error("Request body too large")]
    PayloadTooLarge,
    #[error(transparent)]
    Documentation(#[from] DocumentationError),
    #[error("dispatch task failed")]
    Join(#[from] tokio::task::JoinError),
}

impl IngressError {
    pub fn status(&self) -> u16 {
        match self {
            Self::Dispatch(DispatchError::Validation(_)) | Self::BadRequest(_) => 400,
            Self::PayloadTooLarge => 413,
            Self::Dispatch(DispatchError::Handler(_)) | Self::Documentation(_) | Self::Join(_) => {
                500
            }
        }
    }

    fn is_internal(&self) -> bool {
        self.status() >= 500
    }

    /// The `{"error": ...}` body sent to the client. Internal failures are
    /// not described unless `debug-errors` is enabled.
    pub fn to_apiary_response(&self) -> apiary::Response {
        let message = if self.is_internal() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        apiary::Response::json_error(self.status(), &message, self.extras())
    }

    #[cfg(feature = "debug-errors")]
    fn extras(&self) -> ParamBag {
        let mut extras = ParamBag::new();
        if self.is_internal() {
            extras.insert("details".into(), serde_json::Value::String(format!("{self:#}")));
        }
        extras
    }

    #[cfg(not(feature = "debug-errors"))]
    fn extras(&self) -> ParamBag {
        ParamBag::new()
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.is_internal() {
            tracing::error!(error = ?self, status, "request failed");
        } else {
            tracing::warn!(error = %self, status, "request rejected");
        }
        into_http_response(self.to_apiary_response())
    }
}
