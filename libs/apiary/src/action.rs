//! Handler logic packaged as a standalone object.
//!
//! An [`Action`] gets the request surface through [`ActionContext`] and
//! returns structured data; [`action_result`] turns that into a JSON reply.

use serde_json::Value;
use thiserror::Error;

use crate::definition::ParamBag;
use crate::dispatcher::{ActionContext, Reply};
use crate::error::HandlerError;
use crate::matcher::ValueType;

pub trait Action {
    /// Run the action. `Some` must be an array or object; `None` is only
    /// allowed after the status was set to 204.
    fn perform(&mut self, ctx: &mut dyn ActionContext) -> Result<Option<Value>, HandlerError>;
}

impl<F> Action for F
where
    F: FnMut(&mut dyn ActionContext) -> Result<Option<Value>, HandlerError>,
{
    fn perform(&mut self, ctx: &mut dyn ActionContext) -> Result<Option<Value>, HandlerError> {
        self(ctx)
    }
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(
        "Action result should be an Array or an Object, or it can be empty but only if the \
         status is 204. Instead it was {0}"
    )]
    InvalidResult(String),
}

/// Run `action` and render its result as a JSON reply.
pub fn action_result<A>(ctx: &mut dyn ActionContext, action: &mut A) -> Result<Reply, HandlerError>
where
    A: Action + ?Sized,
{
    match action.perform(ctx)? {
        Some(value @ (Value::Array(_) | Value::Object(_))) => Ok(ctx.json_response(&value)),
        None if ctx.status() == 204 => Ok(Reply::Empty),
        None => Err(invalid("empty")),
        Some(other) => Err(invalid(ValueType::of(&other).name())),
    }
}

fn invalid(kind: &str) -> HandlerError {
    anyhow::Error::new(ActionError::InvalidResult(kind.to_string())).into()
}

/// Stop an action early with a JSON error body.
pub fn bail(ctx: &dyn ActionContext, message: &str, status: u16, extras: ParamBag) -> HandlerError {
    ctx.json_halt(message, status, extras)
}
