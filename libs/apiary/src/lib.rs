//! Declare HTTP actions once, then dispatch, document and export them.
//!
//! An [`AppBuilder`] collects declarations (`describe`, `param`,
//! `route_param`, `responds_with`) and turns them into an immutable
//! [`ActionDefinition`] each time an action is declared. Three consumers read
//! the same definitions:
//! - [`App::dispatch`] matches requests, validates and casts parameters and
//!   runs the handler
//! - [`AppDocumentation`] renders Markdown and HTML
//! - [`openapi::build`] produces an OpenAPI 3 contract
//!
//! The crate is transport-agnostic: requests come in as [`DispatchRequest`]
//! and leave as [`Response`]. Hosting over HTTP lives in `api_ingress`.

pub mod action;
pub mod app;
pub mod builder;
pub mod cast;
pub mod definition;
pub mod dispatcher;
pub mod docs;
pub mod error;
pub mod matcher;
pub mod openapi;
pub mod path;
pub mod registry;
pub mod validation;

pub use action::{action_result, bail, Action, ActionError};
pub use app::{App, AppBuilder, AppOptions, DEFAULT_API_VERSION};
pub use builder::DefinitionBuilder;
pub use cast::{Cast, NamedCast};
pub use definition::{
    ActionDefinition, ParamBag, Parameter, PossibleResponse, RouteParameter,
    RESERVED_PARAMETER_NAMES,
};
pub use dispatcher::{
    ActionContext, DispatchRequest, HandlerResult, Headers, Reply, RequestContext, Response,
    RouteArgs,
};
pub use docs::{AppDocumentation, MarkdownRenderer, TaggedMarkdown};
pub use error::{DefinitionError, DispatchError, DocumentationError, HandlerError, ValidationError};
pub use matcher::{Matchable, Matcher, ValueType};
pub use openapi::OpenApi;
pub use registry::{ActionRegistry, NullRegistry, RecordingRegistry, RegistryEntry};

/// Everything needed to declare and serve actions.
pub mod prelude {
    pub use crate::{
        action_result, bail, Action, ActionContext, App, AppBuilder, AppOptions, Cast,
        DispatchRequest, HandlerError, HandlerResult, Matcher, ParamBag, Reply, RequestContext,
        Response, RouteArgs,
    };
    pub use http::Method;
}
