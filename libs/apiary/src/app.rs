//! Application assembly: the declaration DSL and the frozen, shareable [`App`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use http::Method;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::builder::DefinitionBuilder;
use crate::cast::Cast;
use crate::definition::{ActionDefinition, Parameter, RouteParameter};
use crate::dispatcher::{
    DispatchRequest, HandlerFn, HandlerResult, RequestContext, Response, RouteArgs, RouteTable,
};
use crate::docs::{default_renderer, AppDocumentation, MarkdownRenderer};
use crate::error::{DefinitionError, DispatchError, DocumentationError, HandlerError};
use crate::matcher::Matcher;
use crate::openapi::{self, OpenApi};
use crate::path::PathPattern;
use crate::registry::{registry_for, ActionRegistry, RegistryEntry};

pub const DEFAULT_API_VERSION: &str = "0.0.1";

#[derive(Clone, Debug)]
pub struct AppOptions {
    pub title: String,
    /// Version reported in the OpenAPI `info` block.
    pub version: String,
    /// When false, nothing is recorded for documentation and generated docs
    /// contain only the title.
    pub documentation_enabled: bool,
}

impl AppOptions {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: DEFAULT_API_VERSION.to_string(),
            documentation_enabled: true,
        }
    }
}

/// Collects declarations, route by route.
///
/// ```
/// use apiary::prelude::*;
///
/// let mut builder = App::builder("PancakeApi");
/// builder
///     .describe("Fetch a pancake")
///     .route_param("id", "Pancake ID")
///     .responds_with(200, "Found", serde_json::json!({"name": "Pancake"}));
/// builder
///     .get("/pancake/:id", |_ctx, args| Ok(format!("pancake {}", args[0]).into()))
///     .unwrap();
/// let app = builder.build().unwrap();
/// assert_eq!(app.route_count(), 1);
/// ```
pub struct AppBuilder {
    options: AppOptions,
    mountpoint: String,
    pending: DefinitionBuilder,
    registry: Box<dyn ActionRegistry>,
    routes: RouteTable,
    documentation_route: Option<String>,
}

impl AppBuilder {
    pub fn new(options: AppOptions) -> Self {
        Self {
            registry: registry_for(options.documentation_enabled),
            options,
            mountpoint: String::new(),
            pending: DefinitionBuilder::new(),
            routes: RouteTable::default(),
            documentation_route: None,
        }
    }

    /// Prefix the app is served under. Only affects documentation output;
    /// the host strips it before dispatching.
    pub fn mount_at(&mut self, prefix: &str) -> &mut Self {
        self.mountpoint = prefix.trim_end_matches('/').to_string();
        self
    }

    pub fn describe(&mut self, text: impl Into<String>) -> &mut Self {
        self.pending.describe(text);
        self
    }

    /// Optional request parameter, no cast.
    pub fn param(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        matcher: Matcher,
    ) -> &mut Self {
        self.param_with(name, description, matcher, Cast::Identity)
    }

    pub fn param_with(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        matcher: Matcher,
        cast: Cast,
    ) -> &mut Self {
        self.pending
            .param(Parameter::new(name, description, false, matcher, cast));
        self
    }

    pub fn required_param(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        matcher: Matcher,
    ) -> &mut Self {
        self.required_param_with(name, description, matcher, Cast::Identity)
    }

    pub fn required_param_with(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        matcher: Matcher,
        cast: Cast,
    ) -> &mut Self {
        self.pending
            .param(Parameter::new(name, description, true, matcher, cast));
        self
    }

    /// Route parameter matched as a plain string.
    pub fn route_param(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> &mut Self {
        self.route_param_with(name, description, Matcher::string(), Cast::Identity)
    }

    pub fn route_param_with(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        matcher: Matcher,
        cast: Cast,
    ) -> &mut Self {
        self.pending
            .route_param(RouteParameter::new(name, description, matcher, cast));
        self
    }

    pub fn responds_with(
        &mut self,
        status: u16,
        description: impl Into<String>,
        example: impl Into<Option<Value>>,
    ) -> &mut Self {
        self.pending.responds_with(status, description, example.into());
        self
    }

    /// Finalize the pending declarations into an action for `verb` + `path`
    /// and add its route. Later declarations for the same route take precedence.
    pub fn declare_action<F>(
        &mut self,
        verb: Method,
        path: &str,
        handler: F,
    ) -> Result<&mut Self, DefinitionError>
    where
        F: Fn(&mut RequestContext<'_>, &RouteArgs) -> HandlerResult + Send + Sync + 'static,
    {
        let definition = self.pending.finalize(verb, path)?;
        let pattern = compile(path)?;
        let definition = Arc::new(definition);

        debug!(verb = %definition.verb, path, "declared action");
        self.registry
            .append(RegistryEntry::Action(Arc::clone(&definition)));
        self.routes.push(pattern, definition, boxed(handler));
        Ok(self)
    }

    pub fn get<F>(&mut self, path: &str, handler: F) -> Result<&mut Self, DefinitionError>
    where
        F: Fn(&mut RequestContext<'_>, &RouteArgs) -> HandlerResult + Send + Sync + 'static,
    {
        self.declare_action(Method::GET, path, handler)
    }

    pub fn post<F>(&mut self, path: &str, handler: F) -> Result<&mut Self, DefinitionError>
    where
        F: Fn(&mut RequestContext<'_>, &RouteArgs) -> HandlerResult + Send + Sync + 'static,
    {
        self.declare_action(Method::POST, path, handler)
    }

    pub fn put<F>(&mut self, path: &str, handler: F) -> Result<&mut Self, DefinitionError>
    where
        F: Fn(&mut RequestContext<'_>, &RouteArgs) -> HandlerResult + Send + Sync + 'static,
    {
        self.declare_action(Method::PUT, path, handler)
    }

    pub fn patch<F>(&mut self, path: &str, handler: F) -> Result<&mut Self, DefinitionError>
    where
        F: Fn(&mut RequestContext<'_>, &RouteArgs) -> HandlerResult + Send + Sync + 'static,
    {
        self.declare_action(Method::PATCH, path, handler)
    }

    pub fn delete<F>(&mut self, path: &str, handler: F) -> Result<&mut Self, DefinitionError>
    where
        F: Fn(&mut RequestContext<'_>, &RouteArgs) -> HandlerResult + Send + Sync + 'static,
    {
        self.declare_action(Method::DELETE, path, handler)
    }

    pub fn insert_literal_markdown(&mut self, text: impl Into<String>) -> &mut Self {
        self.registry.append(RegistryEntry::Markdown(text.into()));
        self
    }

    /// Read a Markdown file now and insert its contents.
    pub fn insert_markdown_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<&mut Self, DefinitionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DefinitionError::MarkdownFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.insert_literal_markdown(text))
    }

    pub fn insert_build_timestamp(&mut self) -> &mut Self {
        self.registry.append(RegistryEntry::Timestamp);
        self
    }

    /// Serve the HTML documentation with a GET route at `path`. The route
    /// itself is not documented.
    pub fn serve_documentation_at(&mut self, path: &str) -> &mut Self {
        self.documentation_route = Some(path.to_string());
        self
    }

    pub fn build(mut self) -> Result<App, DefinitionError> {
        if self.pending.has_pending() {
            warn!("declarations after the last action were discarded");
        }

        if let Some(path) = self.documentation_route.take() {
            let entries: Arc<[RegistryEntry]> = self.registry.entries().into();
            let title = self.options.title.clone();
            let mountpoint = self.mountpoint.clone();
            let renderer: Arc<dyn MarkdownRenderer> = Arc::from(default_renderer());

            let handler = boxed(move |_ctx, _args| {
                let docs = AppDocumentation::new(&title, &mountpoint, &entries);
                let page = docs
                    .to_html_document(renderer.as_ref())
                    .map_err(|e| HandlerError::Failed(e.into()))?;
                Ok(Response::html(200, page).into())
            });
            self.routes.push(
                compile(&path)?,
                Arc::new(ActionDefinition::new(Method::GET, path)),
                handler,
            );
        }

        info!(
            title = %self.options.title,
            routes = self.routes.len(),
            "application built"
        );
        Ok(App {
            options: self.options,
            mountpoint: self.mountpoint,
            registry: self.registry,
            routes: self.routes,
        })
    }
}

fn boxed<F>(handler: F) -> Arc<HandlerFn>
where
    F: Fn(&mut RequestContext<'_>, &RouteArgs) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(handler)
}

fn compile(path: &str) -> Result<PathPattern, DefinitionError> {
    PathPattern::compile(path).map_err(|source| DefinitionError::InvalidPathPattern {
        path: path.to_string(),
        source,
    })
}

/// A built application. Read-only, so it can be shared across threads.
pub struct App {
    options: AppOptions,
    mountpoint: String,
    registry: Box<dyn ActionRegistry>,
    routes: RouteTable,
}

impl App {
    pub fn builder(title: impl Into<String>) -> AppBuilder {
        AppBuilder::new(AppOptions::new(title))
    }

    pub fn title(&self) -> &str {
        &self.options.title
    }

    pub fn version(&self) -> &str {
        &self.options.version
    }

    pub fn mountpoint(&self) -> &str {
        &self.mountpoint
    }

    pub fn documentation_enabled(&self) -> bool {
        self.options.documentation_enabled
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// `(verb, path pattern)` for every route, in declaration order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.routes.iter()
    }

    pub fn dispatch(&self, request: &DispatchRequest) -> Result<Response, DispatchError> {
        self.routes.dispatch(request)
    }

    pub fn documentation(&self) -> AppDocumentation<'_> {
        AppDocumentation::new(&self.options.title, &self.mountpoint, self.registry.entries())
    }

    pub fn to_markdown(&self) -> String {
        self.documentation().to_markdown()
    }

    pub fn to_html_fragment(&self) -> String {
        self.documentation()
            .to_html_fragment(default_renderer().as_ref())
    }

    pub fn to_html_document(&self) -> Result<String, DocumentationError> {
        self.documentation()
            .to_html_document(default_renderer().as_ref())
    }

    pub fn to_openapi_spec(&self) -> OpenApi {
        openapi::build(&self.documentation(), &self.options.version)
    }

    pub fn to_openapi_yaml(&self) -> Result<String, DocumentationError> {
        self.to_openapi_spec().to_yaml()
    }

    pub fn to_openapi_json(&self) -> Result<String, DocumentationError> {
        self.to_openapi_spec().to_json()
    }
}

impl fmt::Debug for AppBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppBuilder")
            .field("title", &self.options.title)
            .field("mountpoint", &self.mountpoint)
            .field("pending", &self.pending)
            .field("routes", &self.routes.len())
            .finish()
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("title", &self.options.title)
            .field("mountpoint", &self.mountpoint)
            .field("routes", &self.routes.len())
            .finish()
    }
}
