//! HTTP host for an [`apiary::App`], built on axum.
//!
//! Every request that is not one of the host's own routes (health,
//! documentation, OpenAPI) falls through to the application's dispatcher.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use apiary::App;
use axum::{http::StatusCode, middleware::from_fn, routing::get, Router};
use tower_http::{
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

mod config;
pub mod convert;
pub mod error;
pub mod request_id;
mod web;

pub use config::{ApiIngressConfig, DEFAULT_BODY_LIMIT_BYTES};
pub use error::IngressError;

pub const OPENAPI_JSON_PATH: &str = "/openapi.json";
pub const OPENAPI_YAML_PATH: &str = "/openapi.yaml";
pub const HEALTH_PATH: &str = "/health";

/// Shared by every handler.
pub(crate) struct IngressState {
    pub(crate) app: Arc<App>,
    pub(crate) body_limit_bytes: usize,
}

pub struct ApiIngress {
    app: Arc<App>,
    config: ApiIngressConfig,
}

impl ApiIngress {
    pub fn new(app: App, config: ApiIngressConfig) -> Self {
        Self::from_shared(Arc::new(app), config)
    }

    pub fn from_shared(app: Arc<App>, config: ApiIngressConfig) -> Self {
        Self { app, config }
    }

    pub fn config(&self) -> &ApiIngressConfig {
        &self.config
    }

    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    /// Build the HTTP router: host routes, the dispatching fallback and middleware.
    pub fn router(&self) -> Router {
        let state = Arc::new(IngressState {
            app: Arc::clone(&self.app),
            body_limit_bytes: self.config.body_limit_bytes,
        });

        let mut router = Router::new().route(HEALTH_PATH, get(web::health_check));

        if self.app.documentation_enabled() {
            let docs_path = self.config.docs_path.trim_end_matches('/');
            if docs_path.starts_with('/') {
                router = router
                    .route(docs_path, get(web::serve_docs_html))
                    .route(&format!("{docs_path}.md"), get(web::serve_docs_markdown));
            }
            router = router
                .route(OPENAPI_JSON_PATH, get(web::serve_openapi_json))
                .route(OPENAPI_YAML_PATH, get(web::serve_openapi_yaml));
        }

        let mut router = router.fallback(web::dispatch_action).with_state(state);

        // Layers wrap everything added before them, so the last one is outermost:
        // SetRequestId -> PropagateRequestId -> Trace -> push_req_id_to_extensions -> Timeout -> CORS
        if self.config.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }
        if self.config.timeout_sec > 0 {
            router = router.layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(self.config.timeout_sec),
            ));
        }
        let x_request_id = request_id::header();
        router
            .layer(from_fn(request_id::push_req_id_to_extensions))
            .layer(request_id::create_trace_layer())
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId))
    }

    /// Bind `bind_addr` and serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(&self.config.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.config.bind_addr))?;
        self.serve_on(listener, shutdown).await
    }

    pub async fn serve_on<F>(self, listener: tokio::net::TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            %addr,
            title = %self.app.title(),
            mountpoint = %self.app.mountpoint(),
            "HTTP server bound"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("HTTP server shutting down gracefully");
            })
            .await
            .context("HTTP server failed")
    }
}
