//! Handlers the host serves next to the application's own actions.

use std::sync::Arc;

use apiary::DispatchRequest;
use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    response::{Html, IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::convert::{into_http_response, parse_body, parse_query, read_body, strip_mountpoint};
use crate::error::IngressError;
use crate::request_id::XRequestId;
use crate::IngressState;

const MARKDOWN_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";
const YAML_CONTENT_TYPE: &str = "application/yaml";

pub(crate) async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub(crate) async fn serve_docs_html(
    State(state): State<Arc<IngressState>>,
) -> Result<Html<String>, IngressError> {
    Ok(Html(state.app.to_html_document()?))
}

pub(crate) async fn serve_docs_markdown(State(state): State<Arc<IngressState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, MARKDOWN_CONTENT_TYPE)],
        state.app.to_markdown(),
    )
}

pub(crate) async fn serve_openapi_json(
    State(state): State<Arc<IngressState>>,
) -> Result<impl IntoResponse, IngressError> {
    Ok((
        [(header::CONTENT_TYPE, apiary::dispatcher::JSON_CONTENT_TYPE)],
        state.app.to_openapi_json()?,
    ))
}

pub(crate) async fn serve_openapi_yaml(
    State(state): State<Arc<IngressState>>,
) -> Result<impl IntoResponse, IngressError> {
    Ok((
        [(header::CONTENT_TYPE, YAML_CONTENT_TYPE)],
        state.app.to_openapi_yaml()?,
    ))
}

/// Fallback handler: every request not claimed by a host route is handed to
/// the application's dispatcher.
pub(crate) async fn dispatch_action(
    State(state): State<Arc<IngressState>>,
    request: Request<Body>,
) -> Result<axum::response::Response, IngressError> {
    let (parts, body) = request.into_parts();
    let request_id = parts
        .extensions
        .get::<XRequestId>()
        .map(|r| r.0.as_str())
        .unwrap_or("n/a");

    let Some(path) = strip_mountpoint(state.app.mountpoint(), parts.uri.path()) else {
        tracing::debug!(request_id, path = %parts.uri.path(), "outside the mountpoint");
        return Ok(into_http_response(apiary::Response::not_found(
            &parts.method,
            parts.uri.path(),
        )));
    };

    let bytes = read_body(body, state.body_limit_bytes).await?;

    let request = DispatchRequest {
        method: parts.method.clone(),
        path: path.to_string(),
        query_params: parse_query(parts.uri.query()),
        body_params: parse_body(&parts.headers, &bytes)?,
    };

    // Handlers are synchronous and may block.
    let app = Arc::clone(&state.app);
    let response = tokio::task::spawn_blocking(move || app.dispatch(&request)).await??;

    tracing::debug!(request_id, status = response.status, "action dispatched");
    Ok(into_http_response(response))
}
