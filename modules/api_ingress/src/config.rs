use runtime::AppConfig;
use serde::{Deserialize, Serialize};

pub use runtime::config::DEFAULT_BODY_LIMIT_BYTES;

/// HTTP host settings for an [`apiary::App`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ApiIngressConfig {
    pub bind_addr: String,
    /// HTML documentation path; Markdown is served at `<docs_path>.md`.
    /// Empty disables both. OpenAPI is always at `/openapi.json` and
    /// `/openapi.yaml` while documentation is enabled on the app.
    pub docs_path: String,
    pub cors_enabled: bool,
    /// 0 disables the per-request timeout.
    pub timeout_sec: u64,
    pub body_limit_bytes: usize,
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8087".to_string(),
            docs_path: "/docs".to_string(),
            cors_enabled: false,
            timeout_sec: 0,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        }
    }
}

impl From<&AppConfig> for ApiIngressConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            bind_addr: config.bind_addr(),
            docs_path: config.api.docs_path.clone(),
            cors_enabled: config.server.cors_enabled,
            timeout_sec: config.server.timeout_sec,
            body_limit_bytes: config.server.body_limit_bytes,
        }
    }
}
