//! Process-scope configuration. Distinct from `tenant::model::TenantConfig`:
//! this is loaded once in `main` and never changes for the life of the
//! process; `TenantConfig` is resolved per host, per request, and refreshed
//! on its own TTL.

use serde::{Deserialize, Serialize};

/// Log sink format. JSON ships to production; pretty is for `cargo run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One redacted JSON object per line.
    #[default]
    Json,
    /// Human-readable `key=value` lines, for local development.
    Pretty,
}

/// The fully loaded, validated process configuration.
#[derive(Debug, Clone)]
pub struct ApplicationConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Base URL of the external runtime orchestrator.
    pub orchestrator_base_url: String,
    /// Structured log sink format.
    pub log_format: LogFormat,
    /// Maximum number of hosts held in the tenant config cache at once.
    pub tenant_cache_max_size: usize,
    /// Admin cookie lifetime, clamped to `[60, 3600]` seconds.
    pub admin_cookie_ttl_seconds: i64,
    /// OpenAI-compatible vendor API key.
    pub openai_api_key: String,
    /// OpenAI-compatible vendor base URL (chat-completions endpoint root).
    pub openai_base_url: String,
    /// Model name passed on every completion request.
    pub openai_model: String,
    /// Shared client-side rate limit applied to every AI call.
    pub openai_qps: usize,
    /// Dropbox app key (OAuth client id).
    pub dropbox_app_key: String,
    /// Dropbox app secret (OAuth client secret).
    pub dropbox_app_secret: String,
    /// Dropbox long-lived refresh token.
    pub dropbox_refresh_token: String,
    /// HMAC key used to sign the admin session cookie.
    pub web_session_secret: String,
    /// Legacy shared-password admin login fallback. `None` disables
    /// `POST /api/admin/login` (the handler returns 503).
    pub web_admin_password: Option<String>,
    /// OAuth client secret for the Auth0/OIDC exchange, if configured.
    pub auth0_client_secret: Option<String>,
}

/// Defaults for the fields this loader resolves from the `RUNTIME_SETTINGS`
/// JSON grouping / individual env vars / INI fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct RuntimeSettings {
    pub bind_addr: String,
    pub orchestrator_base_url: String,
    pub log_format: LogFormat,
    pub tenant_cache_max_size: usize,
    pub admin_cookie_ttl_seconds: i64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            orchestrator_base_url: "http://localhost:9000".to_string(),
            log_format: LogFormat::Json,
            tenant_cache_max_size: 500,
            admin_cookie_ttl_seconds: 3600,
        }
    }
}
