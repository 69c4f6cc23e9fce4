//! HTTP request/response DTOs and the single `AppError` that maps every
//! domain error onto the status-code table.

use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::core::{AiServiceError, ConfigError, StorageError, TenantResolutionError, WorkflowError};
use crate::core::models::{AnalysisOutcome, CurationResult, ImageAnalysis, WorkflowResult};

/// `GET /api/config/features` response: the tenant's non-sensitive feature
/// flags, keyed by flag name.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureFlagsResponse {
    /// Flag name -> enabled.
    #[serde(flatten)]
    pub flags: BTreeMap<String, bool>,
}

/// `GET /api/config/publishers` response: platform -> enabled, derived from
/// the tenant's publisher list (never includes `credentials_ref`).
#[derive(Debug, Clone, Serialize)]
pub struct PublishersResponse {
    /// Platform name -> enabled.
    #[serde(flatten)]
    pub publishers: BTreeMap<String, bool>,
}

/// Shape shared by `GET /api/images/random` and `GET /api/images/{filename}`.
#[derive(Debug, Clone, Serialize)]
pub struct ImageResponse {
    /// The filename, relative to the tenant's storage root.
    pub filename: String,
    /// A short-lived, directly-fetchable URL for the image bytes.
    pub temp_url: String,
    /// SHA-256 hex digest, if already known (only when a sidecar exists).
    pub sha256: Option<String>,
    /// The cached sidecar view, if one exists and parsed cleanly.
    pub cached: Option<CachedSidecarResponse>,
}

/// The reconstructed sidecar contents, as surfaced over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct CachedSidecarResponse {
    /// The training/caption text (sidecar line 1).
    pub sd_caption: String,
    /// Raw `key: value` metadata pairs, as written.
    pub metadata: BTreeMap<String, String>,
}

/// `POST /api/images/{filename}/analyze` response.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    /// The vision analysis.
    pub analysis: ImageAnalysis,
    /// The training/caption text.
    pub sd_caption: String,
    /// True if served from the sidecar cache rather than a live AI call.
    pub cache_hit: bool,
}

impl From<AnalysisOutcome> for AnalysisResponse {
    fn from(outcome: AnalysisOutcome) -> Self {
        Self { analysis: outcome.analysis, sd_caption: outcome.sd_caption, cache_hit: outcome.cache_hit }
    }
}

/// Query parameters accepted by `POST /api/images/{filename}/analyze`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AnalyzeQuery {
    /// Bypass the sidecar cache and re-run the AI call.
    #[serde(default)]
    pub force_refresh: bool,
}

/// Query parameters accepted by `POST /api/images/{filename}/publish`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PublishQuery {
    /// Run the full pipeline but perform no writes at all.
    #[serde(default)]
    pub preview: bool,
    /// Run publishing for real but skip archiving and state updates.
    #[serde(default)]
    pub dry_run: bool,
}

/// `POST /api/images/{filename}/publish` response body. A thin re-export of
/// `WorkflowResult`, kept as its own type so the HTTP contract can diverge
/// from the domain type without touching `core`.
pub type PublishResponse = WorkflowResult;

/// Query parameters shared by `POST /api/images/{filename}/keep` and
/// `.../remove`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CurationQuery {
    /// Report what would happen without moving anything.
    #[serde(default)]
    pub preview: bool,
}

/// `POST /api/images/{filename}/keep` and `.../remove` response body.
pub type CurationResponse = CurationResult;

/// `GET /health` response.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process can answer HTTP requests at all.
    pub status: &'static str,
}

/// The single HTTP-layer error type. Every domain error enum in `core`
/// converts into this via `From`, and this is the only place status codes
/// are decided — matching the status table of the error-handling section
/// this service's error taxonomy is grounded on.
#[derive(Debug)]
pub enum AppError {
    /// 400: the request itself was malformed (bad query param, bad body).
    BadRequest(String),
    /// 401: no valid credential/session was presented.
    Unauthenticated(String),
    /// 403: the caller is authenticated but the feature is off for this
    /// tenant, or the caller isn't an admin.
    Forbidden(String),
    /// 404: tenant, image, or sidecar not found.
    NotFound(String),
    /// 409: the selected image was already posted.
    Conflict(String),
    /// 429: a rate limit was hit and retries were exhausted.
    TooManyRequests(String),
    /// 500: anything else, including configuration and permanent storage
    /// failures. Logged at error level before responding.
    Internal(String),
    /// 503: the tenant orchestrator (or another required upstream) could
    /// not be reached and no cached fallback was available.
    ServiceUnavailable(String),
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, &str) {
        match self {
            Self::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail.as_str()),
            Self::Unauthenticated(detail) => (StatusCode::UNAUTHORIZED, detail.as_str()),
            Self::Forbidden(detail) => (StatusCode::FORBIDDEN, detail.as_str()),
            Self::NotFound(detail) => (StatusCode::NOT_FOUND, detail.as_str()),
            Self::Conflict(detail) => (StatusCode::CONFLICT, detail.as_str()),
            Self::TooManyRequests(detail) => (StatusCode::TOO_MANY_REQUESTS, detail.as_str()),
            Self::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail.as_str()),
            Self::ServiceUnavailable(detail) => (StatusCode::SERVICE_UNAVAILABLE, detail.as_str()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Internal(_)) {
            tracing::error!(detail = %self.status_and_message().1, "api_internal_error");
        }
        let (status, message) = self.status_and_message();
        (status, Json(serde_json::json!({ "detail": message }))).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::NotFound { path } => Self::NotFound(format!("not found: {path}")),
            StorageError::Auth { .. } => Self::Internal(err.to_string()),
            StorageError::RateLimited { .. } => Self::TooManyRequests(err.to_string()),
            StorageError::Transient { .. } => Self::ServiceUnavailable(err.to_string()),
            StorageError::Permanent { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<AiServiceError> for AppError {
    fn from(err: AiServiceError) -> Self {
        match &err {
            AiServiceError::RateLimited => Self::TooManyRequests(err.to_string()),
            AiServiceError::Auth | AiServiceError::InvalidResponse { .. } | AiServiceError::Transport { .. } => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<TenantResolutionError> for AppError {
    fn from(err: TenantResolutionError) -> Self {
        match &err {
            TenantResolutionError::TenantNotFound { .. } | TenantResolutionError::InvalidHost { .. } => {
                Self::NotFound(err.to_string())
            }
            TenantResolutionError::OrchestratorUnavailable { .. } => Self::ServiceUnavailable(err.to_string()),
            TenantResolutionError::InvalidConfig { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match &err {
            WorkflowError::NoNewImages => Self::NotFound(err.to_string()),
            WorkflowError::SelectionNotFound { .. } => Self::NotFound(err.to_string()),
            WorkflowError::Duplicate { .. } => Self::Conflict(err.to_string()),
            WorkflowError::FeatureDisabled { .. } => Self::Forbidden(err.to_string()),
            WorkflowError::InvalidFolderName { .. } => Self::BadRequest(err.to_string()),
            WorkflowError::Storage(source) => match source.kind() {
                crate::core::errors::StorageErrorKind::NotFound => Self::NotFound(err.to_string()),
                crate::core::errors::StorageErrorKind::RateLimited => Self::TooManyRequests(err.to_string()),
                crate::core::errors::StorageErrorKind::Transient => Self::ServiceUnavailable(err.to_string()),
                crate::core::errors::StorageErrorKind::Auth | crate::core::errors::StorageErrorKind::Permanent => {
                    Self::Internal(err.to_string())
                }
            },
            WorkflowError::Ai(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        Self::Internal(err.to_string())
    }
}
