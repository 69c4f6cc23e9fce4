//! Domain error types, one enum per failure boundary, matching the mapping
//! in the HTTP layer (`api::types::AppError`) one-to-one.

use thiserror::Error;

/// Coarse-grained kind used by callers that need to branch on recoverability
/// without matching every `StorageError` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// The requested object does not exist.
    NotFound,
    /// Credentials were rejected or expired and could not be refreshed.
    Auth,
    /// The vendor asked us to slow down.
    RateLimited,
    /// Likely to succeed on retry (network blip, 5xx).
    Transient,
    /// Retrying will not help.
    Permanent,
}

/// Errors from the object-store adapter, normalized away from any
/// vendor-specific SDK error type.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An image or sidecar does not exist at the given path.
    #[error("object not found: {path}")]
    NotFound {
        /// Store-relative path that was missing.
        path: String,
    },

    /// The adapter could not authenticate (refresh token rejected, etc).
    #[error("storage authentication failed: {detail}")]
    Auth {
        /// Human-readable detail, never the credential itself.
        detail: String,
    },

    /// The vendor responded with a rate-limit signal.
    #[error("storage rate limited: {detail}")]
    RateLimited {
        /// Vendor-provided detail, if any.
        detail: String,
    },

    /// A retryable failure (network error, 5xx) that exhausted its budget.
    #[error("transient storage error: {detail}")]
    Transient {
        /// Underlying cause.
        #[source]
        source: anyhow::Error,
        /// Short description for logs.
        detail: String,
    },

    /// A non-retryable failure.
    #[error("storage error: {detail}")]
    Permanent {
        /// Underlying cause.
        #[source]
        source: anyhow::Error,
        /// Short description for logs.
        detail: String,
    },
}

impl StorageError {
    /// Coarse kind, used by the HTTP layer for status-code mapping.
    #[must_use]
    pub const fn kind(&self) -> StorageErrorKind {
        match self {
            Self::NotFound { .. } => StorageErrorKind::NotFound,
            Self::Auth { .. } => StorageErrorKind::Auth,
            Self::RateLimited { .. } => StorageErrorKind::RateLimited,
            Self::Transient { .. } => StorageErrorKind::Transient,
            Self::Permanent { .. } => StorageErrorKind::Permanent,
        }
    }
}

/// Errors from the AI adapter (vision analysis / caption generation).
#[derive(Debug, Error)]
pub enum AiServiceError {
    /// The vendor response could not be parsed as the expected JSON shape,
    /// even after the brace-extraction fallback pass.
    #[error("AI response was not valid JSON: {detail}")]
    InvalidResponse {
        /// Parse failure detail (never includes the raw response text).
        detail: String,
    },

    /// Network or HTTP-level failure talking to the vendor.
    #[error("AI vendor call failed: {source}")]
    Transport {
        /// Underlying transport error.
        #[source]
        source: anyhow::Error,
    },

    /// The vendor rejected the API key.
    #[error("AI vendor authentication failed")]
    Auth,

    /// The shared rate limiter could not grant a permit within budget.
    #[error("AI rate limiter exhausted")]
    RateLimited,
}

/// Errors resolving a hostname to a `TenantConfig`.
#[derive(Debug, Error)]
pub enum TenantResolutionError {
    /// The orchestrator has no tenant for this host.
    #[error("no tenant configured for host {host}")]
    TenantNotFound {
        /// Normalized host that was looked up.
        host: String,
    },

    /// The orchestrator could not be reached and no usable cache entry
    /// existed to serve stale.
    #[error("orchestrator unavailable for host {host}: {source}")]
    OrchestratorUnavailable {
        /// Normalized host that was looked up.
        host: String,
        /// Underlying transport error.
        #[source]
        source: anyhow::Error,
    },

    /// The orchestrator's response did not match either supported schema
    /// version, or failed field-level validation (e.g. non-absolute
    /// `storage.root`).
    #[error("invalid runtime config for host {host}: {detail}")]
    InvalidConfig {
        /// Normalized host that was looked up.
        host: String,
        /// Validation failure detail.
        detail: String,
    },

    /// The host string itself is not a well-formed DNS label.
    #[error("invalid host: {host}")]
    InvalidHost {
        /// The rejected raw host string.
        host: String,
    },
}

/// Errors from the workflow orchestrator (`core::workflow`).
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No candidate images remain after filtering already-posted ones.
    #[error("no new images available")]
    NoNewImages,

    /// The selected image's sha256 was already recorded as posted.
    #[error("image {filename} is a duplicate")]
    Duplicate {
        /// The filename that was rejected as a duplicate.
        filename: String,
    },

    /// A named selection was requested but is not among the candidates.
    #[error("image {filename} not found among candidates")]
    SelectionNotFound {
        /// The filename that was requested.
        filename: String,
    },

    /// The requested feature is disabled for this tenant.
    #[error("feature '{feature}' is disabled for this tenant")]
    FeatureDisabled {
        /// The feature flag name.
        feature: String,
    },

    /// The object store failed in a way that aborts the run.
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    /// The AI adapter failed in a way that aborts the run.
    #[error("AI failure: {0}")]
    Ai(#[from] AiServiceError),

    /// A curation subfolder name failed validation.
    #[error("invalid curation folder name: {name}")]
    InvalidFolderName {
        /// The rejected name.
        name: String,
    },
}

/// Errors loading or validating `ApplicationConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was missing.
    #[error("missing required environment variable: {var}")]
    MissingVar {
        /// The variable name.
        var: String,
    },

    /// A JSON-grouped environment variable failed to parse.
    #[error("failed to parse {var} as JSON: {source}")]
    InvalidJson {
        /// The variable name.
        var: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The legacy INI fallback file could not be read or parsed.
    #[error("failed to load INI fallback at {path}: {detail}")]
    InvalidIni {
        /// Path to the INI file.
        path: String,
        /// Parse failure detail.
        detail: String,
    },

    /// A loaded value failed validation (e.g. non-absolute storage root).
    #[error("invalid configuration for {field}: {detail}")]
    Validation {
        /// Dotted field path.
        field: String,
        /// Why it's invalid.
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_kind_maps_variants() {
        let err = StorageError::NotFound { path: "a.jpg".to_owned() };
        assert_eq!(err.kind(), StorageErrorKind::NotFound);

        let err = StorageError::RateLimited { detail: "429".to_owned() };
        assert_eq!(err.kind(), StorageErrorKind::RateLimited);
    }

    #[test]
    fn workflow_error_wraps_storage_error() {
        let storage = StorageError::Auth { detail: "expired".to_owned() };
        let workflow: WorkflowError = storage.into();
        assert!(matches!(workflow, WorkflowError::Storage(_)));
    }

    #[test]
    fn tenant_resolution_error_messages_include_host() {
        let err = TenantResolutionError::TenantNotFound { host: "acme.example.com".to_owned() };
        assert!(err.to_string().contains("acme.example.com"));
    }
}
