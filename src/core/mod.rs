//! Core domain types and the workflow orchestrator.

/// Domain error types, one enum per failure boundary.
pub mod errors;
/// Shared domain structs (analysis, sidecar view, posted state, results).
pub mod models;
/// Generic exponential-backoff retry helper shared by outbound adapters.
pub mod retry;
/// The end-to-end select → analyze → caption → publish → archive pipeline.
pub mod workflow;

pub use errors::{AiServiceError, ConfigError, StorageError, TenantResolutionError, WorkflowError};
pub use models::{
    AnalysisOutcome, CaptionSpec, CurationResult, ImageAnalysis, ImageCandidate, PostedState,
    PublishResult, SidecarIdentity, SidecarView, WorkflowResult,
};
pub use retry::retry_with_backoff;
pub use workflow::WorkflowOrchestrator;
