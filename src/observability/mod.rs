//! Observability infrastructure: correlation ids and structured logging.

/// Correlation id and operation-timing helpers.
pub mod correlation;
/// Redacting JSON tracing layer and the sensitive-key list it uses.
pub mod logging;

pub use correlation::{CorrelationId, OperationContext};
pub use logging::{RedactingJsonLayer, is_sensitive_key, redact_json};
