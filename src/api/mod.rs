/// HTTP handlers for the image/workflow surface.
pub mod handlers;
/// HTTP server setup and router configuration.
pub mod http_server;
/// Correlation-id and tenant-resolution middleware.
pub mod middleware;
/// Embedded static file serving (the SPA shell).
pub mod static_files;
/// Shared DTO types and the `AppError` status-code mapping.
pub mod types;

pub use handlers::AppState;
pub use http_server::{RouterDeps, create_router};
pub use types::AppError;
