//! Multi-tenant image publishing runtime: selects a candidate from a
//! tenant's object store, runs multimodal AI for captions and training
//! sidecars, fans out to the tenant's configured publish channels, and
//! archives the source asset.

#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(unreachable_pub)]
#![warn(elided_lifetimes_in_paths)]
#![warn(missing_copy_implementations)]
#![deny(unused_must_use)]
#![deny(unsafe_op_in_unsafe_fn)]

/// AI adapter: vision analysis and caption generation.
pub mod ai;
/// HTTP API: routes, handlers, middleware, DTOs.
pub mod api;
/// Admin authentication (OIDC + legacy shared password).
pub mod auth;
/// Process configuration loading and validation.
pub mod config;
/// Domain error types, shared models, and the workflow orchestrator.
pub mod core;
/// Observability: correlation ids and redacting structured logging.
pub mod observability;
/// Outbound publish channels (Telegram, email, FetLife, Instagram).
pub mod publishers;
/// The sidecar-as-cache text codec.
pub mod sidecar;
/// Object-store adapter (Dropbox) and its trait.
pub mod storage;
/// Per-tenant configuration: resolution, caching, credentials.
pub mod tenant;
/// Shared utilities not specific to any one module.
pub mod utils;
