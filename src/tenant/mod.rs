//! Multi-tenant configuration resolution: host normalization, the
//! orchestrator client, the TTL/LRU cache, and credential resolution.

/// TTL + LRU host-keyed config cache.
pub mod cache;
/// Opaque `credentials_ref` resolution.
pub mod credentials;
/// The resolved `TenantConfig` shape and the orchestrator wire schema.
pub mod model;
/// Host → `TenantConfig` resolution pipeline.
pub mod resolver;

pub use credentials::{CredentialResolver, EnvCredentialResolver};
pub use model::TenantConfig;
pub use resolver::{TenantResolver, normalize_host};
