//! Process-wide `ApplicationConfig` and its layered loader. Distinct from
//! `tenant::model::TenantConfig`, which is per-host and resolved dynamically.

/// Hand-rolled legacy INI fallback parser.
pub mod ini;
/// The layered env/JSON/INI loader.
pub mod loader;
/// `ApplicationConfig` and its settings-grouping shape.
pub mod schema;

pub use schema::{ApplicationConfig, LogFormat};
