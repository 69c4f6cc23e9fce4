//! Router construction: public routes merged with an admin-gated protected
//! router, tenant resolution applied to everything that needs a tenant, and
//! the correlation-id middleware wrapping the whole thing including the
//! static SPA fallback.

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;

use crate::ai::AiAdapter;
use crate::auth::{self, AuthMiddlewareState, AuthState};
use crate::config::ApplicationConfig;
use crate::storage::StorageAdapter;
use crate::tenant::{CredentialResolver, TenantResolver};

use super::handlers::{self, AppState};
use super::middleware::{TenantMiddlewareState, correlation_id_middleware, tenant_resolution_middleware};
use super::static_files;

/// Everything the router needs to construct every sub-router's state. Kept
/// as a plain struct (rather than one shared `axum` state type) because
/// each sub-router below needs a different slice of it.
pub struct RouterDeps {
    /// Object-store adapter, shared across tenants.
    pub storage: Arc<dyn StorageAdapter>,
    /// AI adapter, shared across tenants.
    pub ai: Arc<dyn AiAdapter>,
    /// Tenant resolver (orchestrator client + TTL/stale-serve cache).
    pub tenant_resolver: Arc<TenantResolver>,
    /// Resolves `credentials_ref` values to live secrets.
    pub credential_resolver: Arc<dyn CredentialResolver>,
    /// HTTP client shared by the Auth0 token exchange.
    pub http_client: reqwest::Client,
    /// Process configuration.
    pub config: Arc<ApplicationConfig>,
    /// Allowed CORS origins. Empty means same-origin only.
    pub cors_origins: Vec<String>,
}

/// Build the full application router.
#[must_use]
pub fn create_router(deps: RouterDeps) -> Router {
    let cors_origins = deps.cors_origins.clone();
    let tenant_state = TenantMiddlewareState { resolver: deps.tenant_resolver, credentials: deps.credential_resolver };
    let app_state = AppState::new(deps.storage.clone(), deps.ai);
    let admin_state = AuthMiddlewareState { web_session_secret: deps.config.web_session_secret.clone() };
    let auth_state = AuthState { config: deps.config, http_client: deps.http_client, storage: deps.storage };

    let admin_routes = Router::new()
        .route("/api/images/{filename}/analyze", post(handlers::analyze_image))
        .route("/api/images/{filename}/publish", post(handlers::publish_image))
        .route("/api/images/{filename}/keep", post(handlers::keep_image))
        .route("/api/images/{filename}/remove", post(handlers::remove_image))
        .with_state(app_state.clone())
        .route_layer(middleware::from_fn_with_state(admin_state, auth::require_admin));

    let viewer_routes = Router::new()
        .route("/api/config/features", get(handlers::get_features))
        .route("/api/config/publishers", get(handlers::get_publishers))
        .route("/api/images/random", get(handlers::get_random_image))
        .route("/api/images/list", get(handlers::list_images))
        .route("/api/images/{filename}", get(handlers::get_image))
        .with_state(app_state);

    let auth_routes = Router::new()
        .route("/auth/login", get(auth::login))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/logout", get(auth::logout))
        .route("/api/admin/login", post(auth::admin_login))
        .route("/api/admin/logout", post(auth::admin_logout))
        .with_state(auth_state.clone());

    // Every tenant-scoped route resolves `TenantConfig` from the Host
    // header before the handler runs; `admin/status` is intentionally kept
    // outside this group since it must answer even for hosts with no
    // tenant configured yet.
    let tenant_scoped = Router::new()
        .merge(admin_routes)
        .merge(viewer_routes)
        .merge(auth_routes)
        .layer(middleware::from_fn_with_state(tenant_state, tenant_resolution_middleware));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/admin/status", get(auth::admin_status))
        .with_state(auth_state)
        .merge(tenant_scoped)
        .route("/", get(static_files::index))
        .fallback(static_files::serve)
        .layer(cors_layer(&cors_origins))
        .layer(middleware::from_fn(correlation_id_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::POST]);
    if origins.is_empty() {
        layer
    } else {
        let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        layer.allow_origin(parsed)
    }
}
