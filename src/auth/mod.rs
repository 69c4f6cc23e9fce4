//! Admin authentication: OIDC login against a tenant's Auth0 application,
//! a legacy shared-password fallback, and the HMAC-signed session cookie
//! both paths issue.

/// HTTP handlers for the auth surface.
pub mod handlers;
/// `require_admin` middleware and the verified identity it inserts.
pub mod middleware;
/// The thin Auth0 authorization-code client.
pub mod oidc;
/// The admin session cookie codec.
pub mod session;
/// Request/response DTOs.
pub mod types;

pub use handlers::{AuthError, AuthState, admin_login, admin_logout, admin_status, callback, login, logout};
pub use middleware::{ADMIN_COOKIE_NAME, AdminIdentity, AuthMiddlewareState, require_admin};
