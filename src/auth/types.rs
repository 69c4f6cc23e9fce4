//! Request/response DTOs for the auth surface: OIDC login, the legacy
//! shared-password fallback, and admin status.

use serde::{Deserialize, Serialize};

/// `GET /api/admin/status` response.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AdminStatusResponse {
    /// Whether the caller currently holds a valid admin session.
    pub admin: bool,
}

/// Query parameters on `GET /auth/callback`.
#[derive(Debug, Clone, Deserialize)]
pub struct OidcCallbackQuery {
    /// Authorization code issued by Auth0.
    pub code: Option<String>,
    /// Opaque state value echoed back by Auth0.
    pub state: Option<String>,
    /// Error code, present when the user denied consent or Auth0 itself
    /// failed the request.
    pub error: Option<String>,
}

/// `POST /api/admin/login` request body (legacy shared-password fallback).
#[derive(Debug, Clone, Deserialize)]
pub struct AdminLoginRequest {
    /// The shared admin password, compared against `web_admin_pw`.
    pub password: String,
}

/// The decoded Auth0 ID token fields this service actually reads. Every
/// other claim is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenClaims {
    /// The authenticated user's email, checked against the tenant's
    /// `admin_login_emails` allowlist.
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenExchangeResponse {
    pub id_token: String,
}
