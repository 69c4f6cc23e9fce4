//! HTTP handlers for the auth surface: OIDC login/callback/logout and the
//! legacy shared-password admin login.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use rand::Rng as _;
use uuid::Uuid;

use super::{
    middleware::ADMIN_COOKIE_NAME,
    oidc, session,
    types::{AdminLoginRequest, AdminStatusResponse, OidcCallbackQuery},
};
use crate::config::ApplicationConfig;
use crate::storage::StorageAdapter;
use crate::tenant::model::TenantConfig;

/// Shared state for the auth handlers.
#[derive(Clone)]
pub struct AuthState {
    /// Process configuration (secrets, cookie TTL).
    pub config: Arc<ApplicationConfig>,
    /// Shared HTTP client for the Auth0 token exchange.
    pub http_client: reqwest::Client,
    /// The object-store adapter, used only to best-effort pre-create
    /// curation folders on a successful admin login.
    pub storage: Arc<dyn StorageAdapter>,
}

/// Error responses for the auth surface, matching the HTTP layer's
/// `AppError` status-code conventions.
#[derive(Debug)]
pub enum AuthError {
    /// The tenant has no Auth0 configuration, or it is incomplete.
    NotConfigured(String),
    /// Auth0 rejected the handshake or the email was outside the allowlist.
    Unauthorized(String),
    /// The legacy shared password is not configured for this process.
    PasswordLoginDisabled,
    /// Something downstream (the token exchange) failed unexpectedly.
    Internal(anyhow::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotConfigured(detail) => (StatusCode::NOT_FOUND, detail),
            Self::Unauthorized(detail) => (StatusCode::UNAUTHORIZED, detail),
            Self::PasswordLoginDisabled => (StatusCode::SERVICE_UNAVAILABLE, "password login is not configured".to_string()),
            Self::Internal(err) => {
                tracing::error!(error = %err, "auth_handler_internal_error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "detail": message }))).into_response()
    }
}

fn callback_url(headers: &HeaderMap) -> String {
    let host = headers.get("host").and_then(|v| v.to_str().ok()).unwrap_or("localhost");
    format!("{}://{host}/auth/callback", request_scheme(headers))
}

fn request_scheme(headers: &HeaderMap) -> &'static str {
    if headers.get("x-forwarded-proto").and_then(|v| v.to_str().ok()) == Some("https") { "https" } else { "http" }
}

/// `GET /auth/login`: redirect to the tenant's Auth0 `/authorize` endpoint.
/// The callback URL is computed from the incoming `Host` header on every
/// request, never stored in config, so one process serves the login flow
/// for every tenant hostname it fronts.
pub async fn login(headers: HeaderMap, Extension(tenant): Extension<TenantConfig>) -> Result<Redirect, AuthError> {
    let auth0 = tenant.auth0.as_ref().ok_or_else(|| AuthError::NotConfigured("tenant has no auth0 configuration".to_string()))?;
    let state = Uuid::new_v4().to_string();
    let url = oidc::build_authorize_url(auth0, &callback_url(&headers), &state)
        .ok_or_else(|| AuthError::NotConfigured("tenant auth0 configuration is incomplete".to_string()))?;
    Ok(Redirect::temporary(&url))
}

/// `GET /auth/callback`: exchange the authorization code, check the email
/// against the tenant's allowlist, and set the signed admin cookie.
pub async fn callback(
    headers: HeaderMap,
    Query(query): Query<OidcCallbackQuery>,
    State(state): State<AuthState>,
    Extension(tenant): Extension<TenantConfig>,
) -> Result<(CookieJar, Redirect), AuthError> {
    if let Some(error) = query.error {
        return Err(AuthError::Unauthorized(format!("auth0 returned an error: {error}")));
    }
    let code = query.code.ok_or_else(|| AuthError::Unauthorized("missing authorization code".to_string()))?;

    let auth0 = tenant.auth0.as_ref().ok_or_else(|| AuthError::NotConfigured("tenant has no auth0 configuration".to_string()))?;
    let client_secret = state
        .config
        .auth0_client_secret
        .as_deref()
        .ok_or_else(|| AuthError::NotConfigured("AUTH0_CLIENT_SECRET is not configured for this process".to_string()))?;

    let email = oidc::exchange_code_for_email(&state.http_client, auth0, client_secret, &callback_url(&headers), &code)
        .await
        .map_err(AuthError::Internal)?;

    if !auth0.admin_login_emails.iter().any(|allowed| allowed.eq_ignore_ascii_case(&email)) {
        tracing::warn!(email = %email, "admin_login_rejected_not_allowlisted");
        return Err(AuthError::Unauthorized("email is not on the admin allowlist".to_string()));
    }

    ensure_curation_folders(&state, &tenant).await;

    let cookie_value = session::encode(state.config.web_session_secret.as_bytes(), &email, state.config.admin_cookie_ttl_seconds, Utc::now());
    let jar = CookieJar::new().add(admin_cookie(cookie_value, request_scheme(&headers) == "https"));

    Ok((jar, Redirect::temporary("/")))
}

/// `GET /auth/logout`: clear the admin cookie and send the caller home.
pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    (jar.remove(Cookie::from(ADMIN_COOKIE_NAME)), Redirect::temporary("/"))
}

/// `POST /api/admin/login`: legacy shared-password fallback, for tenants
/// that have not migrated to Auth0.
pub async fn admin_login(
    headers: HeaderMap,
    State(state): State<AuthState>,
    Extension(tenant): Extension<TenantConfig>,
    Json(request): Json<AdminLoginRequest>,
) -> Result<(CookieJar, StatusCode), AuthError> {
    let expected = state.config.web_admin_password.as_ref().ok_or(AuthError::PasswordLoginDisabled)?;

    if !constant_time_str_eq(expected, &request.password) {
        return Err(AuthError::Unauthorized("invalid password".to_string()));
    }

    ensure_curation_folders(&state, &tenant).await;

    let cookie_value = session::encode(state.config.web_session_secret.as_bytes(), "admin", state.config.admin_cookie_ttl_seconds, Utc::now());
    let jar = CookieJar::new().add(admin_cookie(cookie_value, request_scheme(&headers) == "https"));
    Ok((jar, StatusCode::NO_CONTENT))
}

/// `GET /api/admin/status`: whether the caller currently holds a valid
/// admin session. Always public; never itself requires admin.
pub async fn admin_status(State(state): State<AuthState>, jar: CookieJar) -> Json<AdminStatusResponse> {
    let admin = jar
        .get(ADMIN_COOKIE_NAME)
        .is_some_and(|cookie| session::decode(state.config.web_session_secret.as_bytes(), cookie.value(), Utc::now()).is_some());
    Json(AdminStatusResponse { admin })
}

/// `POST /api/admin/logout`: clear the admin cookie.
pub async fn admin_logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    (jar.remove(Cookie::from(ADMIN_COOKIE_NAME)), StatusCode::NO_CONTENT)
}

/// Builds the outgoing `pv2_admin` cookie. Deliberately has no `Max-Age`: the
/// claims embedded in the cookie value carry their own `expires_at`, so the
/// browser treats this as a session cookie while the real expiry is enforced
/// server-side by `session::decode` on every request.
fn admin_cookie(value: String, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(ADMIN_COOKIE_NAME, value);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(secure);
    cookie.set_path("/");
    cookie
}

/// Best-effort: a successful admin login is a good moment to make sure the
/// tenant's curation subfolders exist, so the first "keep"/"remove" action
/// doesn't fail on a missing folder. Failure is logged, never fatal.
async fn ensure_curation_folders(state: &AuthState, tenant: &TenantConfig) {
    for folder in [&tenant.storage.keep, &tenant.storage.remove, &tenant.storage.archive] {
        let path = format!("{}/{}", tenant.storage.root, folder);
        if let Err(err) = state.storage.ensure_folder(&path).await {
            tracing::warn!(folder = %path, error = %err, "ensure_curation_folder_failed");
        }
    }
}

fn constant_time_str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        // Still do the comparison work so the early return doesn't leak
        // timing on the common case of a wrong-length password.
        let _ = rand::rng().random::<u8>();
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_str_eq_matches_equal_strings() {
        assert!(constant_time_str_eq("hunter2", "hunter2"));
    }

    #[test]
    fn constant_time_str_eq_rejects_different_strings() {
        assert!(!constant_time_str_eq("hunter2", "hunter3"));
        assert!(!constant_time_str_eq("short", "muchlonger"));
    }

    #[test]
    fn callback_url_defaults_to_http_without_forwarded_proto() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "tenant.example.com".parse().unwrap());
        assert_eq!(callback_url(&headers), "http://tenant.example.com/auth/callback");
    }

    #[test]
    fn callback_url_respects_x_forwarded_proto() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "tenant.example.com".parse().unwrap());
        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        assert_eq!(callback_url(&headers), "https://tenant.example.com/auth/callback");
    }
}
