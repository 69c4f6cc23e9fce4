//! Admin-route middleware: verifies the `pv2_admin` cookie and inserts the
//! decoded identity into request extensions. Unlike the reference daemon's
//! session middleware, there is no database round-trip — verification is
//! pure HMAC and runs entirely in-process.

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;

use crate::auth::session;

/// The admin cookie name, shared by the setter (login handlers) and the
/// verifier (this middleware).
pub const ADMIN_COOKIE_NAME: &str = "pv2_admin";

/// The verified admin identity, inserted into request extensions on success.
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    /// The allowlisted email the session was issued for.
    pub email: String,
}

/// Shared state for `require_admin`.
#[derive(Clone)]
pub struct AuthMiddlewareState {
    /// HMAC key backing the admin cookie, from `ApplicationConfig.web_session_secret`.
    pub web_session_secret: String,
}

/// Reject the request with 401 unless the `pv2_admin` cookie carries a
/// currently-valid signed session; otherwise insert `AdminIdentity` and
/// continue.
pub async fn require_admin(
    State(state): State<AuthMiddlewareState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let cookie = jar.get(ADMIN_COOKIE_NAME).ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = session::decode(state.web_session_secret.as_bytes(), cookie.value(), Utc::now()).ok_or_else(|| {
        tracing::debug!("admin cookie failed verification or is expired");
        StatusCode::UNAUTHORIZED
    })?;

    request.extensions_mut().insert(AdminIdentity { email: claims.email });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, routing::get};
    use tower::ServiceExt;

    async fn probe(_identity: axum::Extension<AdminIdentity>) -> &'static str {
        "ok"
    }

    fn app(secret: &str) -> Router {
        let state = AuthMiddlewareState { web_session_secret: secret.to_string() };
        Router::new()
            .route("/admin-only", get(probe))
            .layer(axum::middleware::from_fn_with_state(state, require_admin))
    }

    #[tokio::test]
    async fn request_without_cookie_is_rejected() {
        let response = app("secret").oneshot(Request::builder().uri("/admin-only").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn request_with_a_valid_cookie_is_admitted() {
        let cookie_value = session::encode(b"secret", "admin@example.com", 3600, Utc::now());
        let response = app("secret")
            .oneshot(Request::builder().uri("/admin-only").header("cookie", format!("{ADMIN_COOKIE_NAME}={cookie_value}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn request_with_a_cookie_signed_by_a_different_secret_is_rejected() {
        let cookie_value = session::encode(b"other-secret", "admin@example.com", 3600, Utc::now());
        let response = app("secret")
            .oneshot(Request::builder().uri("/admin-only").header("cookie", format!("{ADMIN_COOKIE_NAME}={cookie_value}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
