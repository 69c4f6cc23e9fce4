//! End-to-end tests against the assembled router: correlation-id middleware,
//! tenant resolution, and admin gating, none of which are exercised by any
//! single module's unit tests in isolation.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use image_publisher::ai::MockAiAdapter;
use image_publisher::api::{RouterDeps, create_router};
use image_publisher::config::ApplicationConfig;
use image_publisher::config::schema::LogFormat;
use image_publisher::storage::MockStorageAdapter;
use image_publisher::tenant::credentials::EnvCredentialResolver;
use image_publisher::tenant::TenantResolver;

fn test_config() -> ApplicationConfig {
    ApplicationConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        orchestrator_base_url: "http://127.0.0.1:0".to_string(),
        log_format: LogFormat::Json,
        tenant_cache_max_size: 10,
        admin_cookie_ttl_seconds: 3600,
        openai_api_key: "test-key".to_string(),
        openai_base_url: "http://127.0.0.1:0".to_string(),
        openai_model: "test-model".to_string(),
        openai_qps: 2,
        dropbox_app_key: "app-key".to_string(),
        dropbox_app_secret: "app-secret".to_string(),
        dropbox_refresh_token: "refresh-token".to_string(),
        web_session_secret: "session-secret".to_string(),
        web_admin_password: None,
        auth0_client_secret: None,
    }
}

fn test_router() -> axum::Router {
    // Port 0 on loopback refuses every connection synchronously, which is
    // exactly the "orchestrator unreachable" case these tests want without
    // standing up a fake orchestrator.
    let tenant_resolver = Arc::new(TenantResolver::new("http://127.0.0.1:0", 10, Box::new(EnvCredentialResolver)));

    create_router(RouterDeps {
        storage: Arc::new(MockStorageAdapter::new()),
        ai: Arc::new(MockAiAdapter::new()),
        tenant_resolver,
        credential_resolver: Arc::new(EnvCredentialResolver),
        http_client: reqwest::Client::new(),
        config: Arc::new(test_config()),
        cors_origins: Vec::new(),
    })
}

#[tokio::test]
async fn health_endpoint_is_ungated_and_carries_a_correlation_id() {
    let response = test_router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-correlation-id"));
}

#[tokio::test]
async fn admin_status_answers_without_a_resolvable_tenant() {
    // `/api/admin/status` sits outside the tenant-resolution-gated router
    // group, so it must answer even though the test orchestrator is
    // unreachable.
    let response = test_router()
        .oneshot(Request::builder().uri("/api/admin/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn tenant_scoped_route_fails_closed_when_the_orchestrator_is_unreachable() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .uri("/api/config/features")
                .header("host", "acme.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn tenant_scoped_route_without_a_host_header_is_a_bad_request() {
    let response = test_router()
        .oneshot(Request::builder().uri("/api/config/features").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_gated_route_is_rejected_without_a_session_cookie() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/images/foo.jpg/publish")
                .header("host", "acme.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Tenant resolution runs first (outer layer) and fails closed before the
    // admin gate is ever reached, since the orchestrator is unreachable.
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn unmatched_path_falls_back_to_the_embedded_spa_shell() {
    let response = test_router()
        .oneshot(Request::builder().uri("/some/client/route").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
