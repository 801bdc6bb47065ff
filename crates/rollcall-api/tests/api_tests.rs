//! API Integration Tests
//!
//! Drive the full router with in-memory credential and revocation stores.
//! Store outages are simulated with failing and stalling store doubles.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use rollcall_api::auth::{
    hash_password, AuthSessionManager, MemoryRevocationStore, RevocationStore, StoreError,
};
use rollcall_api::{create_router, state::AppState};
use rollcall_core::{AppConfig, AuthConfig, Credential, InMemoryCredentialStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const USERNAME: &str = "admin";
const PASSWORD: &str = "admin1234";

/// Revocation store whose backend always errors
struct FailingStore;

#[async_trait]
impl RevocationStore for FailingStore {
    async fn revoke(&self, _token_id: &str, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn is_revoked(&self, _token_id: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Revocation store that never answers
struct StalledStore;

#[async_trait]
impl RevocationStore for StalledStore {
    async fn revoke(&self, _token_id: &str, _ttl: Duration) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn is_revoked(&self, _token_id: &str) -> Result<bool, StoreError> {
        std::future::pending().await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        std::future::pending().await
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        auth: AuthConfig {
            jwt_secret: "integration-test-secret".to_string(),
            bcrypt_cost: 4,
            operation_timeout_ms: 500,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn test_state_with(revocations: Arc<dyn RevocationStore>) -> Arc<AppState> {
    let config = test_config();
    let credentials = InMemoryCredentialStore::new().with_credential(Credential::new(
        "1",
        USERNAME,
        hash_password(PASSWORD, 4).unwrap(),
    ));

    let auth = AuthSessionManager::new(&config.auth, Arc::new(credentials), revocations).unwrap();
    Arc::new(AppState::new(config, Arc::new(auth)))
}

fn test_app() -> Router {
    create_router(test_state_with(Arc::new(MemoryRevocationStore::default())))
}

fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "username": username, "password": password }).to_string(),
        ))
        .unwrap()
}

fn bearer_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(login_request(USERNAME, PASSWORD))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    json["accessToken"].as_str().unwrap().to_string()
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_check() {
    let app = test_app();

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["ready"], true);
    assert_eq!(json["checks"]["revocation_store"], "memory");
}

#[tokio::test]
async fn test_readiness_fails_when_store_down() {
    let app = create_router(test_state_with(Arc::new(FailingStore)));

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_openapi_document() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["paths"]["/api/login"].is_object());
    assert!(json["paths"]["/api/logout"].is_object());
}

// =============================================================================
// Login Tests
// =============================================================================

#[tokio::test]
async fn test_login_success() {
    let app = test_app();

    let response = app
        .oneshot(login_request(USERNAME, PASSWORD))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["accessToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(json["tokenType"], "Bearer");
    assert_eq!(json["expiresIn"], 3600);
}

#[tokio::test]
async fn test_login_failures_share_one_response() {
    let app = test_app();

    let wrong_password = app
        .clone()
        .oneshot(login_request(USERNAME, "wrong"))
        .await
        .unwrap();
    let unknown_user = app
        .clone()
        .oneshot(login_request("nobody", PASSWORD))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(wrong_password).await, body_json(unknown_user).await);
}

#[tokio::test]
async fn test_login_rejects_malformed_body() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"username":"admin"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

// =============================================================================
// Protected Route Tests
// =============================================================================

#[tokio::test]
async fn test_login_then_protected_access() {
    let app = test_app();
    let token = login(&app).await;

    let response = app
        .oneshot(bearer_request("GET", "/api/me", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["subject"], "1");
    assert!(json["tokenId"].is_string());
}

#[tokio::test]
async fn test_missing_or_malformed_header() {
    let app = test_app();
    let token = login(&app).await;

    let no_header = Request::builder()
        .uri("/api/me")
        .body(Body::empty())
        .unwrap();
    let wrong_scheme = Request::builder()
        .uri("/api/me")
        .header(header::AUTHORIZATION, format!("Token {token}"))
        .body(Body::empty())
        .unwrap();
    let lowercase_scheme = Request::builder()
        .uri("/api/me")
        .header(header::AUTHORIZATION, format!("bearer {token}"))
        .body(Body::empty())
        .unwrap();

    for request in [no_header, wrong_scheme, lowercase_scheme] {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let app = test_app();

    let response = app
        .oneshot(bearer_request("GET", "/api/me", "not.a.token"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

// =============================================================================
// Logout Tests
// =============================================================================

#[tokio::test]
async fn test_logout_is_idempotent_over_http() {
    let app = test_app();
    let token = login(&app).await;

    let first = app
        .clone()
        .oneshot(bearer_request("GET", "/api/logout", &token))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(
        body_json(first).await,
        json!({ "message": "Successfully logged out!" })
    );

    for _ in 0..2 {
        let again = app
            .clone()
            .oneshot(bearer_request("GET", "/api/logout", &token))
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::UNAUTHORIZED);
    }

    let me = app
        .oneshot(bearer_request("GET", "/api/me", &token))
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_accepts_post() {
    let app = test_app();
    let token = login(&app).await;

    let response = app
        .oneshot(bearer_request("POST", "/api/logout", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_leaves_other_tokens_valid() {
    let app = test_app();
    let first = login(&app).await;
    let second = login(&app).await;

    let response = app
        .clone()
        .oneshot(bearer_request("GET", "/api/logout", &first))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(bearer_request("GET", "/api/me", &second))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Store Outage Tests
// =============================================================================

#[tokio::test]
async fn test_store_outage_denies_access() {
    let state = test_state_with(Arc::new(FailingStore));
    let token = state
        .auth
        .codec()
        .issue("1", Duration::from_secs(60))
        .unwrap()
        .token;
    let app = create_router(state);

    let response = app
        .oneshot(bearer_request("GET", "/api/me", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["code"], "AUTH_UNAVAILABLE");
}

#[tokio::test]
async fn test_store_stall_times_out_and_denies_access() {
    let state = test_state_with(Arc::new(StalledStore));
    let token = state
        .auth
        .codec()
        .issue("1", Duration::from_secs(60))
        .unwrap()
        .token;
    let app = create_router(state);

    let response = tokio::time::timeout(
        Duration::from_secs(5),
        app.oneshot(bearer_request("GET", "/api/me", &token)),
    )
    .await
    .expect("authorization should give up at the operation deadline")
    .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// Metrics Tests
// =============================================================================

#[tokio::test]
async fn test_metrics_count_decisions() {
    let app = test_app();
    let token = login(&app).await;

    app.clone()
        .oneshot(bearer_request("GET", "/api/me", &token))
        .await
        .unwrap();
    app.clone()
        .oneshot(bearer_request("GET", "/api/me", "garbage"))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains("rollcall_auth_decisions_total{outcome=\"granted\"} 1"));
    assert!(text.contains("rollcall_auth_decisions_total{outcome=\"invalid_signature\"} 1"));
    assert!(text.contains("rollcall_logins_total{result=\"success\"} 1"));
}
