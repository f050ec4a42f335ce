//! HTTP API Integration Tests

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sessiongate::{
    api::{ApiServer, AppState},
    auth::{AuthService, PasswordHasher, SessionManager, SqliteCredentialStore},
    config::{HashingConfig, PolicyConfig},
    metrics::Metrics,
};
use std::sync::Arc;
use tower::ServiceExt;

fn test_app(policy: PolicyConfig) -> Router {
    let hasher = PasswordHasher::new(&HashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap();
    let auth = AuthService::new(
        Arc::new(SqliteCredentialStore::in_memory().unwrap()),
        hasher,
        Arc::new(SessionManager::new(None)),
        policy,
    );
    let state = AppState::new(auth, Arc::new(Metrics::new().unwrap()), true);

    ApiServer::new("127.0.0.1:0".parse().unwrap(), state).create_test_router()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_token(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn register_and_login(app: &Router, username: &str, password: &str) -> String {
    let credentials = json!({"username": username, "password": password});
    let (status, _) = send(app, post_json("/register", credentials.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(app, post_json("/login", credentials)).await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_full_session_lifecycle() {
    let app = test_app(PolicyConfig::default());

    let (status, body) = send(
        &app,
        post_json("/register", json!({"username": "alice", "password": "s3cret"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["user_id"], 1);

    let (status, body) = send(
        &app,
        post_json("/login", json!({"username": "alice", "password": "s3cret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert!(token.len() >= 32);

    let authenticated_at: DateTime<Utc> =
        serde_json::from_value(body["data"]["authenticated_at"].clone()).unwrap();

    let (status, body) = send(&app, with_token("GET", "/tasks", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    let session_started: DateTime<Utc> =
        serde_json::from_value(body["data"]["session_started"].clone()).unwrap();
    assert!(session_started <= authenticated_at);

    let (status, body) = send(&app, with_token("POST", "/logout", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["had_session"], true);
    assert_eq!(body["data"]["username"], "alice");

    // The token is dead after logout.
    let (status, _) = send(&app, with_token("GET", "/tasks", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, with_token("POST", "/logout", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["had_session"], false);
}

#[tokio::test]
async fn test_registration_validation() {
    let app = test_app(PolicyConfig::default());

    let (status, body) = send(
        &app,
        post_json("/register", json!({"username": "ab", "password": "longenough"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "validation_error");

    let (status, _) = send(
        &app,
        post_json("/register", json!({"username": "alice", "password": "abc"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post_json("/register", json!({"username": "alice"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, get("/status")).await;
    assert_eq!(body["data"]["registered_user_count"], 0);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = test_app(PolicyConfig::default());
    let credentials = json!({"username": "alice", "password": "s3cret"});

    let (status, _) = send(&app, post_json("/register", credentials.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        post_json("/register", json!({"username": "alice", "password": "different"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    // The original password still works.
    let (status, _) = send(&app, post_json("/login", credentials)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_failures() {
    let app = test_app(PolicyConfig::default());
    register_and_login(&app, "alice", "s3cret").await;

    let (status, _) = send(
        &app,
        post_json("/login", json!({"username": "alice", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        post_json("/login", json!({"username": "ghost", "password": "whatever"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        post_json("/login", json!({"username": "", "password": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_concealed_unknown_user() {
    let app = test_app(PolicyConfig {
        conceal_unknown_users: true,
        ..PolicyConfig::default()
    });
    register_and_login(&app, "alice", "s3cret").await;

    let (ghost_status, ghost_body) = send(
        &app,
        post_json("/login", json!({"username": "ghost", "password": "whatever"})),
    )
    .await;
    let (wrong_status, wrong_body) = send(
        &app,
        post_json("/login", json!({"username": "alice", "password": "wrong"})),
    )
    .await;

    assert_eq!(ghost_status, StatusCode::UNAUTHORIZED);
    assert_eq!(ghost_status, wrong_status);
    assert_eq!(ghost_body["error"], wrong_body["error"]);
    assert_eq!(ghost_body["code"], wrong_body["code"]);
}

#[tokio::test]
async fn test_protected_route_rejections() {
    let app = test_app(PolicyConfig::default());

    let (status, body) = send(&app, get("/tasks")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, with_token("GET", "/tasks", "forged-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/tasks")
        .header(header::AUTHORIZATION, "Basic YWxpY2U6czNjcmV0")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let app = test_app(PolicyConfig::default());
    let first = register_and_login(&app, "alice", "s3cret").await;

    let (_, body) = send(
        &app,
        post_json("/login", json!({"username": "alice", "password": "s3cret"})),
    )
    .await;
    let second = body["data"]["token"].as_str().unwrap().to_string();
    assert_ne!(first, second);

    let (status, _) = send(&app, with_token("POST", "/logout", &first)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, with_token("GET", "/tasks", &second)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_without_token() {
    let app = test_app(PolicyConfig::default());

    let request = Request::builder()
        .method("POST")
        .uri("/logout")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["had_session"], false);
}

#[tokio::test]
async fn test_status_counts() {
    let app = test_app(PolicyConfig::default());

    let (status, body) = send(&app, get("/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["registered_user_count"], 0);
    assert_eq!(body["data"]["task_count"], 0);

    register_and_login(&app, "alice", "s3cret").await;
    register_and_login(&app, "bob", "hunter22").await;

    let (_, body) = send(&app, get("/status")).await;
    assert_eq!(body["data"]["registered_user_count"], 2);
    assert_eq!(body["data"]["active_sessions"], 2);
}

#[tokio::test]
async fn test_index_and_metrics() {
    let app = test_app(PolicyConfig::default());

    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "sessiongate");
    assert!(body["data"]["endpoints"].as_array().unwrap().len() >= 5);

    register_and_login(&app, "alice", "s3cret").await;

    let response = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("sessiongate_registrations_total 1"));
    assert!(text.contains("sessiongate_login_attempts_total 1"));
    assert!(text.contains("sessiongate_active_sessions 1"));
}
