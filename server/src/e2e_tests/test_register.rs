//! Test account registration.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;

use crate::e2e_tests::helpers::*;

#[tokio::test]
async fn test_register_creates_account() {
    let app = TestApp::new();

    let (status, body) = app.register("alice", "s3cret").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], 1);
    assert_eq!(body["username"], "alice");
    // Nothing secret leaks back.
    assert!(body.get("password_hash").is_none());
    assert!(body.get("token_hash").is_none());
}

#[tokio::test]
async fn test_register_assigns_distinct_ids() {
    let app = TestApp::new();

    let (_, alice) = app.register("alice", "pw").await;
    let (_, bob) = app.register("bob", "pw").await;

    assert_eq!(alice["id"], 1);
    assert_eq!(bob["id"], 2);
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let app = TestApp::new();
    app.register("alice", "pw").await;

    let (status, body) = app.register("alice", "other").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_register_empty_fields() {
    let app = TestApp::new();

    let (status, _) = app.register("", "pw").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.register("alice", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_missing_field() {
    let app = TestApp::new();

    let (status, body) = app.post_json("/register", &json!({ "username": "alice" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "malformed request body");
}

#[tokio::test]
#[allow(clippy::expect_used)]
async fn test_register_malformed_json() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("valid request");

    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[allow(clippy::expect_used)]
async fn test_register_stores_hashed_password() {
    let app = TestApp::new();
    app.register("alice", "s3cret").await;

    let pair = app
        .state
        .accounts
        .authenticate_and_issue("alice", "s3cret")
        .expect("stored credentials work");
    assert!(!pair.access_token.is_empty());
}

#[tokio::test]
async fn test_register_rejects_overlong_password() {
    let app = TestApp::new();
    let long = "a".repeat(crate::auth::MAX_PASSWORD_BYTES + 1);

    let (status, _) = app.register("bob", &long).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
