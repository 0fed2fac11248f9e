//! Test bearer-token enforcement on protected routes.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};

use crate::account::Account;
use crate::auth::{AuthConfig, TokenAuthority};
use crate::e2e_tests::helpers::*;
use crate::time::{FixedTimeSource, SystemTimeSource, TimeSource};

fn alice() -> Account {
    Account {
        id: 1,
        username: "alice".to_string(),
        password_hash: String::new(),
        token_hash: "salt".to_string(),
        created_at: 0,
        updated_at: 0,
    }
}

#[allow(clippy::expect_used)]
async fn get_images_with_header(app: &TestApp, authorization: &str) -> StatusCode {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/images")
        .header(header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .expect("valid request");
    app.send(request).await.0
}

#[tokio::test]
async fn test_valid_access_token_is_accepted() {
    let app = TestApp::new();
    let (access, _) = app.signed_in("alice", "pw").await;

    let (status, body) = app.get("/images", Some(access.as_str())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let app = TestApp::new();

    let (status, body) = app.get("/images", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let app = TestApp::new();

    let (status, _) = app.get("/images", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[allow(clippy::expect_used)]
async fn test_token_from_foreign_secret_is_rejected() {
    let app = TestApp::new();
    app.register("alice", "pw").await;

    let foreign = AuthConfig::new(b"someone-else".to_vec(), b"someone-else-refresh".to_vec())
        .expect("config");
    let token = TokenAuthority::new(&foreign)
        .expect("authority")
        .issue_access_token(&alice())
        .expect("issue");

    let (status, _) = app.get("/images", Some(token.as_str())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[allow(clippy::expect_used)]
async fn test_expired_token_is_rejected() {
    let app = TestApp::new();

    let two_hours_ago = SystemTimeSource.now_secs() - 2 * 60 * 60;
    let token = TokenAuthority::with_time_source(
        &auth_config(),
        Arc::new(FixedTimeSource(two_hours_ago)),
    )
    .expect("authority")
    .issue_access_token(&alice())
    .expect("issue");

    let (status, _) = app.get("/images", Some(token.as_str())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_not_a_bearer_token() {
    let app = TestApp::new();
    let (_, refresh) = app.signed_in("alice", "pw").await;

    let (status, _) = app.get("/images", Some(refresh.as_str())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_scheme_is_case_insensitive() {
    let app = TestApp::new();
    let (access, _) = app.signed_in("alice", "pw").await;

    assert_eq!(
        get_images_with_header(&app, &format!("bearer {access}")).await,
        StatusCode::OK
    );
    assert_eq!(
        get_images_with_header(&app, &format!("Basic {access}")).await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        get_images_with_header(&app, &access).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_public_routes_need_no_token() {
    let app = TestApp::new();

    let (status, _) = app.get("/ping", None).await;
    assert_eq!(status, StatusCode::OK);
}
