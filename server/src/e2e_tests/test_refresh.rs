//! Test access-token refresh and refresh-token revocation.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use crate::account::Account;
use crate::auth::{AuthError, TokenAuthority};
use crate::e2e_tests::helpers::*;
use crate::time::{FixedTimeSource, SystemTimeSource, TimeSource};

#[tokio::test]
#[allow(clippy::expect_used)]
async fn test_refresh_returns_working_access_token() {
    let app = TestApp::new();
    let (_, refresh) = app.signed_in("alice", "pw").await;

    let (status, body) = app
        .post_json("/refresh", &json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let access = body["access_token"].as_str().expect("access token");
    let (status, _) = app.get("/images", Some(access)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let app = TestApp::new();
    let (access, _) = app.signed_in("alice", "pw").await;

    let (status, body) = app
        .post_json("/refresh", &json!({ "refresh_token": access }))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_refresh_rejects_garbage() {
    let app = TestApp::new();

    let (status, _) = app
        .post_json("/refresh", &json!({ "refresh_token": "a.b.c" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.post_json("/refresh", &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[allow(clippy::expect_used)]
async fn test_revoked_refresh_token_rejected() {
    let app = TestApp::new();
    let (_, refresh) = app.signed_in("alice", "pw").await;

    app.state
        .accounts
        .revoke_refresh_tokens(1)
        .expect("rotate salt");

    let (status, _) = app
        .post_json("/refresh", &json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A fresh login binds to the new salt.
    let (status, body) = app.login("alice", "pw").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .post_json("/refresh", &json!({ "refresh_token": body["refresh_token"] }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[allow(clippy::expect_used)]
async fn test_expired_refresh_token_rejected() {
    let app = TestApp::new();
    app.register("alice", "pw").await;

    let three_hours_ago = SystemTimeSource.now_secs() - 3 * 60 * 60;
    let stale_authority = TokenAuthority::with_time_source(
        &auth_config(),
        Arc::new(FixedTimeSource(three_hours_ago)),
    )
    .expect("authority");
    let stale = stale_authority
        .issue_refresh_token(&Account {
            id: 1,
            username: "alice".to_string(),
            password_hash: String::new(),
            token_hash: "salt".to_string(),
            created_at: three_hours_ago,
            updated_at: three_hours_ago,
        })
        .expect("issue");

    assert!(matches!(
        app.state.accounts.authority().validate_refresh_token(&stale),
        Err(AuthError::InvalidToken(_))
    ));
    let (status, _) = app
        .post_json("/refresh", &json!({ "refresh_token": stale }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
