//! Test login and the tokens it returns.

use axum::http::StatusCode;
use serde_json::json;

use crate::account::AccountSnapshot;
use crate::auth::{AccessClaims, KeyType, RefreshClaims, TOKEN_ISSUER, TokenCodec};
use crate::e2e_tests::helpers::*;

#[tokio::test]
#[allow(clippy::expect_used)]
async fn test_login_returns_token_pair() {
    let app = TestApp::new();
    app.register("alice", "s3cret").await;

    let (status, body) = app.login("alice", "s3cret").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");

    let access = body["access_token"].as_str().expect("access token");
    let refresh = body["refresh_token"].as_str().expect("refresh token");
    assert_eq!(access.split('.').count(), 3);
    assert_eq!(refresh.split('.').count(), 3);

    let authority = app.state.accounts.authority();
    let snapshot = authority.validate_access_token(access).expect("valid access token");
    let snapshot = AccountSnapshot::from_claim_string(&snapshot).expect("snapshot");
    assert_eq!(snapshot.id, 1);
    assert_eq!(snapshot.username, "alice");

    assert!(authority.validate_refresh_token(refresh).is_ok());
}

#[tokio::test]
#[allow(clippy::expect_used)]
async fn test_login_token_payloads() {
    let app = TestApp::new();
    let (access, refresh) = app.signed_in("alice", "s3cret").await;

    let access_claims: AccessClaims = TokenCodec::new(ACCESS_SECRET)
        .expect("codec")
        .decode(&access)
        .expect("decode access");
    assert_eq!(access_claims.account_id, "1");
    assert_eq!(access_claims.key_type, KeyType::Access);
    assert_eq!(access_claims.iss, TOKEN_ISSUER);
    assert!(!access_claims.account.contains("$2"));

    let refresh_claims: RefreshClaims = TokenCodec::new(REFRESH_SECRET)
        .expect("codec")
        .decode(&refresh)
        .expect("decode refresh");
    assert_eq!(refresh_claims.account_id, "1");
    assert_eq!(refresh_claims.key_type, KeyType::Refresh);
    assert_eq!(refresh_claims.custom_key.len(), 64);
    assert!(refresh_claims.exp > access_claims.exp);
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_the_same() {
    let app = TestApp::new();
    app.register("alice", "s3cret").await;

    let (wrong_status, wrong_body) = app.login("alice", "guess").await;
    let (unknown_status, unknown_body) = app.login("mallory", "s3cret").await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["error"], "unauthorized");
}

#[tokio::test]
async fn test_login_is_case_sensitive() {
    let app = TestApp::new();
    app.register("alice", "s3cret").await;

    let (status, _) = app.login("alice", "S3CRET").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.login("Alice", "s3cret").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tokens_differ_between_accounts() {
    let app = TestApp::new();
    let (alice_access, alice_refresh) = app.signed_in("alice", "pw-a").await;
    let (bob_access, bob_refresh) = app.signed_in("bob", "pw-b").await;

    assert_ne!(alice_access, bob_access);
    assert_ne!(alice_refresh, bob_refresh);
}

#[tokio::test]
async fn test_login_rejects_malformed_body() {
    let app = TestApp::new();

    let (status, body) = app.post_json("/login", &json!({ "username": "alice" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "malformed request body");
}

#[tokio::test]
async fn test_login_with_exact_registered_pair() {
    let app = TestApp::new();
    let (status, body) = app.register(" alice ", "s3cret").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "alice");

    let (status, body) = app.login(" alice ", "s3cret").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
}
