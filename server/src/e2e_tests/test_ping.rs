//! Test the unauthenticated health endpoint.

use axum::http::StatusCode;

use crate::e2e_tests::helpers::*;

#[tokio::test]
async fn test_ping() {
    let app = TestApp::new();

    let (status, body) = app.get("/ping", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "pong");
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new();

    let (status, _) = app.get("/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
