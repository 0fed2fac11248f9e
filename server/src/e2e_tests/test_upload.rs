//! Test image upload and listing.

use axum::http::StatusCode;

use crate::e2e_tests::helpers::*;
use crate::files::MAX_IMAGE_SIZE;

#[tokio::test]
#[allow(clippy::expect_used)]
async fn test_upload_stores_image() {
    let app = TestApp::new();
    let (access, _) = app.signed_in("alice", "pw").await;

    let (status, body) = app
        .upload(Some(format!("Bearer {access}").as_str()), "cat.png", "image/png", b"png-bytes")
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["name"], "cat.png");
    assert_eq!(body["content_type"], "image/png");
    assert_eq!(body["size"], 9);
    // The on-disk path stays private.
    assert!(body.get("stored_path").is_none());

    let stored: Vec<_> = std::fs::read_dir(app.upload_dir.path())
        .expect("read upload dir")
        .collect();
    assert_eq!(stored.len(), 1);
    let entry = stored[0].as_ref().expect("dir entry");
    assert!(entry.file_name().to_string_lossy().ends_with("-cat.png"));
    assert_eq!(std::fs::read(entry.path()).expect("read file"), b"png-bytes");

    let (status, images) = app.get("/images", Some(access.as_str())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(images.as_array().map(Vec::len), Some(1));
    assert_eq!(images[0]["name"], "cat.png");
}

#[tokio::test]
async fn test_images_are_listed_per_account() {
    let app = TestApp::new();
    let (alice, _) = app.signed_in("alice", "pw").await;
    let (bob, _) = app.signed_in("bob", "pw").await;

    let (status, _) = app
        .upload(Some(format!("Bearer {alice}").as_str()), "a.jpg", "image/jpeg", b"a")
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, images) = app.get("/images", Some(bob.as_str())).await;
    assert_eq!(images, serde_json::json!([]));
}

#[tokio::test]
async fn test_upload_rejects_non_image() {
    let app = TestApp::new();
    let (access, _) = app.signed_in("alice", "pw").await;

    let (status, body) = app
        .upload(Some(format!("Bearer {access}").as_str()), "notes.txt", "text/plain", b"hi")
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some_and(|e| e.contains("not an image")));
}

#[tokio::test]
async fn test_upload_rejects_oversized_file() {
    let app = TestApp::new();
    let (access, _) = app.signed_in("alice", "pw").await;
    let bytes = vec![0u8; MAX_IMAGE_SIZE + 1];

    let (status, _) = app
        .upload(Some(format!("Bearer {access}").as_str()), "big.png", "image/png", &bytes)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, images) = app.get("/images", Some(access.as_str())).await;
    assert_eq!(images, serde_json::json!([]));
}

#[tokio::test]
async fn test_upload_requires_token() {
    let app = TestApp::new();

    let (status, _) = app.upload(None, "cat.png", "image/png", b"x").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_rejects_basic_auth() {
    let app = TestApp::new();
    app.register("alice", "pw").await;

    let (status, _) = app
        .upload(Some("Basic YWxpY2U6cHc="), "cat.png", "image/png", b"x")
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
