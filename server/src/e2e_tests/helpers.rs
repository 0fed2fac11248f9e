//! Common helpers for end-to-end tests.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::api::{AppState, router};
use crate::auth::AuthConfig;
use crate::config::ServerConfig;

pub const ACCESS_SECRET: &[u8] = b"e2e-access-secret";
pub const REFRESH_SECRET: &[u8] = b"e2e-refresh-secret";

/// Largest response body the helpers will read.
const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

const MULTIPART_BOUNDARY: &str = "----e2e-boundary-7MA4YWxkTrZu0gW";

/// A router backed by fresh services and a temporary upload directory.
///
/// The directory is removed when the `TestApp` is dropped.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub upload_dir: TempDir,
}

impl TestApp {
    /// Create a new app with empty stores.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let upload_dir = tempfile::tempdir().expect("Failed to create upload directory");
        let config = ServerConfig {
            listen_port: 0,
            upload_directory: upload_dir.path().to_path_buf(),
            auth: auth_config(),
        };
        let state = AppState::from_config(&config).expect("Failed to build services");

        Self {
            router: router(state.clone()),
            state,
            upload_dir,
        }
    }

    /// Send a request and return the status and JSON body.
    ///
    /// Non-JSON bodies come back as `Value::Null`.
    #[allow(clippy::expect_used)]
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), MAX_RESPONSE_BYTES)
            .await
            .expect("Failed to read response body");
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[allow(clippy::expect_used)]
    pub async fn post_json(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request");
        self.send(request).await
    }

    #[allow(clippy::expect_used)]
    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).expect("valid request"))
            .await
    }

    pub async fn register(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.post_json(
            "/register",
            &json!({ "username": username, "password": password }),
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.post_json(
            "/login",
            &json!({ "username": username, "password": password }),
        )
        .await
    }

    /// Register and log in, returning the access and refresh tokens.
    #[allow(clippy::expect_used)]
    pub async fn signed_in(&self, username: &str, password: &str) -> (String, String) {
        let (status, _) = self.register(username, password).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self.login(username, password).await;
        assert_eq!(status, StatusCode::OK);
        (
            body["access_token"]
                .as_str()
                .expect("access token")
                .to_string(),
            body["refresh_token"]
                .as_str()
                .expect("refresh token")
                .to_string(),
        )
    }

    /// Upload a single file in the `file` multipart field.
    #[allow(clippy::expect_used)]
    pub async fn upload(
        &self,
        authorization: Option<&str>,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> (StatusCode, Value) {
        let mut body = Vec::with_capacity(bytes.len() + 256);
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
            );
        if let Some(authorization) = authorization {
            builder = builder.header(header::AUTHORIZATION, authorization);
        }
        self.send(builder.body(Body::from(body)).expect("valid request"))
            .await
    }
}

/// The signing configuration every `TestApp` uses.
#[must_use]
#[allow(clippy::expect_used)]
pub fn auth_config() -> AuthConfig {
    AuthConfig::with_lifetimes(ACCESS_SECRET.to_vec(), REFRESH_SECRET.to_vec(), 15, 60)
        .expect("valid auth config")
}
