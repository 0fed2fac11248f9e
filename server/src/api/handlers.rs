//! Request handlers.

use axum::Json;
use axum::extract::multipart::Multipart;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ApiError, AppState, CurrentAccount};
use crate::account::normalize_username;
use crate::auth::AuthError;
use crate::files::ImageMetadata;

/// Multipart field carrying the uploaded image.
const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|e| {
        tracing::warn!("rejected request body: {e}");
        ApiError::BadRequest("malformed request body".to_string())
    })
}

/// Run CPU-bound account work (bcrypt) off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| {
            tracing::error!("account task failed: {e}");
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}

pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let request = parse_body(payload)?;
    let accounts = state.accounts.clone();
    let account =
        run_blocking(move || accounts.register(&request.username, &request.password)).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: account.id,
            username: account.username,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let CredentialsRequest { username, password } = parse_body(payload)?;
    let accounts = state.accounts.clone();
    let login_name = username.clone();
    let pair =
        run_blocking(move || accounts.authenticate_and_issue(&login_name, &password)).await?;

    Ok(Json(LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        username: normalize_username(&username).to_string(),
    }))
}

pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let request = parse_body(payload)?;
    let access_token = state.accounts.refresh_access_token(&request.refresh_token)?;

    Ok(Json(RefreshResponse { access_token }))
}

pub async fn upload(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImageMetadata>), ApiError> {
    let bad_multipart = |e: axum::extract::multipart::MultipartError| {
        tracing::warn!("rejected upload from '{}': {e}", account.username);
        ApiError::BadRequest(format!("get form err: {}", e.body_text()))
    };

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(bad_multipart)?;

        let metadata = state
            .images
            .save(&account.username, &file_name, &content_type, &bytes)
            .await
            .map_err(|e| {
                tracing::warn!("rejected upload from '{}': {e}", account.username);
                ApiError::from(e)
            })?;
        return Ok((StatusCode::CREATED, Json(metadata)));
    }

    Err(ApiError::BadRequest(format!(
        "missing multipart field '{UPLOAD_FIELD}'"
    )))
}

pub async fn list_images(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
) -> Json<Vec<ImageMetadata>> {
    Json(state.images.list_for(&account.username))
}
