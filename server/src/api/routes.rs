//! Router construction.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};

use super::{AppState, handlers, require_account};
use crate::files::MAX_IMAGE_SIZE;

/// Room for multipart boundaries and headers around the largest image, so an
/// oversized image is rejected by the image service with a clear message.
const MAX_UPLOAD_BODY_BYTES: usize = MAX_IMAGE_SIZE + 64 * 1024;

/// Build the application router.
///
/// Public: `GET /ping`, `POST /register`, `POST /login`, `POST /refresh`.
/// Bearer token required: `POST /upload`, `GET /images`.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/upload", post(handlers::upload))
        .route("/images", get(handlers::list_images))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES))
        .route_layer(from_fn_with_state(state.clone(), require_account));

    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .merge(protected)
        .with_state(state)
}
