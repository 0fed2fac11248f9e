//! Mapping from service errors to HTTP responses.
//!
//! Authentication failures of every kind collapse into one opaque 401 so a
//! client cannot tell an unknown username from a wrong password, or an
//! expired token from a forged one. The detailed cause is logged where it
//! is detected.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::auth::AuthError;
use crate::files::ImageError;

/// Error returned by request handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request body or parameters were unusable.
    BadRequest(String),
    /// Authentication or authorization failed.
    Unauthorized,
    /// The resource already exists.
    Conflict,
    /// The server failed to handle a valid request.
    Internal,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(reason) => write!(f, "{reason}"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Conflict => write!(f, "already exists"),
            Self::Internal => write!(f, "internal server error"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::NotFound
            | AuthError::Unauthorized
            | AuthError::InvalidToken(_)
            | AuthError::InvalidClaims(_)
            | AuthError::InsufficientScope
            | AuthError::InvalidAudience => Self::Unauthorized,
            AuthError::Conflict => Self::Conflict,
            AuthError::InvalidInput(reason) => Self::BadRequest(reason),
            AuthError::Internal(_) => Self::Internal,
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::TooLarge(_) | ImageError::NotAnImage(_) | ImageError::MissingFileName => {
                Self::BadRequest(e.to_string())
            }
            ImageError::Storage(reason) => {
                tracing::error!("image storage failed: {reason}");
                Self::Internal
            }
        }
    }
}
