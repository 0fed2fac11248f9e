//! Bearer-token authentication for protected routes.
//!
//! `require_account` validates the access token and stores the caller's
//! account in a typed `RequestContext` extension. Handlers read it back with
//! the `CurrentAccount` extractor.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use super::{ApiError, AppState};
use crate::account::AccountSnapshot;

const BEARER_SCHEME: &str = "Bearer";

/// Per-request data attached by the middleware.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// The authenticated account, if the request carried a valid token.
    pub account: Option<AccountSnapshot>,
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case(BEARER_SCHEME) && !token.is_empty()).then_some(token)
}

/// Reject requests without a valid access token.
pub async fn require_account(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(request.headers()) else {
        tracing::warn!("request to {} without bearer token", request.uri().path());
        return Err(ApiError::Unauthorized);
    };

    let snapshot = state.accounts.authority().validate_access_token(token)?;
    let account = AccountSnapshot::from_claim_string(&snapshot).map_err(|e| {
        tracing::error!("access token carries an unreadable account: {e}");
        ApiError::Unauthorized
    })?;

    request.extensions_mut().insert(RequestContext {
        account: Some(account),
    });
    Ok(next.run(request).await)
}

/// The authenticated account for the current request.
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub AccountSnapshot);

impl<S: Send + Sync> FromRequestParts<S> for CurrentAccount {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .and_then(|context| context.account.clone())
            .map(Self)
            .ok_or_else(|| {
                tracing::error!("protected handler reached without an authenticated account");
                ApiError::Unauthorized
            })
    }
}
