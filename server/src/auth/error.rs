//! Authentication errors.
//!
//! Every variant is logged where it is detected. Callers facing end users
//! collapse them into an opaque response and never reveal which check failed.

use super::codec::CodecError;
use super::guard::GuardError;
use super::password::PasswordError;

/// Error returned by the token authority and account service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No account exists for the given username.
    NotFound,
    /// The password did not match the stored hash.
    Unauthorized,
    /// The token failed signature, algorithm, expiration or claim checks.
    InvalidToken(String),
    /// Claims were structurally valid but their contents were not usable.
    InvalidClaims(String),
    /// The claims do not grant a required scope.
    InsufficientScope,
    /// The claims were issued for another audience.
    InvalidAudience,
    /// An account with this username already exists.
    Conflict,
    /// The request carried unusable input (for example an empty username).
    InvalidInput(String),
    /// A collaborator failed in a way the caller cannot fix.
    Internal(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "account not found"),
            Self::Unauthorized => write!(f, "wrong password"),
            Self::InvalidToken(reason) => write!(f, "invalid token: {reason}"),
            Self::InvalidClaims(reason) => write!(f, "invalid claims: {reason}"),
            Self::InsufficientScope => write!(f, "insufficient scope"),
            Self::InvalidAudience => write!(f, "invalid audience"),
            Self::Conflict => write!(f, "account already exists"),
            Self::InvalidInput(reason) => write!(f, "invalid input: {reason}"),
            Self::Internal(reason) => write!(f, "internal error: {reason}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<CodecError> for AuthError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::InvalidKey(reason) | CodecError::Encoding(reason) => Self::Internal(reason),
            other => Self::InvalidToken(other.to_string()),
        }
    }
}

impl From<GuardError> for AuthError {
    fn from(e: GuardError) -> Self {
        match e {
            GuardError::InvalidClaims(reason) => Self::InvalidClaims(reason),
            GuardError::InsufficientScope(_) => Self::InsufficientScope,
            GuardError::InvalidAudience => Self::InvalidAudience,
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::TooLong(_) => Self::InvalidInput(e.to_string()),
            PasswordError::MalformedHash(_) | PasswordError::HashFailed(_) => {
                Self::Internal(e.to_string())
            }
        }
    }
}
