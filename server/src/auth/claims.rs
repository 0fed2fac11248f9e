//! Claim sets carried by access and refresh tokens.

use serde::{Deserialize, Serialize};

/// Issuer written into every token this service mints.
pub const TOKEN_ISSUER: &str = "auth.service";

/// Discriminates access tokens from refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Access,
    Refresh,
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// Payload of an access token.
///
/// # Invariants
/// - `key_type` is `KeyType::Access` for every token accepted as an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Account identifier as a decimal string.
    pub account_id: String,
    pub username: String,
    pub key_type: KeyType,
    /// Serialized `AccountSnapshot`.
    pub account: String,
    pub iss: String,
    /// Expiration time (Unix seconds).
    pub exp: u64,
}

/// Payload of a refresh token.
///
/// # Invariants
/// - `key_type` is `KeyType::Refresh` for every token accepted as a refresh token.
/// - `custom_key` is bound to the account's token salt at issue time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Account identifier as a decimal string.
    pub account_id: String,
    pub custom_key: String,
    pub key_type: KeyType,
    /// Serialized `AccountSnapshot`.
    pub account: String,
    pub iss: String,
    /// Expiration time (Unix seconds).
    pub exp: u64,
}
