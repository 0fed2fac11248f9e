//! Signed token encoding and decoding.
//!
//! Tokens are compact JWS strings (`header.payload.signature`) signed with a
//! symmetric HMAC key. One `TokenCodec` holds one key; access and refresh
//! tokens use separate codecs.
//!
//! # Pre-conditions
//! - The signing secret must be non-empty.
//!
//! # Post-conditions
//! - `encode` always produces an HS256 token.
//! - `decode` only returns claims whose signature verified and whose `exp`
//!   lies in the future.
//!
//! # Invariants
//! - Only the HMAC family (HS256, HS384, HS512) is accepted on decode.
//! - Decoding is stateless and does not modify any external state.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Algorithms a token header may name.
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Error returned when encoding or decoding a token fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The signing key could not be used.
    InvalidKey(String),
    /// The token signature does not match its contents.
    InvalidSignature,
    /// The token `exp` claim lies in the past.
    TokenExpired,
    /// The token header names an algorithm outside the HMAC family.
    UnexpectedAlgorithm,
    /// The token is malformed or its payload does not match the claim type.
    MalformedToken,
    /// A required registered claim is absent.
    MissingClaim(String),
    /// The claims could not be serialized or signed.
    Encoding(String),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey(reason) => write!(f, "invalid key: {reason}"),
            Self::InvalidSignature => write!(f, "invalid token signature"),
            Self::TokenExpired => write!(f, "token has expired"),
            Self::UnexpectedAlgorithm => write!(f, "unexpected signing method"),
            Self::MalformedToken => write!(f, "malformed token"),
            Self::MissingClaim(claim) => write!(f, "missing '{claim}' claim in token"),
            Self::Encoding(reason) => write!(f, "failed to encode token: {reason}"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Encodes and decodes claim sets under a single HMAC secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Create a codec for the given secret.
    ///
    /// # Errors
    /// Returns `CodecError::InvalidKey` if the secret is empty.
    pub fn new(secret: &[u8]) -> Result<Self, CodecError> {
        if secret.is_empty() {
            return Err(CodecError::InvalidKey("secret must be non-empty".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.leeway = 0;
        // Audience is checked by the scope guard, not here.
        validation.validate_aud = false;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// Sign a claim set as an HS256 token.
    ///
    /// # Errors
    /// Returns `CodecError::Encoding` if the claims cannot be serialized.
    pub fn encode<C: Serialize>(&self, claims: &C) -> Result<String, CodecError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| CodecError::Encoding(e.to_string()))
    }

    /// Verify a token and deserialize its claims.
    ///
    /// # Errors
    /// Returns `CodecError` based on the type of failure.
    pub fn decode<C: DeserializeOwned>(&self, token: &str) -> Result<C, CodecError> {
        decode::<C>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(map_jwt_error)
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

/// Maps jsonwebtoken errors to our `CodecError` type.
fn map_jwt_error(error: jsonwebtoken::errors::Error) -> CodecError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::InvalidSignature => CodecError::InvalidSignature,
        ErrorKind::ExpiredSignature => CodecError::TokenExpired,
        ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => {
            CodecError::UnexpectedAlgorithm
        }
        ErrorKind::MissingRequiredClaim(claim) => CodecError::MissingClaim(claim.clone()),
        _ => CodecError::MalformedToken,
    }
}
