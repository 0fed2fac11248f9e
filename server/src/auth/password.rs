//! Password hashing and verification.
//!
//! # Invariants
//! - Stored hashes are bcrypt strings produced at `PASSWORD_HASH_COST`.
//! - A mismatch is a normal outcome, never an error.
//! - Passwords longer than `MAX_PASSWORD_BYTES` are never hashed, and never
//!   match, so no two distinct passwords share a hash through truncation.

use bcrypt::BcryptError;

/// bcrypt work factor for newly hashed passwords.
pub const PASSWORD_HASH_COST: u32 = 8;

/// Longest password bcrypt hashes without truncation.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Error returned when hashing or verification cannot be carried out.
#[derive(Debug)]
pub enum PasswordError {
    /// The stored hash is not a valid bcrypt string.
    MalformedHash(String),
    /// The password exceeds `MAX_PASSWORD_BYTES`.
    TooLong(usize),
    /// Hashing a new password failed.
    HashFailed(String),
}

impl std::fmt::Display for PasswordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedHash(reason) => write!(f, "malformed password hash: {reason}"),
            Self::TooLong(len) => write!(
                f,
                "password is {len} bytes, longer than {MAX_PASSWORD_BYTES}"
            ),
            Self::HashFailed(reason) => write!(f, "failed to hash password: {reason}"),
        }
    }
}

impl std::error::Error for PasswordError {}

/// Hash a plaintext password for storage.
///
/// # Errors
/// Returns `PasswordError::TooLong` if the password exceeds
/// `MAX_PASSWORD_BYTES`, `PasswordError::HashFailed` if bcrypt fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    bcrypt::non_truncating_hash(password, PASSWORD_HASH_COST).map_err(|e| match e {
        BcryptError::Truncation(len) => PasswordError::TooLong(len),
        other => PasswordError::HashFailed(other.to_string()),
    })
}

/// Check a plaintext password against a stored bcrypt hash.
///
/// Returns `Ok(false)` on mismatch, including for passwords longer than
/// `MAX_PASSWORD_BYTES`.
///
/// # Errors
/// Returns `PasswordError::MalformedHash` if the stored hash cannot be parsed.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    match bcrypt::non_truncating_verify(password, stored_hash) {
        Ok(matches) => Ok(matches),
        Err(BcryptError::Truncation(len)) => {
            tracing::warn!("rejected {len}-byte password");
            Ok(false)
        }
        Err(e) => {
            tracing::error!("stored password hash is malformed: {e}");
            Err(PasswordError::MalformedHash(e.to_string()))
        }
    }
}
