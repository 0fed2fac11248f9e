//! Authentication module.
//!
//! Password verification, signed token issuance and validation, and the
//! scope/audience guard.
//!
//! # Pre-conditions
//! - The authority must be built from a valid `AuthConfig`.
//!
//! # Post-conditions
//! - Signing configuration is immutable once loaded.
//!
//! # Invariants
//! - Access and refresh tokens are signed with different secrets.

pub mod auth_config;
pub mod authority;
pub mod claims;
pub mod codec;
pub mod error;
pub mod guard;
pub mod password;

pub use auth_config::{AuthConfig, AuthConfigError};
pub use authority::{RefreshGrant, TokenAuthority, TokenPair, custom_key, verify_custom_key};
pub use claims::{AccessClaims, KeyType, RefreshClaims, TOKEN_ISSUER};
pub use codec::{CodecError, TokenCodec};
pub use error::AuthError;
pub use guard::{GuardError, ScopeClaims, ScopeGuard, verify_claims};
pub use password::{
    MAX_PASSWORD_BYTES, PASSWORD_HASH_COST, PasswordError, hash_password, verify_password,
};
