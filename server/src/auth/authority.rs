//! Token issuance and validation.
//!
//! The authority owns two codecs with independent secrets, one for access
//! tokens and one for refresh tokens, so neither kind can be forged from the
//! other.
//!
//! # Post-conditions
//! - Issued access tokens expire `access_token_minutes` after issue.
//! - Issued refresh tokens expire `refresh_token_minutes` after issue and
//!   carry a custom key bound to the account's token salt.
//!
//! # Invariants
//! - Issue time comes from the configured `TimeSource`; expiry on validation
//!   is always checked against the system clock.
//! - Validation never returns claims whose key type does not match the
//!   validator, or whose account id is empty.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use super::claims::{AccessClaims, KeyType, RefreshClaims, TOKEN_ISSUER};
use super::codec::TokenCodec;
use super::{AuthConfig, AuthError};
use crate::account::Account;
use crate::time::{SystemTimeSource, TimeSource};

type HmacSha256 = Hmac<Sha256>;

/// An access/refresh token pair returned on login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// What a valid refresh token carries back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshGrant {
    /// Serialized `AccountSnapshot` from the token.
    pub account: String,
    /// Custom key the token was issued with.
    pub custom_key: String,
}

/// Mints and validates access and refresh tokens.
pub struct TokenAuthority {
    access_codec: TokenCodec,
    refresh_codec: TokenCodec,
    access_lifetime_secs: u64,
    refresh_lifetime_secs: u64,
    time_source: Arc<dyn TimeSource>,
}

impl TokenAuthority {
    /// Create an authority that reads the system clock.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if a signing key cannot be built.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        Self::with_time_source(config, Arc::new(SystemTimeSource))
    }

    /// Create an authority with an explicit issue clock.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if a signing key cannot be built.
    pub fn with_time_source(
        config: &AuthConfig,
        time_source: Arc<dyn TimeSource>,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            access_codec: TokenCodec::new(config.access_secret())?,
            refresh_codec: TokenCodec::new(config.refresh_secret())?,
            access_lifetime_secs: config.access_token_minutes.saturating_mul(60),
            refresh_lifetime_secs: config.refresh_token_minutes.saturating_mul(60),
            time_source,
        })
    }

    /// Mint an access token for the account.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if the claims cannot be signed.
    pub fn issue_access_token(&self, account: &Account) -> Result<String, AuthError> {
        let claims = AccessClaims {
            account_id: account.id.to_string(),
            username: account.username.clone(),
            key_type: KeyType::Access,
            account: snapshot_string(account)?,
            iss: TOKEN_ISSUER.to_string(),
            exp: self
                .time_source
                .now_secs()
                .saturating_add(self.access_lifetime_secs),
        };

        self.access_codec.encode(&claims).map_err(|e| {
            tracing::error!("failed to sign access token for account {}: {e}", account.id);
            AuthError::from(e)
        })
    }

    /// Mint a refresh token for the account.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if the claims cannot be signed.
    pub fn issue_refresh_token(&self, account: &Account) -> Result<String, AuthError> {
        let claims = RefreshClaims {
            account_id: account.id.to_string(),
            custom_key: custom_key(account.id, &account.token_hash)?,
            key_type: KeyType::Refresh,
            account: snapshot_string(account)?,
            iss: TOKEN_ISSUER.to_string(),
            exp: self
                .time_source
                .now_secs()
                .saturating_add(self.refresh_lifetime_secs),
        };

        self.refresh_codec.encode(&claims).map_err(|e| {
            tracing::error!("failed to sign refresh token for account {}: {e}", account.id);
            AuthError::from(e)
        })
    }

    /// Mint both tokens for the account.
    ///
    /// # Errors
    /// Same as `issue_access_token`.
    pub fn issue_token_pair(&self, account: &Account) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(account)?,
            refresh_token: self.issue_refresh_token(account)?,
        })
    }

    /// Validate an access token and return the embedded account snapshot.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidToken` if the signature, algorithm or
    /// expiration check fails, the key type is not `access`, or the account
    /// id is empty.
    pub fn validate_access_token(&self, token: &str) -> Result<String, AuthError> {
        let claims: AccessClaims = self.access_codec.decode(token).map_err(|e| {
            tracing::warn!("access token rejected: {e}");
            AuthError::from(e)
        })?;

        check_claims(claims.key_type, KeyType::Access, &claims.account_id)?;
        Ok(claims.account)
    }

    /// Validate a refresh token and return its snapshot and custom key.
    ///
    /// The custom key is not compared against the account here; callers do
    /// that with `verify_custom_key` once they have loaded the account.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidToken` on the same conditions as
    /// `validate_access_token`, checked against the refresh key.
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshGrant, AuthError> {
        let claims: RefreshClaims = self.refresh_codec.decode(token).map_err(|e| {
            tracing::warn!("refresh token rejected: {e}");
            AuthError::from(e)
        })?;

        check_claims(claims.key_type, KeyType::Refresh, &claims.account_id)?;
        Ok(RefreshGrant {
            account: claims.account,
            custom_key: claims.custom_key,
        })
    }
}

fn check_claims(actual: KeyType, expected: KeyType, account_id: &str) -> Result<(), AuthError> {
    if actual != expected {
        tracing::warn!("token key type is '{actual}', expected '{expected}'");
        return Err(AuthError::InvalidToken(format!(
            "expected {expected} token, got {actual}"
        )));
    }
    if account_id.is_empty() {
        tracing::warn!("token carries an empty account id");
        return Err(AuthError::InvalidToken("missing account id".to_string()));
    }
    Ok(())
}

fn snapshot_string(account: &Account) -> Result<String, AuthError> {
    account.snapshot().to_claim_string().map_err(|e| {
        tracing::error!("cannot serialize account {}: {e}", account.id);
        AuthError::Internal(e.to_string())
    })
}

fn keyed_mac(account_id: i64, token_hash: &str) -> Result<HmacSha256, AuthError> {
    let mut mac = HmacSha256::new_from_slice(token_hash.as_bytes())
        .map_err(|e| AuthError::Internal(e.to_string()))?;
    mac.update(account_id.to_string().as_bytes());
    Ok(mac)
}

/// Derive the refresh-token custom key for an account.
///
/// `hex(HMAC-SHA256(key = token_hash, message = decimal account id))`.
/// Rotating the token salt changes the key, which invalidates every refresh
/// token issued before the rotation.
///
/// # Errors
/// Returns `AuthError::Internal` if the MAC cannot be keyed.
pub fn custom_key(account_id: i64, token_hash: &str) -> Result<String, AuthError> {
    Ok(hex::encode(
        keyed_mac(account_id, token_hash)?.finalize().into_bytes(),
    ))
}

/// Check, in constant time, that `candidate` is the custom key for the
/// account's current token salt.
#[must_use]
pub fn verify_custom_key(account_id: i64, token_hash: &str, candidate: &str) -> bool {
    let Ok(candidate) = hex::decode(candidate) else {
        return false;
    };
    keyed_mac(account_id, token_hash).is_ok_and(|mac| mac.verify_slice(&candidate).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountSnapshot;
    use crate::auth::codec::CodecError;
    use crate::time::FixedTimeSource;

    const ACCESS_SECRET: &[u8] = b"access-secret-for-tests";
    const REFRESH_SECRET: &[u8] = b"refresh-secret-for-tests";

    fn config() -> AuthConfig {
        AuthConfig::with_lifetimes(ACCESS_SECRET.to_vec(), REFRESH_SECRET.to_vec(), 15, 60)
            .expect("valid config")
    }

    fn authority() -> TokenAuthority {
        TokenAuthority::new(&config()).expect("authority")
    }

    fn account() -> Account {
        Account {
            id: 42,
            username: "alice".to_string(),
            password_hash: "$2b$08$not-a-real-hash".to_string(),
            token_hash: "abcdefghijklmno".to_string(),
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
        }
    }

    fn now() -> u64 {
        SystemTimeSource.now_secs()
    }

    #[test]
    fn test_access_token_round_trip() {
        let authority = authority();
        let token = authority.issue_access_token(&account()).expect("issue");

        let snapshot = authority.validate_access_token(&token).expect("validate");
        let decoded = AccountSnapshot::from_claim_string(&snapshot).expect("snapshot");

        assert_eq!(decoded.id, 42);
        assert_eq!(decoded.username, "alice");
    }

    #[test]
    fn test_access_claims_contents() {
        let authority = authority();
        let token = authority.issue_access_token(&account()).expect("issue");

        let codec = TokenCodec::new(ACCESS_SECRET).expect("codec");
        let claims: AccessClaims = codec.decode(&token).expect("decode");

        assert_eq!(claims.account_id, "42");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.key_type, KeyType::Access);
        assert_eq!(claims.iss, TOKEN_ISSUER);
        let expected_exp = now() + 15 * 60;
        assert!(claims.exp.abs_diff(expected_exp) <= 5);
        assert!(!claims.account.contains("not-a-real-hash"));
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let authority = authority();
        let token = authority.issue_refresh_token(&account()).expect("issue");

        let grant = authority.validate_refresh_token(&token).expect("validate");
        let decoded = AccountSnapshot::from_claim_string(&grant.account).expect("snapshot");

        assert_eq!(decoded.id, 42);
        assert_eq!(
            grant.custom_key,
            custom_key(42, "abcdefghijklmno").expect("custom key")
        );
    }

    #[test]
    fn test_refresh_claims_carry_expiration() {
        let authority = authority();
        let token = authority.issue_refresh_token(&account()).expect("issue");

        let codec = TokenCodec::new(REFRESH_SECRET).expect("codec");
        let claims: RefreshClaims = codec.decode(&token).expect("decode");

        assert_eq!(claims.key_type, KeyType::Refresh);
        assert_eq!(claims.iss, TOKEN_ISSUER);
        let expected_exp = now() + 60 * 60;
        assert!(claims.exp.abs_diff(expected_exp) <= 5);
    }

    #[test]
    fn test_token_pair_validates_both_ways() {
        let authority = authority();
        let pair = authority.issue_token_pair(&account()).expect("issue");

        assert!(authority.validate_access_token(&pair.access_token).is_ok());
        assert!(authority.validate_refresh_token(&pair.refresh_token).is_ok());
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let authority = authority();
        let pair = authority.issue_token_pair(&account()).expect("issue");

        assert!(matches!(
            authority.validate_access_token(&pair.refresh_token),
            Err(AuthError::InvalidToken(_))
        ));
        assert!(matches!(
            authority.validate_refresh_token(&pair.access_token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_refresh_shaped_claims_under_access_key_rejected() {
        // Correct key, wrong key type.
        let codec = TokenCodec::new(ACCESS_SECRET).expect("codec");
        let claims = AccessClaims {
            account_id: "42".to_string(),
            username: "alice".to_string(),
            key_type: KeyType::Refresh,
            account: account().snapshot().to_claim_string().expect("snapshot"),
            iss: TOKEN_ISSUER.to_string(),
            exp: now() + 600,
        };
        let token = codec.encode(&claims).expect("encode");

        let result = authority().validate_access_token(&token);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_empty_account_id_rejected() {
        let codec = TokenCodec::new(ACCESS_SECRET).expect("codec");
        let claims = AccessClaims {
            account_id: String::new(),
            username: "alice".to_string(),
            key_type: KeyType::Access,
            account: "{}".to_string(),
            iss: TOKEN_ISSUER.to_string(),
            exp: now() + 600,
        };
        let token = codec.encode(&claims).expect("encode");

        let result = authority().validate_access_token(&token);
        assert_eq!(
            result,
            Err(AuthError::InvalidToken("missing account id".to_string()))
        );
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let foreign = AuthConfig::new(b"other-access".to_vec(), b"other-refresh".to_vec())
            .expect("valid config");
        let foreign = TokenAuthority::new(&foreign).expect("authority");
        let pair = foreign.issue_token_pair(&account()).expect("issue");

        let authority = authority();
        assert_eq!(
            authority.validate_access_token(&pair.access_token),
            Err(AuthError::from(CodecError::InvalidSignature))
        );
        assert_eq!(
            authority.validate_refresh_token(&pair.refresh_token),
            Err(AuthError::from(CodecError::InvalidSignature))
        );
    }

    #[test]
    fn test_expired_access_token_rejected() {
        // Issued two hours ago with a 15 minute lifetime.
        let issued_at = now() - 2 * 60 * 60;
        let authority =
            TokenAuthority::with_time_source(&config(), Arc::new(FixedTimeSource(issued_at)))
                .expect("authority");
        let token = authority.issue_access_token(&account()).expect("issue");

        assert_eq!(
            authority.validate_access_token(&token),
            Err(AuthError::from(CodecError::TokenExpired))
        );
    }

    #[test]
    fn test_expired_refresh_token_rejected() {
        let issued_at = now() - 3 * 60 * 60;
        let authority =
            TokenAuthority::with_time_source(&config(), Arc::new(FixedTimeSource(issued_at)))
                .expect("authority");
        let token = authority.issue_refresh_token(&account()).expect("issue");

        assert!(matches!(
            authority.validate_refresh_token(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let authority = authority();
        let token = authority.issue_access_token(&account()).expect("issue");
        let mut parts: Vec<&str> = token.split('.').collect();
        let other = authority
            .issue_access_token(&Account {
                id: 43,
                username: "mallory".to_string(),
                ..account()
            })
            .expect("issue");
        let other_payload = other.split('.').nth(1).expect("payload");
        parts[1] = other_payload;

        let result = authority.validate_access_token(&parts.join("."));
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_custom_key_known_vector() {
        // printf '1' | openssl dgst -sha256 -hmac 'salt'
        assert_eq!(
            custom_key(1, "salt").expect("custom key"),
            "7e1b4d6f2e446ca93d9b14a3479d463ccecb0a95b3ceb1939b30f941f51dd33d"
        );
        assert_eq!(
            custom_key(42, "abcdefghijklmno").expect("custom key"),
            "9b915147f4fef7c5d33c8292c99021e9282eef9c8176a3ffe878cc4acca77c21"
        );
    }

    #[test]
    fn test_custom_key_changes_with_salt() {
        let before = custom_key(42, "first-salt-value").expect("custom key");
        let after = custom_key(42, "other-salt-value").expect("custom key");
        assert_ne!(before, after);
    }

    #[test]
    fn test_custom_key_changes_with_account() {
        let first = custom_key(1, "same-salt").expect("custom key");
        let second = custom_key(2, "same-salt").expect("custom key");
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_custom_key() {
        let key = custom_key(42, "salt").expect("custom key");

        assert!(verify_custom_key(42, "salt", &key));
        assert!(!verify_custom_key(42, "rotated-salt", &key));
        assert!(!verify_custom_key(43, "salt", &key));
        assert!(!verify_custom_key(42, "salt", "not-hex"));
        assert!(!verify_custom_key(42, "salt", ""));
    }
}
