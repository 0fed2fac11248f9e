//! Account registration, login and token refresh.
//!
//! Connects the account store to the token authority. All methods are
//! synchronous; bcrypt work makes `register` and `authenticate_and_issue`
//! CPU-bound, so async callers should run them on a blocking thread.

use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;

use super::model::{Account, AccountSnapshot, NewAccount};
use super::store::{AccountStore, StoreError};
use crate::auth::{
    AuthError, TokenAuthority, TokenPair, hash_password, verify_custom_key, verify_password,
};
use crate::time::{SystemTimeSource, TimeSource};

/// Length of the random per-account token salt.
pub const TOKEN_SALT_LENGTH: usize = 15;

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::NotFound,
            StoreError::Conflict(_) => Self::Conflict,
            StoreError::Unavailable(reason) => Self::Internal(reason),
        }
    }
}

/// Usernames are stored and looked up without surrounding whitespace.
#[must_use]
pub fn normalize_username(username: &str) -> &str {
    username.trim()
}

/// Generate a fresh random token salt.
#[must_use]
pub fn generate_token_salt() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_SALT_LENGTH)
        .map(char::from)
        .collect()
}

/// Account operations exposed to request handlers.
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    authority: Arc<TokenAuthority>,
    time_source: Arc<dyn TimeSource>,
}

impl AccountService {
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>, authority: Arc<TokenAuthority>) -> Self {
        Self::with_time_source(store, authority, Arc::new(SystemTimeSource))
    }

    #[must_use]
    pub fn with_time_source(
        store: Arc<dyn AccountStore>,
        authority: Arc<TokenAuthority>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            store,
            authority,
            time_source,
        }
    }

    /// The authority used to mint and validate tokens.
    #[must_use]
    pub fn authority(&self) -> &TokenAuthority {
        &self.authority
    }

    /// Create an account with a hashed password and a fresh token salt.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidInput` for an empty username, an empty
    /// password or one longer than `MAX_PASSWORD_BYTES`, and
    /// `AuthError::Conflict` if the username is taken.
    pub fn register(&self, username: &str, password: &str) -> Result<Account, AuthError> {
        let username = normalize_username(username);
        if username.is_empty() {
            return Err(AuthError::InvalidInput("username must not be empty".to_string()));
        }
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password must not be empty".to_string()));
        }

        let password_hash = hash_password(password).map_err(|e| {
            tracing::warn!("cannot hash password for '{username}': {e}");
            AuthError::from(e)
        })?;

        let account = self
            .store
            .create_account(NewAccount {
                username: username.to_string(),
                password_hash,
                token_hash: generate_token_salt(),
                created_at: self.time_source.now_secs(),
            })
            .map_err(|e| {
                tracing::warn!("failed to create account '{username}': {e}");
                AuthError::from(e)
            })?;

        tracing::info!("registered account {} ('{}')", account.id, account.username);
        Ok(account)
    }

    /// Check credentials and mint an access/refresh token pair.
    ///
    /// # Errors
    /// Returns `AuthError::NotFound` if the username is unknown and
    /// `AuthError::Unauthorized` if the password does not match. Callers
    /// must report both the same way.
    pub fn authenticate_and_issue(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenPair, AuthError> {
        let username = normalize_username(username);
        let account = self.store.find_account_by_username(username).map_err(|e| {
            tracing::warn!("login for '{username}' failed: {e}");
            AuthError::from(e)
        })?;

        if !verify_password(password, &account.password_hash)? {
            tracing::warn!("login for '{username}' failed: wrong password");
            return Err(AuthError::Unauthorized);
        }

        let pair = self.authority.issue_token_pair(&account)?;
        tracing::info!("issued tokens for account {}", account.id);
        Ok(pair)
    }

    /// Mint a new access token from a refresh token.
    ///
    /// The token's custom key must still match the account's current salt.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidToken` if the refresh token is invalid, its
    /// account no longer exists, or its salt has been rotated.
    pub fn refresh_access_token(&self, refresh_token: &str) -> Result<String, AuthError> {
        let grant = self.authority.validate_refresh_token(refresh_token)?;
        let snapshot = AccountSnapshot::from_claim_string(&grant.account).map_err(|e| {
            tracing::warn!("refresh token carries an unreadable account: {e}");
            AuthError::InvalidClaims(e.to_string())
        })?;

        let account = match self.store.find_account_by_id(snapshot.id) {
            Ok(account) => account,
            Err(StoreError::NotFound) => {
                tracing::warn!("refresh token for unknown account {}", snapshot.id);
                return Err(AuthError::InvalidToken("unknown account".to_string()));
            }
            Err(e) => {
                tracing::error!("failed to load account {}: {e}", snapshot.id);
                return Err(e.into());
            }
        };

        if !verify_custom_key(account.id, &account.token_hash, &grant.custom_key) {
            tracing::warn!("refresh token for account {} has a stale key", account.id);
            return Err(AuthError::InvalidToken("refresh key revoked".to_string()));
        }

        self.authority.issue_access_token(&account)
    }

    /// Rotate the account's token salt, revoking all its refresh tokens.
    ///
    /// # Errors
    /// Returns `AuthError::NotFound` if the account does not exist.
    pub fn revoke_refresh_tokens(&self, account_id: i64) -> Result<(), AuthError> {
        self.store
            .update_token_hash(account_id, generate_token_salt())
            .map_err(|e| {
                tracing::warn!("failed to rotate token salt for account {account_id}: {e}");
                AuthError::from(e)
            })?;
        tracing::info!("rotated token salt for account {account_id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::InMemoryAccountStore;
    use crate::auth::{AuthConfig, MAX_PASSWORD_BYTES, custom_key};

    fn service() -> AccountService {
        let config = AuthConfig::new(b"access-secret".to_vec(), b"refresh-secret".to_vec())
            .expect("valid config");
        let authority = Arc::new(TokenAuthority::new(&config).expect("authority"));
        AccountService::new(Arc::new(InMemoryAccountStore::new()), authority)
    }

    #[test]
    fn test_generate_token_salt() {
        let salt = generate_token_salt();
        assert_eq!(salt.len(), TOKEN_SALT_LENGTH);
        assert!(salt.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(salt, generate_token_salt());
    }

    #[test]
    fn test_register_hashes_password() {
        let service = service();
        let account = service.register("alice", "correct horse").expect("register");

        assert_eq!(account.id, 1);
        assert_eq!(account.username, "alice");
        assert_ne!(account.password_hash, "correct horse");
        assert!(verify_password("correct horse", &account.password_hash).expect("verify"));
        assert_eq!(account.token_hash.len(), TOKEN_SALT_LENGTH);
    }

    #[test]
    fn test_register_rejects_empty_fields() {
        let service = service();

        assert!(matches!(
            service.register("", "pw"),
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            service.register("   ", "pw"),
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            service.register("alice", ""),
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_register_duplicate_username() {
        let service = service();
        service.register("alice", "pw").expect("register");

        assert_eq!(service.register("alice", "other"), Err(AuthError::Conflict));
    }

    #[test]
    fn test_login_issues_valid_tokens() {
        let service = service();
        let account = service.register("alice", "pw").expect("register");

        let pair = service.authenticate_and_issue("alice", "pw").expect("login");

        let snapshot = service
            .authority()
            .validate_access_token(&pair.access_token)
            .expect("access token");
        let snapshot = AccountSnapshot::from_claim_string(&snapshot).expect("snapshot");
        assert_eq!(snapshot.id, account.id);
        assert_eq!(snapshot.username, "alice");

        let grant = service
            .authority()
            .validate_refresh_token(&pair.refresh_token)
            .expect("refresh token");
        assert_eq!(
            grant.custom_key,
            custom_key(account.id, &account.token_hash).expect("custom key")
        );
    }

    #[test]
    fn test_login_with_registered_pair_ignores_surrounding_whitespace() {
        let service = service();
        let account = service.register(" alice ", "pw").expect("register");
        assert_eq!(account.username, "alice");

        assert!(service.authenticate_and_issue(" alice ", "pw").is_ok());
        assert!(service.authenticate_and_issue("alice", "pw").is_ok());
    }

    #[test]
    fn test_register_rejects_overlong_password() {
        let service = service();
        let long = "a".repeat(MAX_PASSWORD_BYTES + 1);

        assert!(matches!(
            service.register("bob", &long),
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_login_rejects_password_differing_past_limit() {
        let service = service();
        let base = "a".repeat(MAX_PASSWORD_BYTES);
        service.register("bob", &base).expect("register");

        assert_eq!(
            service.authenticate_and_issue("bob", &format!("{base}Y")),
            Err(AuthError::Unauthorized)
        );
        assert!(service.authenticate_and_issue("bob", &base).is_ok());
    }

    #[test]
    fn test_login_wrong_password() {
        let service = service();
        service.register("alice", "pw").expect("register");

        for wrong in ["PW", "pw ", "", "password"] {
            assert_eq!(
                service.authenticate_and_issue("alice", wrong),
                Err(AuthError::Unauthorized)
            );
        }
    }

    #[test]
    fn test_login_unknown_user() {
        let service = service();
        assert_eq!(
            service.authenticate_and_issue("nobody", "pw"),
            Err(AuthError::NotFound)
        );
    }

    #[test]
    fn test_refresh_issues_access_token() {
        let service = service();
        service.register("alice", "pw").expect("register");
        let pair = service.authenticate_and_issue("alice", "pw").expect("login");

        let access = service
            .refresh_access_token(&pair.refresh_token)
            .expect("refresh");
        assert!(service.authority().validate_access_token(&access).is_ok());
    }

    #[test]
    fn test_refresh_rejects_access_token() {
        let service = service();
        service.register("alice", "pw").expect("register");
        let pair = service.authenticate_and_issue("alice", "pw").expect("login");

        assert!(matches!(
            service.refresh_access_token(&pair.access_token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_revoke_invalidates_refresh_tokens() {
        let service = service();
        let account = service.register("alice", "pw").expect("register");
        let old = service.authenticate_and_issue("alice", "pw").expect("login");

        service.revoke_refresh_tokens(account.id).expect("revoke");

        assert_eq!(
            service.refresh_access_token(&old.refresh_token),
            Err(AuthError::InvalidToken("refresh key revoked".to_string()))
        );

        // Tokens issued after the rotation work again.
        let new = service.authenticate_and_issue("alice", "pw").expect("login");
        assert!(service.refresh_access_token(&new.refresh_token).is_ok());
    }

    #[test]
    fn test_revoke_unknown_account() {
        assert_eq!(service().revoke_refresh_tokens(7), Err(AuthError::NotFound));
    }

    #[test]
    fn test_refresh_for_missing_account() {
        let config = AuthConfig::new(b"access-secret".to_vec(), b"refresh-secret".to_vec())
            .expect("valid config");
        let authority = Arc::new(TokenAuthority::new(&config).expect("authority"));

        // Token minted by the same authority but for an account the store never saw.
        let ghost = Account {
            id: 99,
            username: "ghost".to_string(),
            password_hash: String::new(),
            token_hash: "salt".to_string(),
            created_at: 0,
            updated_at: 0,
        };
        let token = authority.issue_refresh_token(&ghost).expect("issue");

        let service = AccountService::new(Arc::new(InMemoryAccountStore::new()), authority);
        assert_eq!(
            service.refresh_access_token(&token),
            Err(AuthError::InvalidToken("unknown account".to_string()))
        );
    }
}
