//! Account persistence.
//!
//! The token layer only ever sees accounts through `AccountStore`. The
//! bundled `InMemoryAccountStore` keeps everything in a lock-protected map.
//!
//! # Invariants
//! - Usernames are unique.
//! - Ids are assigned by the store, start at 1 and are never reused.
//! - Accounts are never removed.

use std::collections::HashMap;
use std::sync::RwLock;

use super::model::{Account, NewAccount};
use crate::time::{SystemTimeSource, TimeSource};

/// Errors that can occur when reading or writing accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No account matches the lookup.
    NotFound,
    /// The username is already taken.
    Conflict(String),
    /// The store could not complete the operation.
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "account not found"),
            Self::Conflict(username) => write!(f, "username already taken: {username}"),
            Self::Unavailable(reason) => write!(f, "account store unavailable: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Storage collaborator for accounts.
pub trait AccountStore: Send + Sync {
    /// Insert a new account and return it with its assigned id.
    ///
    /// # Errors
    /// Returns `StoreError::Conflict` if the username is taken.
    fn create_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// # Errors
    /// Returns `StoreError::NotFound` if no account has this username.
    fn find_account_by_username(&self, username: &str) -> Result<Account, StoreError>;

    /// # Errors
    /// Returns `StoreError::NotFound` if no account has this id.
    fn find_account_by_id(&self, id: i64) -> Result<Account, StoreError>;

    /// Replace an account's token salt and bump `updated_at`.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if no account has this id.
    fn update_token_hash(&self, id: i64, token_hash: String) -> Result<Account, StoreError>;
}

#[derive(Default)]
struct Accounts {
    by_id: HashMap<i64, Account>,
    id_by_username: HashMap<String, i64>,
    last_id: i64,
}

/// An `AccountStore` held entirely in memory.
///
/// Uses `RwLock` so concurrent logins only take the read lock.
pub struct InMemoryAccountStore {
    accounts: RwLock<Accounts>,
    time_source: Box<dyn TimeSource>,
}

impl InMemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_time_source(Box::new(SystemTimeSource))
    }

    /// Create a store whose `updated_at` stamps come from `time_source`.
    #[must_use]
    pub fn with_time_source(time_source: Box<dyn TimeSource>) -> Self {
        Self {
            accounts: RwLock::new(Accounts::default()),
            time_source,
        }
    }

    /// Number of stored accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.read().map_or(0, |accounts| accounts.by_id.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("account lock poisoned".to_string())
}

impl AccountStore for InMemoryAccountStore {
    fn create_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;

        if accounts.id_by_username.contains_key(&account.username) {
            return Err(StoreError::Conflict(account.username));
        }

        accounts.last_id += 1;
        let created = Account {
            id: accounts.last_id,
            username: account.username,
            password_hash: account.password_hash,
            token_hash: account.token_hash,
            created_at: account.created_at,
            updated_at: account.created_at,
        };
        accounts
            .id_by_username
            .insert(created.username.clone(), created.id);
        accounts.by_id.insert(created.id, created.clone());

        Ok(created)
    }

    fn find_account_by_username(&self, username: &str) -> Result<Account, StoreError> {
        let accounts = self.accounts.read().map_err(poisoned)?;
        accounts
            .id_by_username
            .get(username)
            .and_then(|id| accounts.by_id.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn find_account_by_id(&self, id: i64) -> Result<Account, StoreError> {
        let accounts = self.accounts.read().map_err(poisoned)?;
        accounts.by_id.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    fn update_token_hash(&self, id: i64, token_hash: String) -> Result<Account, StoreError> {
        let now = self.time_source.now_secs();
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        let account = accounts.by_id.get_mut(&id).ok_or(StoreError::NotFound)?;

        account.token_hash = token_hash;
        account.updated_at = now.max(account.updated_at);
        Ok(account.clone())
    }
}
