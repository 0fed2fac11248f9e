//! Account records and the snapshot embedded in tokens.

use serde::{Deserialize, Serialize};

/// A registered account as held by the account store.
///
/// # Invariants
/// - `id` and `username` are unique within a store.
/// - `password_hash` is a bcrypt string.
/// - `token_hash` is the per-account salt bound into refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub token_hash: String,
    /// Creation time in Unix seconds.
    pub created_at: u64,
    /// Last update time in Unix seconds.
    pub updated_at: u64,
}

impl Account {
    /// The public view of this account, safe to embed in a token.
    #[must_use]
    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id,
            username: self.username.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Fields needed to create an account. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub token_hash: String,
    pub created_at: u64,
}

/// Account data carried inside tokens.
///
/// Never contains the password hash or token salt: tokens are signed,
/// not encrypted, so anyone holding one can read this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub id: i64,
    pub username: String,
    pub created_at: u64,
    pub updated_at: u64,
}

impl AccountSnapshot {
    /// Serialize to the opaque string form embedded in claims.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_claim_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse the opaque string form embedded in claims.
    ///
    /// # Errors
    /// Returns an error if the string is not a serialized snapshot.
    pub fn from_claim_string(value: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(value)
    }
}
