//! Accounts: records, storage and the login/refresh workflows.

pub mod model;
pub mod service;
pub mod store;

pub use model::{Account, AccountSnapshot, NewAccount};
pub use service::{AccountService, TOKEN_SALT_LENGTH, generate_token_salt, normalize_username};
pub use store::{AccountStore, InMemoryAccountStore, StoreError};
