//! Shared, immutable service context handed to every handler.

use std::sync::Arc;

use crate::account::{AccountService, AccountStore, InMemoryAccountStore};
use crate::auth::{AuthError, TokenAuthority};
use crate::config::ServerConfig;
use crate::files::ImageService;

/// Services available to request handlers.
///
/// Cloning is cheap: every field is reference-counted and none is mutated
/// after construction.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub images: Arc<ImageService>,
}

impl AppState {
    /// Build the production service graph from configuration, backed by an
    /// in-memory account store.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if the signing keys cannot be built.
    pub fn from_config(config: &ServerConfig) -> Result<Self, AuthError> {
        let store: Arc<dyn AccountStore> = Arc::new(InMemoryAccountStore::new());
        let authority = Arc::new(TokenAuthority::new(&config.auth)?);
        Ok(Self::new(
            Arc::new(AccountService::new(store, authority)),
            Arc::new(ImageService::new(config.upload_directory.clone())),
        ))
    }

    #[must_use]
    pub const fn new(accounts: Arc<AccountService>, images: Arc<ImageService>) -> Self {
        Self { accounts, images }
    }
}
