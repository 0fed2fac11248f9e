//! Token signing configuration.
//!
//! # Pre-conditions
//! - Both signing secrets must be non-empty.
//! - The access and refresh secrets must differ.
//!
//! # Post-conditions
//! - `AuthConfig` instances are immutable once created.
//!
//! # Invariants
//! - Lifetimes are at least one minute.
//! - An access token can never verify under the refresh key and vice versa.

/// Default access-token lifetime in minutes.
pub const DEFAULT_ACCESS_TOKEN_MINUTES: u64 = 30;

/// Default refresh-token lifetime in minutes (7 days).
pub const DEFAULT_REFRESH_TOKEN_MINUTES: u64 = 7 * 24 * 60;

/// Error returned when the signing configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthConfigError {
    /// The access signing secret is empty.
    EmptyAccessSecret,
    /// The refresh signing secret is empty.
    EmptyRefreshSecret,
    /// Access and refresh tokens would share a signing secret.
    SharedSecret,
    /// A token lifetime of zero minutes was requested.
    ZeroLifetime,
}

impl std::fmt::Display for AuthConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyAccessSecret => write!(f, "access signing secret must not be empty"),
            Self::EmptyRefreshSecret => write!(f, "refresh signing secret must not be empty"),
            Self::SharedSecret => {
                write!(f, "access and refresh signing secrets must be different")
            }
            Self::ZeroLifetime => write!(f, "token lifetime must be at least one minute"),
        }
    }
}

impl std::error::Error for AuthConfigError {}

/// Key material and lifetimes for the token authority.
#[derive(Clone)]
pub struct AuthConfig {
    access_secret: Vec<u8>,
    refresh_secret: Vec<u8>,
    /// Access-token lifetime in minutes.
    pub access_token_minutes: u64,
    /// Refresh-token lifetime in minutes.
    pub refresh_token_minutes: u64,
}

impl AuthConfig {
    /// Create a signing configuration with the default lifetimes.
    ///
    /// # Errors
    /// Returns an `AuthConfigError` if either secret is empty or both are equal.
    pub fn new(access_secret: Vec<u8>, refresh_secret: Vec<u8>) -> Result<Self, AuthConfigError> {
        Self::with_lifetimes(
            access_secret,
            refresh_secret,
            DEFAULT_ACCESS_TOKEN_MINUTES,
            DEFAULT_REFRESH_TOKEN_MINUTES,
        )
    }

    /// Create a signing configuration with explicit lifetimes.
    ///
    /// # Errors
    /// Returns an `AuthConfigError` if either secret is empty, both are equal,
    /// or a lifetime is zero.
    pub fn with_lifetimes(
        access_secret: Vec<u8>,
        refresh_secret: Vec<u8>,
        access_token_minutes: u64,
        refresh_token_minutes: u64,
    ) -> Result<Self, AuthConfigError> {
        if access_secret.is_empty() {
            return Err(AuthConfigError::EmptyAccessSecret);
        }
        if refresh_secret.is_empty() {
            return Err(AuthConfigError::EmptyRefreshSecret);
        }
        if access_secret == refresh_secret {
            return Err(AuthConfigError::SharedSecret);
        }
        if access_token_minutes == 0 || refresh_token_minutes == 0 {
            return Err(AuthConfigError::ZeroLifetime);
        }

        Ok(Self {
            access_secret,
            refresh_secret,
            access_token_minutes,
            refresh_token_minutes,
        })
    }

    /// The secret used to sign access tokens.
    #[must_use]
    pub fn access_secret(&self) -> &[u8] {
        &self.access_secret
    }

    /// The secret used to sign refresh tokens.
    #[must_use]
    pub fn refresh_secret(&self) -> &[u8] {
        &self.refresh_secret
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_token_minutes", &self.access_token_minutes)
            .field("refresh_token_minutes", &self.refresh_token_minutes)
            .finish()
    }
}
