//! Server configuration module.
//!
//! This module loads the server configuration from environment variables.
//!
//! # Environment Variables
//!
//! - `ACCESS_HMAC_SECRET_KEY`: Secret for signing access tokens (required)
//! - `REFRESH_HMAC_SECRET_KEY`: Secret for signing refresh tokens (required)
//! - `JWT_EXPIRATION`: Access-token lifetime in minutes (default: `30`)
//! - `REFRESH_TOKEN_EXPIRATION`: Refresh-token lifetime in minutes (default: `10080`)
//! - `LISTEN_PORT`: Port to listen on (default: `8080`)
//! - `UPLOAD_DIRECTORY`: Directory where uploaded images are stored (default: `./uploads`)
//!
//! # Invariants
//!
//! - `listen_port` is always a valid port number
//! - `auth` always holds two distinct, non-empty secrets

use std::path::PathBuf;

use crate::auth::auth_config::{DEFAULT_ACCESS_TOKEN_MINUTES, DEFAULT_REFRESH_TOKEN_MINUTES};
use crate::auth::{AuthConfig, AuthConfigError};

const ACCESS_SECRET_VAR: &str = "ACCESS_HMAC_SECRET_KEY";
const REFRESH_SECRET_VAR: &str = "REFRESH_HMAC_SECRET_KEY";
const ACCESS_EXPIRATION_VAR: &str = "JWT_EXPIRATION";
const REFRESH_EXPIRATION_VAR: &str = "REFRESH_TOKEN_EXPIRATION";
const LISTEN_PORT_VAR: &str = "LISTEN_PORT";
const UPLOAD_DIRECTORY_VAR: &str = "UPLOAD_DIRECTORY";

/// Server configuration.
///
/// # Post-conditions
///
/// When constructed via `from_env()`, every field has been validated.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on for HTTP requests.
    pub listen_port: u16,
    /// Directory where uploaded images are written.
    pub upload_directory: PathBuf,
    /// Token signing configuration.
    pub auth: AuthConfig,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is missing.
    MissingEnvVar(String),
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
    /// The signing configuration is invalid.
    Auth(AuthConfigError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnvVar(name) => {
                write!(f, "missing required environment variable: {name}")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
            Self::Auth(e) => write!(f, "invalid auth configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Auth(e) => Some(e),
            Self::MissingEnvVar(_) | Self::InvalidValue { .. } => None,
        }
    }
}

impl From<AuthConfigError> for ConfigError {
    fn from(e: AuthConfigError) -> Self {
        Self::Auth(e)
    }
}

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 8080;
    /// Default upload directory.
    pub const DEFAULT_UPLOAD_DIRECTORY: &'static str = "./uploads";

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - either signing secret is not set, empty, or both are equal
    /// - a numeric variable is set but not a valid number
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as `from_env`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_secret = load_required(&lookup, ACCESS_SECRET_VAR)?;
        let refresh_secret = load_required(&lookup, REFRESH_SECRET_VAR)?;
        let access_minutes =
            load_minutes(&lookup, ACCESS_EXPIRATION_VAR, DEFAULT_ACCESS_TOKEN_MINUTES)?;
        let refresh_minutes =
            load_minutes(&lookup, REFRESH_EXPIRATION_VAR, DEFAULT_REFRESH_TOKEN_MINUTES)?;

        let auth = AuthConfig::with_lifetimes(
            access_secret.into_bytes(),
            refresh_secret.into_bytes(),
            access_minutes,
            refresh_minutes,
        )?;

        Ok(Self {
            listen_port: load_listen_port(&lookup)?,
            upload_directory: lookup(UPLOAD_DIRECTORY_VAR)
                .map_or_else(|| PathBuf::from(Self::DEFAULT_UPLOAD_DIRECTORY), PathBuf::from),
            auth,
        })
    }
}

/// Load a variable that must be set and non-empty.
fn load_required<F>(lookup: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))?;

    if value.is_empty() {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: "must not be empty".to_string(),
        });
    }

    Ok(value)
}

/// Load a lifetime in minutes, falling back to `default` if unset.
fn load_minutes<F>(lookup: &F, name: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => match value.trim().parse::<u64>() {
            Ok(minutes) if minutes > 0 => Ok(minutes),
            _ => Err(ConfigError::InvalidValue {
                name: name.to_string(),
                message: format!("'{value}' is not a positive number of minutes"),
            }),
        },
        None => Ok(default),
    }
}

/// Load the listen port, falling back to the default if unset.
fn load_listen_port<F>(lookup: &F) -> Result<u16, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(LISTEN_PORT_VAR) {
        Some(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
            name: LISTEN_PORT_VAR.to_string(),
            message: format!("'{value}' is not a valid port number (must be 1-65535)"),
        }),
        None => Ok(ServerConfig::DEFAULT_PORT),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const SECRETS: [(&str, &str); 2] = [
        ("ACCESS_HMAC_SECRET_KEY", "access"),
        ("REFRESH_HMAC_SECRET_KEY", "refresh"),
    ];

    #[test]
    fn test_default_values() {
        assert_eq!(ServerConfig::DEFAULT_PORT, 8080);
        assert_eq!(ServerConfig::DEFAULT_UPLOAD_DIRECTORY, "./uploads");
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&SECRETS)).expect("config");

        assert_eq!(config.listen_port, 8080);
        assert_eq!(config.upload_directory, PathBuf::from("./uploads"));
        assert_eq!(config.auth.access_secret(), b"access");
        assert_eq!(config.auth.refresh_secret(), b"refresh");
        assert_eq!(config.auth.access_token_minutes, 30);
        assert_eq!(config.auth.refresh_token_minutes, 10_080);
    }

    #[test]
    fn test_all_values_set() {
        let mut vars = SECRETS.to_vec();
        vars.extend([
            ("JWT_EXPIRATION", "15"),
            ("REFRESH_TOKEN_EXPIRATION", "120"),
            ("LISTEN_PORT", "9000"),
            ("UPLOAD_DIRECTORY", "/tmp/images"),
        ]);
        let config = ServerConfig::from_lookup(lookup_from(&vars)).expect("config");

        assert_eq!(config.listen_port, 9000);
        assert_eq!(config.upload_directory, PathBuf::from("/tmp/images"));
        assert_eq!(config.auth.access_token_minutes, 15);
        assert_eq!(config.auth.refresh_token_minutes, 120);
    }

    #[test]
    fn test_missing_secret() {
        let result = ServerConfig::from_lookup(lookup_from(&[("ACCESS_HMAC_SECRET_KEY", "a")]));
        assert_eq!(
            result.err(),
            Some(ConfigError::MissingEnvVar("REFRESH_HMAC_SECRET_KEY".to_string()))
        );
    }

    #[test]
    fn test_empty_secret() {
        let result = ServerConfig::from_lookup(lookup_from(&[
            ("ACCESS_HMAC_SECRET_KEY", ""),
            ("REFRESH_HMAC_SECRET_KEY", "refresh"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { name, .. }) if name == "ACCESS_HMAC_SECRET_KEY"));
    }

    #[test]
    fn test_shared_secret() {
        let result = ServerConfig::from_lookup(lookup_from(&[
            ("ACCESS_HMAC_SECRET_KEY", "same"),
            ("REFRESH_HMAC_SECRET_KEY", "same"),
        ]));
        assert_eq!(
            result.err(),
            Some(ConfigError::Auth(AuthConfigError::SharedSecret))
        );
    }

    #[test]
    fn test_invalid_expiration() {
        for bad in ["0", "-5", "soon"] {
            let mut vars = SECRETS.to_vec();
            vars.push(("JWT_EXPIRATION", bad));
            let result = ServerConfig::from_lookup(lookup_from(&vars));
            assert!(
                matches!(&result, Err(ConfigError::InvalidValue { name, .. }) if name == "JWT_EXPIRATION"),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut vars = SECRETS.to_vec();
        vars.push(("LISTEN_PORT", "70000"));
        let result = ServerConfig::from_lookup(lookup_from(&vars));
        assert!(matches!(result, Err(ConfigError::InvalidValue { name, .. }) if name == "LISTEN_PORT"));
    }

    #[test]
    fn test_config_error_display_missing() {
        let error = ConfigError::MissingEnvVar("TEST_VAR".to_string());
        assert_eq!(
            error.to_string(),
            "missing required environment variable: TEST_VAR"
        );
    }

    #[test]
    fn test_config_error_display_invalid() {
        let error = ConfigError::InvalidValue {
            name: "TEST_VAR".to_string(),
            message: "bad value".to_string(),
        };
        assert_eq!(error.to_string(), "invalid value for TEST_VAR: bad value");
    }
}
