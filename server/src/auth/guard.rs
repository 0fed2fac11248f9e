//! Scope and audience checks on decoded claims.
//!
//! The guard runs after signature verification and never touches keys. It
//! checks, in order: time validity, granted scopes, audience.
//!
//! # Invariants
//! - Pure and deterministic: the same claims, requirements and instant always
//!   produce the same result.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Registered and scope-related claims examined by the guard.
///
/// Absent time claims are not checked, matching registered-claim semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default)]
    pub aud: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "type")]
    pub token_type: String,
    /// Space-delimited scope grants.
    #[serde(default)]
    pub scope: String,
}

impl ScopeClaims {
    /// Check `exp`, `iat` and `nbf` against `now` (Unix seconds).
    ///
    /// # Errors
    /// Returns `GuardError::InvalidClaims` describing the first failing claim.
    pub fn check_time(&self, now: u64) -> Result<(), GuardError> {
        if let Some(exp) = self.exp.filter(|&exp| now > exp) {
            return Err(GuardError::InvalidClaims(format!("token expired at {exp}")));
        }
        if let Some(iat) = self.iat.filter(|&iat| now < iat) {
            return Err(GuardError::InvalidClaims(format!(
                "token used before issued at {iat}"
            )));
        }
        if let Some(nbf) = self.nbf.filter(|&nbf| now < nbf) {
            return Err(GuardError::InvalidClaims(format!(
                "token is not valid before {nbf}"
            )));
        }
        Ok(())
    }

    /// The granted scopes as a set.
    #[must_use]
    pub fn granted_scopes(&self) -> HashSet<&str> {
        self.scope.split(' ').filter(|s| !s.is_empty()).collect()
    }
}

/// Error returned when claims do not authorize the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// A time-based claim is out of range.
    InvalidClaims(String),
    /// A required scope is not granted. Carries the first missing scope.
    InsufficientScope(String),
    /// The audience does not match.
    InvalidAudience,
}

impl std::fmt::Display for GuardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidClaims(reason) => write!(f, "token claims are invalid: {reason}"),
            Self::InsufficientScope(scope) => write!(f, "insufficient scope: missing '{scope}'"),
            Self::InvalidAudience => write!(f, "invalid audience"),
        }
    }
}

impl std::error::Error for GuardError {}

/// Verify that `claims` are current, grant every scope in
/// `required_scopes`, and were issued for `audience`.
///
/// # Errors
/// Returns the `GuardError` for the first failing check.
pub fn verify_claims<S: AsRef<str>>(
    claims: &ScopeClaims,
    required_scopes: &[S],
    audience: &str,
    now: u64,
) -> Result<(), GuardError> {
    claims.check_time(now)?;

    let granted = claims.granted_scopes();
    if let Some(missing) = required_scopes
        .iter()
        .map(AsRef::as_ref)
        .find(|scope| !granted.contains(scope))
    {
        tracing::warn!("claims do not grant required scope '{missing}'");
        return Err(GuardError::InsufficientScope(missing.to_string()));
    }

    if claims.aud != audience {
        tracing::warn!(
            "claims audience '{}' does not match '{audience}'",
            claims.aud
        );
        return Err(GuardError::InvalidAudience);
    }

    Ok(())
}

/// A fixed set of requirements checked against many claim sets.
#[derive(Debug, Clone)]
pub struct ScopeGuard {
    audience: String,
    scopes: Vec<String>,
}

impl ScopeGuard {
    #[must_use]
    pub fn new(audience: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            audience: audience.into(),
            scopes,
        }
    }

    /// Check claims against this guard's audience and scopes.
    ///
    /// # Errors
    /// See `verify_claims`.
    pub fn verify(&self, claims: &ScopeClaims, now: u64) -> Result<(), GuardError> {
        verify_claims(claims, &self.scopes, &self.audience, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::codec::TokenCodec;

    const NOW: u64 = 1_700_000_000;

    fn claims(scope: &str, aud: &str) -> ScopeClaims {
        ScopeClaims {
            aud: aud.to_string(),
            scope: scope.to_string(),
            ..ScopeClaims::default()
        }
    }

    #[test]
    fn test_scope_granted() {
        let result = verify_claims(&claims("read write", "api"), &["read"], "api", NOW);
        assert!(result.is_ok());
    }

    #[test]
    fn test_all_scopes_required() {
        let result = verify_claims(&claims("read write", "api"), &["read", "write"], "api", NOW);
        assert!(result.is_ok());

        let result = verify_claims(&claims("read", "api"), &["read", "write"], "api", NOW);
        assert_eq!(
            result,
            Err(GuardError::InsufficientScope("write".to_string()))
        );
    }

    #[test]
    fn test_scope_missing() {
        let result = verify_claims(&claims("write", "api"), &["read"], "api", NOW);
        assert_eq!(result, Err(GuardError::InsufficientScope("read".to_string())));
    }

    #[test]
    fn test_scope_match_is_exact() {
        let result = verify_claims(&claims("reader", "api"), &["read"], "api", NOW);
        assert!(matches!(result, Err(GuardError::InsufficientScope(_))));
    }

    #[test]
    fn test_no_required_scopes() {
        let none: [&str; 0] = [];
        assert!(verify_claims(&claims("", "api"), &none, "api", NOW).is_ok());
    }

    #[test]
    fn test_audience_match() {
        assert!(verify_claims(&claims("read", "api"), &["read"], "api", NOW).is_ok());
    }

    #[test]
    fn test_audience_mismatch() {
        let result = verify_claims(&claims("read", "other"), &["read"], "api", NOW);
        assert_eq!(result, Err(GuardError::InvalidAudience));
    }

    #[test]
    fn test_scope_checked_before_audience() {
        let result = verify_claims(&claims("write", "other"), &["read"], "api", NOW);
        assert!(matches!(result, Err(GuardError::InsufficientScope(_))));
    }

    #[test]
    fn test_expired_claims() {
        let expired = ScopeClaims {
            exp: Some(NOW - 1),
            ..claims("read", "api")
        };
        let result = verify_claims(&expired, &["read"], "api", NOW);
        assert!(matches!(result, Err(GuardError::InvalidClaims(_))));

        let at_expiry = ScopeClaims {
            exp: Some(NOW),
            ..claims("read", "api")
        };
        assert!(verify_claims(&at_expiry, &["read"], "api", NOW).is_ok());
    }

    #[test]
    fn test_issued_in_future() {
        let future = ScopeClaims {
            iat: Some(NOW + 60),
            ..claims("read", "api")
        };
        let result = verify_claims(&future, &["read"], "api", NOW);
        assert!(matches!(result, Err(GuardError::InvalidClaims(_))));
    }

    #[test]
    fn test_not_yet_valid() {
        let early = ScopeClaims {
            nbf: Some(NOW + 60),
            ..claims("read", "api")
        };
        let result = verify_claims(&early, &["read"], "api", NOW);
        assert!(matches!(result, Err(GuardError::InvalidClaims(_))));
    }

    #[test]
    fn test_time_checked_before_scope() {
        let expired = ScopeClaims {
            exp: Some(NOW - 1),
            ..claims("write", "other")
        };
        let result = verify_claims(&expired, &["read"], "api", NOW);
        assert!(matches!(result, Err(GuardError::InvalidClaims(_))));
    }

    #[test]
    fn test_scope_guard() {
        let guard = ScopeGuard::new("api", vec!["read".to_string()]);

        assert!(guard.verify(&claims("read write", "api"), NOW).is_ok());
        assert!(matches!(
            guard.verify(&claims("write", "api"), NOW),
            Err(GuardError::InsufficientScope(_))
        ));
        assert_eq!(
            guard.verify(&claims("read", "other"), NOW),
            Err(GuardError::InvalidAudience)
        );
    }

    #[test]
    fn test_guard_on_decoded_token() {
        let codec = TokenCodec::new(b"guard-test-secret").expect("codec");
        let issued = ScopeClaims {
            sub: Some("user-1".to_string()),
            exp: Some(4_102_444_800),
            iat: Some(NOW),
            email: "user@example.com".to_string(),
            token_type: "Bearer".to_string(),
            ..claims("profile read", "api")
        };
        let token = codec.encode(&issued).expect("encode");

        let decoded: ScopeClaims = codec.decode(&token).expect("decode");
        assert_eq!(decoded, issued);
        assert!(verify_claims(&decoded, &["read", "profile"], "api", NOW).is_ok());
    }

    #[test]
    fn test_guard_error_display() {
        assert_eq!(GuardError::InvalidAudience.to_string(), "invalid audience");
        assert_eq!(
            GuardError::InsufficientScope("read".to_string()).to_string(),
            "insufficient scope: missing 'read'"
        );
    }
}
