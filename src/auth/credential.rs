use std::fmt;

use serde::{Deserialize, Serialize};

/// Access/refresh token pair identifying an authenticated session.
///
/// A credential is never mutated in place: a refresh produces a new value via
/// [`Credential::with_access_token`] and the store replaces the old one.
///
/// # Example
/// ```
/// use petsit::auth::Credential;
///
/// let signed_in = Credential::new("A1", "R1");
/// let refreshed = signed_in.with_access_token("A2");
/// assert_eq!(refreshed.access_token(), "A2");
/// assert_eq!(refreshed.refresh_token(), "R1");
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    access_token: String,
    refresh_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// New credential carrying `access_token` and this credential's refresh token.
    pub fn with_access_token(&self, access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: self.refresh_token.clone(),
        }
    }

    /// Whether a refresh can be attempted with this credential.
    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

/// Short, log-safe rendering of a secret.
pub(crate) fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    if prefix.chars().count() == secret.chars().count() {
        return "****".to_string();
    }
    format!("{prefix}****")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_never_contains_full_tokens() {
        let credential = Credential::new("access-secret-value", "refresh-secret-value");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("access-secret-value"));
        assert!(!rendered.contains("refresh-secret-value"));
        assert!(rendered.contains("acce****"));
    }

    #[test]
    fn short_secrets_are_fully_masked() {
        assert_eq!(redact("A1"), "****");
        assert_eq!(redact(""), "****");
    }

    #[test]
    fn blank_refresh_token_cannot_refresh() {
        assert!(!Credential::new("A1", "  ").can_refresh());
        assert!(Credential::new("A1", "R1").can_refresh());
    }
}
