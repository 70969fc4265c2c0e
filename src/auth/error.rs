use thiserror::Error;

use crate::error::{FileIoError, SessionError};

/// Errors from credential storage and the sign-in lifecycle.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not signed in")]
    NotSignedIn,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error(transparent)]
    Storage(#[from] FileIoError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Session(SessionError::Network(error))
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<AuthError> for SessionError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Session(inner) => inner,
            AuthError::Storage(inner) => SessionError::Storage(inner),
            rejected @ (AuthError::NotSignedIn | AuthError::InvalidCredentials) => {
                SessionError::Unauthenticated(rejected.to_string())
            }
            other => SessionError::InvalidRequest(other.to_string()),
        }
    }
}
