//! Error types for the session layer.

pub mod kind;

pub use kind::{ErrorKind, FileIoError, FileIoErrorKind};

use thiserror::Error;

/// Primary error type for transport and session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    #[error("HTTP error (status {status}): {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Storage error: {0}")]
    Storage(#[from] FileIoError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl SessionError {
    /// Create an HTTP status error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Classify this error for the UI.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::Http { status, .. } => ErrorKind::from_status(*status),
            Self::Network(e) if e.is_timeout() => ErrorKind::Timeout,
            Self::Network(e) if e.is_decode() => ErrorKind::Serialization,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Timeout(_) => ErrorKind::Timeout,
            _ => ErrorKind::Unknown,
        }
    }

    /// Whether a caller-side retry policy may try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => !e.is_decode() && !e.is_builder(),
            other => matches!(other.kind(), ErrorKind::Timeout | ErrorKind::ServerError),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SessionError>;
