//! UI-facing error classification.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Error kind surfaced to screen controllers alongside a failed load.
///
/// Each kind maps to a stable localisation key via [`ErrorKind::message_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Unauthenticated,
    Conflict,
    ServerError,
    NotFound,
    PayloadTooLarge,
    Timeout,
    Serialization,
    Unknown,
}

impl ErrorKind {
    /// Localisation key, e.g. `error.payload_too_large`.
    pub fn message_key(self) -> String {
        format!("error.{self}")
    }

    /// Classify an HTTP status code. Success codes classify as `Unknown`.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthenticated,
            404 => Self::NotFound,
            408 | 504 => Self::Timeout,
            409 => Self::Conflict,
            413 => Self::PayloadTooLarge,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }
}

/// File-system error kinds used by file-backed collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FileIoErrorKind {
    AlreadyExists,
    NotFound,
    CannotRead,
    AccessDenied,
    Unknown,
}

impl FileIoErrorKind {
    /// Localisation key, e.g. `error.file.access_denied`.
    pub fn message_key(self) -> String {
        format!("error.file.{self}")
    }
}

impl From<std::io::ErrorKind> for FileIoErrorKind {
    fn from(kind: std::io::ErrorKind) -> Self {
        match kind {
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists,
            std::io::ErrorKind::NotFound => Self::NotFound,
            std::io::ErrorKind::PermissionDenied => Self::AccessDenied,
            std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof => {
                Self::CannotRead
            }
            _ => Self::Unknown,
        }
    }
}

/// Tagged file-system failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("file error ({kind}): {message}")]
pub struct FileIoError {
    pub kind: FileIoErrorKind,
    pub message: String,
}

impl FileIoError {
    pub fn new(kind: FileIoErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Wrap an IO error, naming the path it happened on.
    pub fn at_path(error: &std::io::Error, path: &Path) -> Self {
        Self::new(error.kind().into(), format!("{}: {error}", path.display()))
    }
}

impl From<std::io::Error> for FileIoError {
    fn from(error: std::io::Error) -> Self {
        Self::new(error.kind().into(), error.to_string())
    }
}
