//! Session configuration (layered: code > env > `.env` file > defaults).

use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{CredentialStoreConfig, RefreshEndpoint, RefreshRejection, DEFAULT_REFRESH_HEADER};
use crate::error::SessionError;
use crate::transport::join_url;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection and credential settings for a [`Session`](crate::session::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub base_url: String,
    pub refresh_path: String,
    pub refresh_header: String,
    pub request_timeout: Duration,
    pub credential_dir: PathBuf,
    pub refresh_rejection: RefreshRejection,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            refresh_header: DEFAULT_REFRESH_HEADER.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            credential_dir: CredentialStoreConfig::default_dir(),
            refresh_rejection: RefreshRejection::default(),
        }
    }
}

impl SessionConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load from `PETSIT_*` environment variables, reading `.env` if present.
    pub fn from_env() -> Result<Self, SessionError> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        if let Some(url) = env_value("PETSIT_BASE_URL") {
            config.base_url = url;
        }
        if let Some(path) = env_value("PETSIT_REFRESH_PATH") {
            config.refresh_path = path;
        }
        if let Some(header) = env_value("PETSIT_REFRESH_HEADER") {
            config.refresh_header = header;
        }
        if let Some(raw) = env_value("PETSIT_TIMEOUT_SECS") {
            let secs = raw.parse::<u64>().map_err(|_| {
                SessionError::Configuration(format!("PETSIT_TIMEOUT_SECS is not a number: {raw}"))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = env_value("PETSIT_CREDENTIAL_DIR") {
            config.credential_dir = PathBuf::from(dir);
        }
        if let Some(raw) = env_value("PETSIT_SIGN_OUT_ON_REJECTED_REFRESH") {
            config.refresh_rejection = if parse_flag("PETSIT_SIGN_OUT_ON_REJECTED_REFRESH", &raw)? {
                RefreshRejection::SignOut
            } else {
                RefreshRejection::Retain
            };
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn with_refresh_header(mut self, header: impl Into<String>) -> Self {
        self.refresh_header = header.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_credential_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.credential_dir = dir.into();
        self
    }

    pub fn with_refresh_rejection(mut self, rejection: RefreshRejection) -> Self {
        self.refresh_rejection = rejection;
        self
    }

    /// Reject settings that cannot produce a working session.
    pub fn validate(&self) -> Result<(), SessionError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(SessionError::Configuration(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        if self.refresh_header.trim().is_empty() {
            return Err(SessionError::Configuration(
                "refresh header name is empty".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(SessionError::Configuration(
                "request timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn refresh_url(&self) -> String {
        join_url(&self.base_url, &self.refresh_path)
    }

    pub fn refresh_endpoint(&self) -> RefreshEndpoint {
        RefreshEndpoint::new(self.refresh_url()).with_header(self.refresh_header.clone())
    }

    pub fn store_config(&self) -> CredentialStoreConfig {
        CredentialStoreConfig::new(self.credential_dir.clone())
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, SessionError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SessionError::Configuration(format!(
            "{key} must be a boolean, got {raw}"
        ))),
    }
}
