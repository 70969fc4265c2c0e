//! Tests for environment-driven session configuration.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use petsit::auth::RefreshRejection;
use petsit::config::SessionConfig;
use petsit::error::SessionError;
use pretty_assertions::assert_eq;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const CONFIG_ENV_VARS: [&str; 6] = [
    "PETSIT_BASE_URL",
    "PETSIT_REFRESH_PATH",
    "PETSIT_REFRESH_HEADER",
    "PETSIT_TIMEOUT_SECS",
    "PETSIT_CREDENTIAL_DIR",
    "PETSIT_SIGN_OUT_ON_REJECTED_REFRESH",
];

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn capture(keys: &[&str]) -> Self {
        let saved = keys
            .iter()
            .map(|key| ((*key).to_string(), std::env::var(key).ok()))
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn env_lock_guard() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn clear_config_env() {
    for key in CONFIG_ENV_VARS {
        std::env::remove_var(key);
    }
}

#[test]
fn from_env_uses_defaults_when_nothing_is_set() {
    let _lock = env_lock_guard();
    let _env = EnvGuard::capture(&CONFIG_ENV_VARS);
    clear_config_env();

    let config = SessionConfig::from_env().unwrap();

    assert_eq!(config.base_url, "http://localhost:8080");
    assert_eq!(config.refresh_url(), "http://localhost:8080/auth/refresh");
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert_eq!(config.refresh_rejection, RefreshRejection::Retain);
}

#[test]
fn from_env_reads_every_setting() {
    let _lock = env_lock_guard();
    let _env = EnvGuard::capture(&CONFIG_ENV_VARS);
    clear_config_env();
    std::env::set_var("PETSIT_BASE_URL", "https://api.petsit.test/v1/");
    std::env::set_var("PETSIT_REFRESH_PATH", "/session/renew");
    std::env::set_var("PETSIT_REFRESH_HEADER", "X-Renew-Token");
    std::env::set_var("PETSIT_TIMEOUT_SECS", " 12 ");
    std::env::set_var("PETSIT_CREDENTIAL_DIR", "/var/lib/petsit");
    std::env::set_var("PETSIT_SIGN_OUT_ON_REJECTED_REFRESH", "true");

    let config = SessionConfig::from_env().unwrap();

    assert_eq!(
        config.refresh_url(),
        "https://api.petsit.test/v1/session/renew"
    );
    assert_eq!(config.refresh_header, "X-Renew-Token");
    assert_eq!(config.request_timeout, Duration::from_secs(12));
    assert_eq!(config.credential_dir, PathBuf::from("/var/lib/petsit"));
    assert_eq!(config.refresh_rejection, RefreshRejection::SignOut);
}

#[test]
fn blank_values_fall_back_to_defaults() {
    let _lock = env_lock_guard();
    let _env = EnvGuard::capture(&CONFIG_ENV_VARS);
    clear_config_env();
    std::env::set_var("PETSIT_BASE_URL", "   ");

    let config = SessionConfig::from_env().unwrap();

    assert_eq!(config.base_url, "http://localhost:8080");
}

#[test]
fn invalid_timeout_is_a_configuration_error() {
    let _lock = env_lock_guard();
    let _env = EnvGuard::capture(&CONFIG_ENV_VARS);
    clear_config_env();
    std::env::set_var("PETSIT_TIMEOUT_SECS", "soon");

    let err = SessionConfig::from_env().unwrap_err();

    assert!(matches!(err, SessionError::Configuration(msg) if msg.contains("PETSIT_TIMEOUT_SECS")));
}

#[test]
fn invalid_sign_out_flag_is_a_configuration_error() {
    let _lock = env_lock_guard();
    let _env = EnvGuard::capture(&CONFIG_ENV_VARS);
    clear_config_env();
    std::env::set_var("PETSIT_SIGN_OUT_ON_REJECTED_REFRESH", "sometimes");

    assert!(matches!(
        SessionConfig::from_env(),
        Err(SessionError::Configuration(_))
    ));
}

#[test]
fn non_http_base_url_from_env_is_rejected() {
    let _lock = env_lock_guard();
    let _env = EnvGuard::capture(&CONFIG_ENV_VARS);
    clear_config_env();
    std::env::set_var("PETSIT_BASE_URL", "api.petsit.test");

    assert!(SessionConfig::from_env().is_err());
}

#[test]
fn refresh_endpoint_carries_configured_header() {
    let config = SessionConfig::new("https://api.petsit.test").with_refresh_header("X-Renew-Token");

    let endpoint = config.refresh_endpoint();

    assert_eq!(endpoint.url, "https://api.petsit.test/auth/refresh");
    assert_eq!(endpoint.header, "X-Renew-Token");
}

#[test]
fn store_config_points_at_credential_dir() {
    let config = SessionConfig::new("https://api.petsit.test").with_credential_dir("/tmp/petsit-test");

    assert_eq!(
        config.store_config().base_dir,
        PathBuf::from("/tmp/petsit-test")
    );
}
