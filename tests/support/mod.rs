#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use petsit::auth::{Credential, MemoryCredentialStore, RefreshRejection, TokenAuthority};
use petsit::config::SessionConfig;
use petsit::session::Session;
use petsit::transport::ReqwestBackend;
use wiremock::MockServer;

pub const REFRESH_PATH: &str = "/auth/refresh";
pub const REFRESH_HEADER: &str = "x-refresh-token";

pub fn signed_in(access_token: &str, refresh_token: &str) -> Arc<MemoryCredentialStore> {
    Arc::new(MemoryCredentialStore::signed_in(Credential::new(
        access_token,
        refresh_token,
    )))
}

pub fn signed_out() -> Arc<MemoryCredentialStore> {
    Arc::new(MemoryCredentialStore::default())
}

pub fn config_for(server: &MockServer) -> SessionConfig {
    SessionConfig::new(server.uri()).with_request_timeout(Duration::from_secs(5))
}

pub fn backend() -> Arc<ReqwestBackend> {
    Arc::new(ReqwestBackend::new(Duration::from_secs(5)).expect("http client"))
}

pub fn session_for(server: &MockServer, store: Arc<MemoryCredentialStore>) -> Session {
    Session::with_parts(&config_for(server), store, backend())
}

pub fn session_with_rejection(
    server: &MockServer,
    store: Arc<MemoryCredentialStore>,
    rejection: RefreshRejection,
) -> Session {
    let config = config_for(server).with_refresh_rejection(rejection);
    Session::with_parts(&config, store, backend())
}

pub fn authority_for(server: &MockServer, store: Arc<MemoryCredentialStore>) -> TokenAuthority {
    TokenAuthority::new(store, backend(), config_for(server).refresh_endpoint())
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
