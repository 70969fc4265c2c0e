//! Wiring of store, backend, authority and transport into one handle.

use std::sync::Arc;

use crate::auth::{AuthService, CredentialStore, FileCredentialStore, TokenAuthority};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::transport::{HttpBackend, ReqwestBackend, Transport};

/// Everything a screen controller needs to talk to the API.
///
/// # Example
/// ```no_run
/// use petsit::config::SessionConfig;
/// use petsit::session::Session;
///
/// # async fn example() -> petsit::error::Result<()> {
/// let session = Session::from_config(&SessionConfig::from_env()?)?;
/// let _bookings: serde_json::Value = session.transport().get_json("/bookings").await?;
/// # Ok(())
/// # }
/// ```
pub struct Session {
    store: Arc<dyn CredentialStore>,
    authority: Arc<TokenAuthority>,
    transport: Arc<Transport>,
    auth: AuthService,
}

impl Session {
    /// File-backed store and `reqwest` backend, as configured.
    pub fn from_config(config: &SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let store = Arc::new(FileCredentialStore::open(config.store_config())?);
        let backend = Arc::new(ReqwestBackend::new(config.request_timeout)?);
        Ok(Self::with_parts(config, store, backend))
    }

    /// Assemble a session from explicit collaborators.
    pub fn with_parts(
        config: &SessionConfig,
        store: Arc<dyn CredentialStore>,
        backend: Arc<dyn HttpBackend>,
    ) -> Self {
        let authority = Arc::new(
            TokenAuthority::new(store.clone(), backend.clone(), config.refresh_endpoint())
                .with_rejection(config.refresh_rejection),
        );
        let transport = Arc::new(
            Transport::new(backend.clone(), authority.clone())
                .with_base_url(config.base_url.clone())
                .with_timeout(config.request_timeout),
        );
        let auth = AuthService::new(store.clone(), backend, config.base_url.clone());
        Self {
            store,
            authority,
            transport,
            auth,
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn authority(&self) -> &Arc<TokenAuthority> {
        &self.authority
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }
}
