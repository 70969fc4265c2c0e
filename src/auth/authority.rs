//! Credential attachment and single-flight refresh.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

use super::credential::{redact, Credential};
use super::store::CredentialStore;
use crate::transport::http::parse_bare_token;
use crate::transport::{HttpBackend, HttpRequest};

/// Header carrying the refresh token unless configured otherwise.
pub const DEFAULT_REFRESH_HEADER: &str = "X-Refresh-Token";

type RefreshFlight = Shared<BoxFuture<'static, Option<Credential>>>;

/// What to do with the stored credential when the refresh endpoint answers
/// 401/403 for its refresh token. Transient failures never touch the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshRejection {
    /// Keep the credential; the caller sees `Unauthenticated`.
    #[default]
    Retain,
    /// Clear the credential, signing the user out.
    SignOut,
}

/// Where and how the refresh call is sent.
#[derive(Debug, Clone)]
pub struct RefreshEndpoint {
    pub url: String,
    pub header: String,
}

impl RefreshEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            header: DEFAULT_REFRESH_HEADER.to_string(),
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }
}

enum RefreshState {
    Idle,
    Refreshing(RefreshFlight),
}

/// Owns the credential refresh protocol.
///
/// However many callers hit an expired access token at once, at most one
/// refresh call is on the wire; everyone awaiting it receives the same
/// outcome. The refresh runs on its own task, so a caller that gives up
/// waiting does not abandon the refresh for the others.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use petsit::auth::{Credential, MemoryCredentialStore, RefreshEndpoint, TokenAuthority};
/// use petsit::transport::{HttpRequest, ReqwestBackend};
///
/// # async fn example() -> petsit::error::Result<()> {
/// let store = Arc::new(MemoryCredentialStore::signed_in(Credential::new("A1", "R1")));
/// let backend = Arc::new(ReqwestBackend::new(Duration::from_secs(30))?);
/// let authority = TokenAuthority::new(
///     store,
///     backend,
///     RefreshEndpoint::new("https://api.example.com/auth/refresh"),
/// );
/// let request = authority.attach(HttpRequest::get("https://api.example.com/bookings"));
/// assert_eq!(request.bearer(), Some("A1"));
/// # Ok(())
/// # }
/// ```
pub struct TokenAuthority {
    store: Arc<dyn CredentialStore>,
    backend: Arc<dyn HttpBackend>,
    endpoint: RefreshEndpoint,
    rejection: RefreshRejection,
    state: Arc<Mutex<RefreshState>>,
}

impl TokenAuthority {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        backend: Arc<dyn HttpBackend>,
        endpoint: RefreshEndpoint,
    ) -> Self {
        Self {
            store,
            backend,
            endpoint,
            rejection: RefreshRejection::default(),
            state: Arc::new(Mutex::new(RefreshState::Idle)),
        }
    }

    pub fn with_rejection(mut self, rejection: RefreshRejection) -> Self {
        self.rejection = rejection;
        self
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Whether a refresh call is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock_state(), RefreshState::Refreshing(_))
    }

    /// Attach the stored access token. Signed out, the request goes out bare
    /// and the server's 401 surfaces to the caller.
    pub fn attach(&self, request: HttpRequest) -> HttpRequest {
        let Some(credential) = self.store.current() else {
            return request.without_bearer();
        };
        let fallback = request.clone();
        match request.with_bearer(credential.access_token()) {
            Ok(authorized) => authorized,
            Err(err) => {
                tracing::warn!(error = %err, "stored access token unusable; sending unauthenticated");
                fallback.without_bearer()
            }
        }
    }

    /// Obtain a fresh credential after `original` came back unauthorized.
    ///
    /// Returns `None` when no refresh is possible or the refresh failed.
    pub async fn on_unauthorized(&self, original: &HttpRequest) -> Option<Credential> {
        if original.is_refresh() {
            tracing::debug!(url = %original.url, "refresh call unauthorized; not refreshing again");
            return None;
        }
        if !self.store.current().is_some_and(|c| c.can_refresh()) {
            return None;
        }

        let flight = {
            let mut state = self.lock_state();
            match &*state {
                RefreshState::Refreshing(flight) => {
                    tracing::debug!("joining in-flight refresh");
                    flight.clone()
                }
                RefreshState::Idle => {
                    // The store is updated before the state returns to `Idle`.
                    let credential = self.store.current()?;
                    if !credential.can_refresh() {
                        return None;
                    }
                    if original.bearer() != Some(credential.access_token()) {
                        tracing::debug!("access token already rotated; reusing stored credential");
                        return Some(credential);
                    }
                    let flight = self.start_refresh(credential);
                    *state = RefreshState::Refreshing(flight.clone());
                    flight
                }
            }
        };
        flight.await
    }

    // Must be called with the state lock held: the spawned task resets the
    // state to `Idle` on exit and has to find its own flight installed.
    fn start_refresh(&self, credential: Credential) -> RefreshFlight {
        let store = self.store.clone();
        let backend = self.backend.clone();
        let endpoint = self.endpoint.clone();
        let rejection = self.rejection;
        let idle_on_exit = IdleOnExit(self.state.clone());

        let task = tokio::spawn(async move {
            let _idle_on_exit = idle_on_exit;
            refresh_credential(store, backend, endpoint, rejection, credential).await
        });

        task.map(|joined| {
            joined.unwrap_or_else(|err| {
                tracing::error!(error = %err, "refresh task aborted");
                None
            })
        })
        .boxed()
        .shared()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Restores `Idle` when the refresh task ends, including by panic.
struct IdleOnExit(Arc<Mutex<RefreshState>>);

impl Drop for IdleOnExit {
    fn drop(&mut self) {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *state = RefreshState::Idle;
    }
}

async fn refresh_credential(
    store: Arc<dyn CredentialStore>,
    backend: Arc<dyn HttpBackend>,
    endpoint: RefreshEndpoint,
    rejection: RefreshRejection,
    credential: Credential,
) -> Option<Credential> {
    let request = match HttpRequest::post(&endpoint.url)
        .refresh_call()
        .header(&endpoint.header, credential.refresh_token())
    {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(error = %err, "could not build refresh request");
            return None;
        }
    };

    tracing::info!(
        url = %endpoint.url,
        refresh_token = %redact(credential.refresh_token()),
        "refreshing access token"
    );
    let response = match backend.send(&request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(error = %err, "refresh call failed");
            return None;
        }
    };

    if !response.is_success() {
        tracing::warn!(status = response.status, "refresh token rejected");
        if matches!(response.status, 401 | 403) && rejection == RefreshRejection::SignOut {
            sign_out_if_unchanged(store.as_ref(), &credential);
        }
        return None;
    }

    let Some(access_token) = parse_bare_token(&response.text()) else {
        tracing::warn!("refresh response carried no access token");
        return None;
    };
    // A sign-out or sign-in may have landed while the refresh was on the wire.
    let refreshed = credential.with_access_token(access_token);
    match store.replace_if(credential.refresh_token(), Some(refreshed.clone())) {
        Ok(true) => tracing::info!("access token refreshed"),
        Ok(false) => {
            tracing::info!("credential changed during refresh; discarding refreshed token");
            return None;
        }
        Err(err) => tracing::error!(error = %err, "refreshed credential could not be persisted"),
    }
    Some(refreshed)
}

fn sign_out_if_unchanged(store: &dyn CredentialStore, rejected: &Credential) {
    match store.replace_if(rejected.refresh_token(), None) {
        Ok(true) => tracing::info!("refresh token rejected; signed out"),
        Ok(false) => tracing::debug!("credential changed during refresh; keeping it"),
        Err(err) => tracing::error!(error = %err, "failed to clear rejected credential"),
    }
}
