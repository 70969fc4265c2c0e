use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::credential::Credential;
use super::error::AuthError;
use super::store::CredentialStore;
use crate::transport::http::status_to_error;
use crate::transport::{join_url, HttpBackend, HttpRequest};

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";

/// New-account details sent to the registration endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPair {
    access_token: String,
    refresh_token: String,
}

/// Creates and clears the stored credential.
///
/// Sign-in and registration go straight to the backend: they carry no bearer
/// and must never trigger a refresh.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use petsit::auth::{AuthService, MemoryCredentialStore};
/// use petsit::transport::ReqwestBackend;
///
/// # async fn example() -> Result<(), petsit::auth::AuthError> {
/// let service = AuthService::new(
///     Arc::new(MemoryCredentialStore::default()),
///     Arc::new(ReqwestBackend::new(Duration::from_secs(30))?),
///     "https://api.example.com",
/// );
/// service.sign_in("owner@example.com", "hunter2").await?;
/// # Ok(())
/// # }
/// ```
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    backend: Arc<dyn HttpBackend>,
    base_url: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        backend: Arc<dyn HttpBackend>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            backend,
            base_url: base_url.into(),
        }
    }

    /// Exchange email and password for a credential and store it.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Credential, AuthError> {
        let request = HttpRequest::post(join_url(&self.base_url, LOGIN_PATH))
            .json(&SignInRequest { email, password })?;
        let credential = self.exchange(request).await?;
        tracing::info!("signed in");
        Ok(credential)
    }

    /// Create an account and store the credential it comes back with.
    pub async fn register(&self, registration: &Registration) -> Result<Credential, AuthError> {
        let request =
            HttpRequest::post(join_url(&self.base_url, REGISTER_PATH)).json(registration)?;
        let credential = self.exchange(request).await?;
        tracing::info!("registered and signed in");
        Ok(credential)
    }

    /// Clear the stored credential.
    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.store.replace(None)?;
        tracing::info!("signed out");
        Ok(())
    }

    /// Stored credential, `None` when signed out.
    pub fn status(&self) -> Option<Credential> {
        self.store.current()
    }

    async fn exchange(&self, request: HttpRequest) -> Result<Credential, AuthError> {
        let response = self.backend.send(&request).await?;
        match response.status {
            401 | 403 => return Err(AuthError::InvalidCredentials),
            status if !response.is_success() => {
                return Err(status_to_error(status, &response.text()).into());
            }
            _ => {}
        }
        let pair: TokenPair = serde_json::from_slice(&response.body)?;
        if pair.access_token.is_empty() {
            return Err(AuthError::InvalidResponse(
                "sign-in response carried an empty access token".to_string(),
            ));
        }
        let credential = Credential::new(pair.access_token, pair.refresh_token);
        self.store.replace(Some(credential.clone()))?;
        Ok(credential)
    }
}
