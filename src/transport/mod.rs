//! Authenticated HTTP execution.
//!
//! [`Transport::execute`] attaches the stored credential, and when the server
//! answers 401 asks the [`TokenAuthority`] for a fresh one and retries the call
//! exactly once.

pub mod http;
pub mod request;

pub use http::ReqwestBackend;
pub use request::{HttpRequest, HttpResponse};
pub use reqwest::Method;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::TokenAuthority;
use crate::error::SessionError;
use crate::util::timeout::with_timeout;

/// Sends one request over the wire, without any credential handling.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, SessionError>;
}

/// Executes calls with credential attachment and at most one retry after a
/// successful refresh.
pub struct Transport {
    backend: Arc<dyn HttpBackend>,
    authority: Arc<TokenAuthority>,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl Transport {
    pub fn new(backend: Arc<dyn HttpBackend>, authority: Arc<TokenAuthority>) -> Self {
        Self {
            backend,
            authority,
            base_url: None,
            timeout: None,
        }
    }

    /// Base URL that relative paths resolve against.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Deadline applied to each attempt (initial call and retry separately).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn authority(&self) -> &Arc<TokenAuthority> {
        &self.authority
    }

    /// Resolve `path` against the base URL. Absolute URLs pass through.
    pub fn url(&self, path: &str) -> Result<String, SessionError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(path.to_string());
        }
        let base = self.base_url.as_deref().ok_or_else(|| {
            SessionError::Configuration(format!("no base URL configured for path {path}"))
        })?;
        Ok(join_url(base, path))
    }

    /// Execute one logical call.
    ///
    /// Non-2xx responses come back as typed errors; a 401 after the single
    /// retry (or with no refresh possible) is `Unauthenticated`.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, SessionError> {
        let attached = self.authority.attach(request);
        let response = self.send(&attached).await?;
        if !response.is_unauthorized() || attached.is_refresh() {
            return into_result(response);
        }

        let Some(credential) = self.authority.on_unauthorized(&attached).await else {
            return Err(SessionError::Unauthenticated(
                "session expired; sign in again".to_string(),
            ));
        };

        tracing::debug!(
            method = %attached.method,
            url = %attached.url,
            "retrying after credential refresh"
        );
        let retry = attached.with_bearer(credential.access_token())?;
        let response = self.send(&retry).await?;
        into_result(response)
    }

    /// `GET path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SessionError> {
        let request = HttpRequest::get(self.url(path)?);
        self.execute(request).await?.json()
    }

    /// Send `body` as JSON with `method` and decode the JSON response.
    pub async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, SessionError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = HttpRequest::new(method, self.url(path)?).json(body)?;
        self.execute(request).await?.json()
    }

    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, SessionError> {
        match self.timeout {
            Some(deadline) => with_timeout(deadline, self.backend.send(request)).await,
            None => self.backend.send(request).await,
        }
    }
}

/// Join a base URL and a relative path with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn into_result(response: HttpResponse) -> Result<HttpResponse, SessionError> {
    if response.is_success() {
        return Ok(response);
    }
    Err(http::status_to_error(response.status, &response.text()))
}
