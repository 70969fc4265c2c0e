//! `reqwest`-backed HTTP backend and status classification.

use std::time::Duration;

use async_trait::async_trait;

use super::request::{HttpRequest, HttpResponse};
use super::HttpBackend;
use crate::error::SessionError;

/// Sends requests with a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    /// Build a backend whose client enforces `timeout` per request.
    pub fn new(timeout: Duration) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, SessionError> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Typed failure for a non-2xx response.
pub fn status_to_error(status: u16, body: &str) -> SessionError {
    let message = if body.trim().is_empty() {
        format!("request failed with status {status}")
    } else {
        body.trim().to_string()
    };
    match status {
        401 => SessionError::Unauthenticated(message),
        _ => SessionError::http(status, message),
    }
}

/// Parse the refresh endpoint's body: a bare access token, optionally JSON-quoted.
pub fn parse_bare_token(body: &str) -> Option<String> {
    let trimmed = body.trim();
    let token = if trimmed.starts_with('"') {
        serde_json::from_str::<String>(trimmed).ok()?
    } else {
        trimmed.to_string()
    };
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return None;
    }
    Some(token)
}
