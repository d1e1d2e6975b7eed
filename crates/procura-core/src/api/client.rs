//! API client for the Procura backend's auth endpoints.
//!
//! This module provides the `AuthApi` trait - the seam the session
//! controller talks through - and the reqwest-backed `ApiClient`
//! implementation. Keeping the controller behind the trait keeps it
//! free of transport concerns and lets tests substitute a mock.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::models::{Credentials, UserRecord};

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Response envelope for the login endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default)]
    pub user: Option<UserRecord>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response envelope for the token verification endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<VerifyData>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyData {
    pub user: UserRecord,
}

/// The auth collaborators consumed by the session controller.
///
/// Futures are `Send` so the controller's session-timer task can call
/// back through the API from a spawned task.
pub trait AuthApi: Send + Sync + 'static {
    /// Exchange credentials for a user record and bearer token.
    fn login(&self, credentials: &Credentials)
        -> impl Future<Output = Result<LoginResponse>> + Send;

    /// Ask the backend whether a stored token is still valid.
    fn verify_token(&self, token: &str) -> impl Future<Output = Result<VerifyResponse>> + Send;

    /// Invalidate the session server-side. Best-effort from the
    /// controller's perspective - failures never block local cleanup.
    fn logout(&self, token: Option<&str>) -> impl Future<Output = Result<()>> + Send;
}

/// API client for the Procura backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }
}

impl AuthApi for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        let url = self.url("/auth/login");
        debug!(url = %url, email = %credentials.email, "sending login request");

        let response = self
            .client
            .post(&url)
            .json(credentials)
            .send()
            .await
            .context("Failed to send login request")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read login response")?;

        // The backend reports rejected credentials in the envelope, with
        // a non-2xx status. Prefer the envelope's message when present.
        if let Ok(envelope) = serde_json::from_str::<LoginResponse>(&body) {
            return Ok(envelope);
        }

        if status.is_success() {
            Err(ApiError::InvalidResponse(format!("Unexpected login response: {}", body)).into())
        } else {
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn verify_token(&self, token: &str) -> Result<VerifyResponse> {
        let url = self.url("/auth/verify-token");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to send token verification request")?;

        let response = Self::check_response(response).await?;

        response
            .json()
            .await
            .context("Failed to parse token verification response")
    }

    async fn logout(&self, token: Option<&str>) -> Result<()> {
        let url = self.url("/auth/logout");

        let mut request = self.client.post(&url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("Failed to send logout request")?;
        Self::check_response(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("https://api.procura.example/api/").unwrap();
        assert_eq!(
            client.url("/auth/login"),
            "https://api.procura.example/api/auth/login"
        );
    }

    #[test]
    fn test_login_response_rejection_envelope() {
        let body = r#"{"success": false, "message": "Invalid credentials"}"#;
        let envelope: LoginResponse = serde_json::from_str(body).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.message.as_deref(), Some("Invalid credentials"));
        assert!(envelope.user.is_none());
        assert!(envelope.token.is_none());
    }

    #[test]
    fn test_verify_response_carries_user() {
        let body = r#"{
            "success": true,
            "data": {"user": {"id": 3, "email": "x@y.z", "role": "buyer"}}
        }"#;
        let envelope: VerifyResponse = serde_json::from_str(body).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.data.unwrap().user.id, 3);
    }
}
