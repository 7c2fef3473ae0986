//! WebhookResponder - HTTP implementation of the responder boundary.
//!
//! Posts each outgoing message to a configured workflow endpoint and maps
//! the JSON reply back into the core types. Transport failures, non-2xx
//! statuses, and contract-violating bodies all surface as errors; the
//! dispatcher turns them into a failed dispatch.
//!
//! Configuration priority: explicit configuration > environment variables

use async_trait::async_trait;
use muse_core::config::ResponderConfig;
use muse_core::error::{MuseError, Result};
use muse_core::responder::{Responder, ResponderReply, ResponderRequest};
use reqwest::Client;
use std::env;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Responder implementation that talks to an HTTP workflow endpoint.
#[derive(Debug, Clone)]
pub struct WebhookResponder {
    client: Client,
    endpoint: String,
    auth_token: Option<String>,
    timeout: Duration,
}

impl WebhookResponder {
    /// Creates a new responder posting to the given endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            auth_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Builds a responder from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error when the configuration carries no
    /// endpoint URL.
    pub fn from_config(config: &ResponderConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| MuseError::config("responder endpoint is not configured"))?;

        let mut responder = Self::new(endpoint).with_timeout(config.timeout());
        if let Some(token) = &config.auth_token {
            responder = responder.with_auth_token(token);
        }
        Ok(responder)
    }

    /// Loads configuration from environment variables.
    ///
    /// Reads `MUSE_RESPONDER_URL` (required), `MUSE_RESPONDER_TOKEN` and
    /// `MUSE_RESPONDER_TIMEOUT_SECS` (optional).
    pub fn try_from_env() -> Result<Self> {
        let endpoint = env::var("MUSE_RESPONDER_URL").map_err(|_| {
            MuseError::config("MUSE_RESPONDER_URL not found in environment variables")
        })?;

        let mut responder = Self::new(endpoint);

        if let Ok(token) = env::var("MUSE_RESPONDER_TOKEN") {
            responder = responder.with_auth_token(token);
        }

        if let Ok(secs) = env::var("MUSE_RESPONDER_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                MuseError::config("MUSE_RESPONDER_TIMEOUT_SECS must be an integer")
            })?;
            responder = responder.with_timeout(Duration::from_secs(secs));
        }

        Ok(responder)
    }

    /// Sets the bearer token attached to each request.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Responder for WebhookResponder {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn respond(&self, request: ResponderRequest) -> Result<ResponderReply> {
        tracing::debug!(target: "responder", "POST {}", self.endpoint);

        let mut http_request = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .timeout(self.timeout);

        if let Some(token) = &self.auth_token {
            http_request = http_request.header("Authorization", format!("Bearer {}", token));
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| MuseError::transport(format!("request to responder failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MuseError::transport(format!(
                "responder endpoint error ({}): {}",
                status, error_text
            )));
        }

        let body = response.text().await.map_err(|e| {
            MuseError::transport(format!("failed to read responder body: {}", e))
        })?;

        ResponderReply::from_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_endpoint() {
        let config = ResponderConfig::default();
        let err = WebhookResponder::from_config(&config).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_from_config_applies_settings() {
        let config = ResponderConfig {
            endpoint: Some("https://hooks.example.com/assistant".to_string()),
            auth_token: Some("secret".to_string()),
            timeout_secs: 5,
        };

        let responder = WebhookResponder::from_config(&config).unwrap();
        assert_eq!(responder.endpoint(), "https://hooks.example.com/assistant");
        assert_eq!(responder.auth_token.as_deref(), Some("secret"));
        assert_eq!(responder.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_builders_override_defaults() {
        let responder = WebhookResponder::new("https://x.test/hook")
            .with_auth_token("token")
            .with_timeout(Duration::from_secs(3));

        assert_eq!(responder.timeout, Duration::from_secs(3));
        assert_eq!(responder.auth_token.as_deref(), Some("token"));
        assert_eq!(responder.name(), "webhook");
    }
}
