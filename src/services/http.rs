// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared HTTP plumbing: timeouts, retry with backoff, status and body checks.

use crate::config::Config;
use crate::error::{AppError, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Timeout and retry policy applied to every backend call.
#[derive(Debug, Clone)]
pub struct HttpPolicy {
    pub timeout: Duration,
    /// Retries after the first attempt (idempotent requests only).
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for HttpPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_retries: 2,
            base_backoff: Duration::from_millis(250),
        }
    }
}

impl HttpPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.http_timeout,
            max_retries: config.http_max_retries,
            ..Self::default()
        }
    }

    /// Build a reqwest client that enforces the request timeout.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))
    }

    /// Delay before retry number `attempt` (0-based): base * 2^attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Send a request, retrying transient failures when `idempotent` is set.
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed
/// by `send`. Returns the response only if its status is 2xx.
pub(crate) async fn execute<F>(
    policy: &HttpPolicy,
    idempotent: bool,
    label: &'static str,
    build: F,
) -> Result<reqwest::Response>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        let result = match build().send().await {
            Ok(response) => check_response(response).await,
            Err(e) => Err(AppError::from_transport(e)),
        };

        match result {
            Ok(response) => return Ok(response),
            Err(e) if idempotent && e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    request = label,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Request failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::debug!(request = label, error = %e, "Request failed");
                return Err(e);
            }
        }
    }
}

/// Check response status and return error if not successful.
pub(crate) async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(AppError::Unauthorized);
    }

    if status.as_u16() == 429 {
        tracing::warn!("Backend rate limit hit (429)");
    }

    let body = response.text().await.unwrap_or_default();
    Err(AppError::BadStatus {
        status: status.as_u16(),
        body,
    })
}

/// Read the whole body and decode it strictly.
///
/// Reading the body can still fail at the transport level, which is
/// reported as `Network`; only a schema mismatch is `Decode`.
pub(crate) async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::Network(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| AppError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = HttpPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(250));
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1000));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(AppError::Network("reset".into()).is_retryable());
        assert!(AppError::BadStatus { status: 503, body: String::new() }.is_retryable());
        assert!(AppError::BadStatus { status: 429, body: String::new() }.is_retryable());
        assert!(!AppError::BadStatus { status: 404, body: String::new() }.is_retryable());
        assert!(!AppError::Unauthorized.is_retryable());
        assert!(!AppError::Decode("bad".into()).is_retryable());
    }
}
