//! JSON-over-HTTP with bounded retries, shared by every REST adapter.
//!
//! # Retry Strategy
//!
//! `max_retries` defaults to 0 in the config, i.e. one attempt per call.
//! When raised:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use serde_json::Value;
use std::time::Duration;

use crate::error::{RagError, Result};

/// Build a client with a whole-request timeout.
pub fn client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| RagError::Configuration(format!("failed to build HTTP client: {}", e)))
}

/// Send `request` and decode the JSON response body.
///
/// `wrap` turns a failure description into the caller's error variant. An
/// empty success body (e.g. `204 No Content`) decodes to `Value::Null`.
pub async fn send_json(
    request: reqwest::RequestBuilder,
    max_retries: u32,
    label: &str,
    wrap: fn(String) -> RagError,
) -> Result<Value> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            log::warn!(
                "retrying {} in {:?} (attempt {}/{})",
                label,
                delay,
                attempt + 1,
                max_retries + 1
            );
            tokio::time::sleep(delay).await;
        }

        let request = request
            .try_clone()
            .ok_or_else(|| wrap(format!("{}: request body cannot be retried", label)))?;

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let body = response
                        .bytes()
                        .await
                        .map_err(|e| wrap(format!("{}: failed to read response: {}", label, e)))?;
                    if body.is_empty() {
                        return Ok(Value::Null);
                    }
                    return serde_json::from_slice(&body)
                        .map_err(|e| wrap(format!("{}: invalid JSON response: {}", label, e)));
                }

                let body_text = response.text().await.unwrap_or_default();
                let err = wrap(format!("{}: HTTP {}: {}", label, status, body_text));
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(err);
                    continue;
                }
                return Err(err);
            }
            Err(e) => {
                last_err = Some(wrap(format!("{}: request failed: {}", label, e)));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| wrap(format!("{}: failed after retries", label))))
}
