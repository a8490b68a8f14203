//! OpenAI-compatible API client shared by the embedding and chat adapters.
//!
//! Both Azure OpenAI and the public OpenAI API accept the same JSON bodies;
//! they differ in URL shape and auth header:
//!
//! | Provider | URL | Auth |
//! |----------|-----|------|
//! | `azure` | `{endpoint}/openai/deployments/{deployment}/{op}?api-version={v}` | `api-key: …` |
//! | `openai` | `{endpoint or https://api.openai.com/v1}/{op}` with `"model": deployment` | `Authorization: Bearer …` |
//!
//! Retries and backoff are handled by `http::send_json`.

use serde_json::Value;

use crate::config::{OpenAiConfig, Provider};
use crate::error::{RagError, Result};
use crate::http;

const OPENAI_DEFAULT_BASE: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    provider: Provider,
    base_url: String,
    api_key: String,
    api_version: String,
    max_retries: u32,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Build a client from the `[openai]` section.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if the API key was not resolved or
    /// an Azure endpoint is missing.
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| RagError::Configuration("openai.api_key not resolved".to_string()))?;
        let base_url = match (config.provider, config.endpoint.as_deref()) {
            (_, Some(endpoint)) => endpoint.trim_end_matches('/').to_string(),
            (Provider::OpenAi, None) => OPENAI_DEFAULT_BASE.to_string(),
            (Provider::Azure, None) => {
                return Err(RagError::Configuration(
                    "openai.endpoint is required when provider is 'azure'".to_string(),
                ))
            }
        };
        let http = http::client(config.timeout_secs)?;

        Ok(Self {
            http,
            provider: config.provider,
            base_url,
            api_key,
            api_version: config.api_version.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Endpoint URL for `operation` (`"embeddings"`, `"chat/completions"`).
    pub fn url(&self, deployment: &str, operation: &str) -> String {
        match self.provider {
            Provider::Azure => format!(
                "{}/openai/deployments/{}/{}?api-version={}",
                self.base_url, deployment, operation, self.api_version
            ),
            Provider::OpenAi => format!("{}/{}", self.base_url, operation),
        }
    }

    /// POST `body` to `operation` and return the decoded JSON response.
    ///
    /// `wrap` turns a failure description into the caller's error variant.
    pub async fn post_json(
        &self,
        deployment: &str,
        operation: &str,
        mut body: Value,
        wrap: fn(String) -> RagError,
    ) -> Result<Value> {
        if self.provider == Provider::OpenAi {
            if let Some(obj) = body.as_object_mut() {
                obj.insert("model".to_string(), Value::String(deployment.to_string()));
            }
        }
        let url = self.url(deployment, operation);
        log::debug!("POST {}", url);

        let request = match self.provider {
            Provider::Azure => self.http.post(&url).header("api-key", &self.api_key),
            Provider::OpenAi => self.http.post(&url).bearer_auth(&self.api_key),
        };
        http::send_json(request.json(&body), self.max_retries, operation, wrap).await
    }
}
