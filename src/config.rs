//! TOML configuration.
//!
//! The whole configuration is loaded once at startup by [`load_config`] and
//! passed by reference to whatever needs it. Credentials are never written
//! into the file by default: each service names the environment variable
//! holding its key (`api_key_env`), and the key is resolved while loading.
//! Anything missing or out of range is a [`RagError::Configuration`] before a
//! single request is sent.

use serde::Deserialize;
use std::path::Path;

use crate::chunk::{DEFAULT_MAX_CHARS, DEFAULT_OVERLAP_CHARS, DEFAULT_SEPARATORS};
use crate::error::{RagError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub search: SearchConfig,
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    pub endpoint: String,
    pub index_name: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_search_api_version")]
    pub api_version: String,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default = "default_content_field")]
    pub content_field: String,
    #[serde(default = "default_vector_field")]
    pub vector_field: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub semantic_configuration: Option<String>,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl SearchConfig {
    /// Fields projected out of every query: record id, then record text.
    pub fn selected_fields(&self) -> Vec<String> {
        vec![self.id_field.clone(), self.content_field.clone()]
    }
}

fn default_search_key_env() -> String {
    "SEARCH_SERVICE_API_KEY".to_string()
}
fn default_search_api_version() -> String {
    "2023-11-01".to_string()
}
fn default_id_field() -> String {
    "id".to_string()
}
fn default_content_field() -> String {
    "content".to_string()
}
fn default_vector_field() -> String {
    "contentVector".to_string()
}
fn default_top_k() -> usize {
    5
}
fn default_search_timeout_secs() -> u64 {
    30
}

/// Which flavour of the OpenAI HTTP API the embedding and chat calls target.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Azure OpenAI: per-deployment URLs and an `api-key` header.
    Azure,
    /// api.openai.com (or a compatible server): model names and a bearer token.
    OpenAi,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    #[serde(default = "default_provider")]
    pub provider: Provider,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_openai_api_version")]
    pub api_version: String,
    pub embedding_deployment: String,
    pub chat_deployment: String,
    #[serde(default = "default_openai_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

fn default_provider() -> Provider {
    Provider::Azure
}
fn default_openai_key_env() -> String {
    "AOAI_API_KEY".to_string()
}
fn default_openai_api_version() -> String {
    "2024-02-01".to_string()
}
fn default_openai_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            overlap_chars: DEFAULT_OVERLAP_CHARS,
            separators: default_separators(),
        }
    }
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}
fn default_overlap_chars() -> usize {
    DEFAULT_OVERLAP_CHARS
}
fn default_separators() -> Vec<String> {
    DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect()
}

/// Read, parse, and validate the config file, resolving credentials from
/// the process environment.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        RagError::Configuration(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_config(&content, |name| std::env::var(name).ok())
}

/// Parse and validate config text. `env` looks up environment variables.
pub fn parse_config<F>(content: &str, env: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: Config = toml::from_str(content)
        .map_err(|e| RagError::Configuration(format!("failed to parse config file: {}", e)))?;

    // Search
    require_url("search.endpoint", &config.search.endpoint)?;
    require_non_empty("search.index_name", &config.search.index_name)?;
    require_non_empty("search.id_field", &config.search.id_field)?;
    require_non_empty("search.content_field", &config.search.content_field)?;
    require_non_empty("search.vector_field", &config.search.vector_field)?;
    if config.search.top_k == 0 {
        return Err(RagError::Configuration(
            "search.top_k must be >= 1".to_string(),
        ));
    }
    if config.search.timeout_secs == 0 {
        return Err(RagError::Configuration(
            "search.timeout_secs must be >= 1".to_string(),
        ));
    }
    config.search.api_key = Some(resolve_api_key(
        "search",
        config.search.api_key.take(),
        &config.search.api_key_env,
        &env,
    )?);

    // OpenAI
    match (&config.openai.provider, &config.openai.endpoint) {
        (Provider::Azure, None) => {
            return Err(RagError::Configuration(
                "openai.endpoint is required when provider is 'azure'".to_string(),
            ))
        }
        (_, Some(endpoint)) => require_url("openai.endpoint", endpoint)?,
        (Provider::OpenAi, None) => {}
    }
    require_non_empty(
        "openai.embedding_deployment",
        &config.openai.embedding_deployment,
    )?;
    require_non_empty("openai.chat_deployment", &config.openai.chat_deployment)?;
    if config.openai.timeout_secs == 0 {
        return Err(RagError::Configuration(
            "openai.timeout_secs must be >= 1".to_string(),
        ));
    }
    config.openai.api_key = Some(resolve_api_key(
        "openai",
        config.openai.api_key.take(),
        &config.openai.api_key_env,
        &env,
    )?);

    // Chunking
    if config.chunking.max_chars == 0 {
        return Err(RagError::Configuration(
            "chunking.max_chars must be > 0".to_string(),
        ));
    }
    if config.chunking.overlap_chars >= config.chunking.max_chars {
        return Err(RagError::Configuration(
            "chunking.overlap_chars must be smaller than chunking.max_chars".to_string(),
        ));
    }

    Ok(config)
}

fn resolve_api_key<F>(
    section: &str,
    inline: Option<String>,
    env_name: &str,
    env: &F,
) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = inline.filter(|k| !k.trim().is_empty()) {
        return Ok(key);
    }
    env(env_name)
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            RagError::Configuration(format!(
                "{}.api_key not set and environment variable {} is empty or missing",
                section, env_name
            ))
        })
}

fn require_non_empty(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RagError::Configuration(format!("{} must not be empty", key)));
    }
    Ok(())
}

fn require_url(key: &str, value: &str) -> Result<()> {
    require_non_empty(key, value)?;
    if !(value.starts_with("https://") || value.starts_with("http://")) {
        return Err(RagError::Configuration(format!(
            "{} must be an http(s) URL, got '{}'",
            key, value
        )));
    }
    Ok(())
}
