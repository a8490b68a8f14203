//! Text embedding.
//!
//! [`Embedder`] is the seam the indexing and query drivers depend on: one
//! text in, one vector out. [`OpenAiEmbedder`] implements it against the
//! embeddings endpoint of Azure OpenAI or the public OpenAI API.
//!
//! Vectors from the same embedder always have the same length; the index
//! schema is created with that length (`ragchat init-index --dims N`).

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::OpenAiConfig;
use crate::error::{RagError, Result};
use crate::openai::OpenAiClient;

/// Produces a fixed-length vector for a piece of text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `text`. Failures surface as [`RagError::Embedding`].
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Embeddings via the OpenAI HTTP API.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    deployment: String,
}

impl OpenAiEmbedder {
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        Ok(Self {
            client: OpenAiClient::new(config)?,
            deployment: config.embedding_deployment.clone(),
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post_json(
                &self.deployment,
                "embeddings",
                json!({ "input": text }),
                RagError::Embedding,
            )
            .await?;
        parse_embedding_response(&response)
    }
}

/// Extract `data[0].embedding` from an embeddings API response.
pub fn parse_embedding_response(json: &Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|data| data.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            RagError::Embedding("invalid embeddings response: missing data[0].embedding".into())
        })?;

    if embedding.is_empty() {
        return Err(RagError::Embedding(
            "invalid embeddings response: empty vector".into(),
        ));
    }

    embedding
        .iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                RagError::Embedding(format!("invalid embeddings response: non-numeric {}", v))
            })
        })
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors or vectors
/// of different lengths.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
