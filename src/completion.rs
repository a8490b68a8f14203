//! Chat completion.
//!
//! [`Completer`] takes the assembled `[system, user]` message list and
//! returns the model's reply text. [`OpenAiCompleter`] is the HTTP
//! implementation.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::OpenAiConfig;
use crate::error::{RagError, Result};
use crate::models::ConversationTurn;
use crate::openai::OpenAiClient;

#[async_trait]
pub trait Completer: Send + Sync {
    /// Generate a reply. Failures surface as [`RagError::Completion`].
    async fn complete(&self, messages: &[ConversationTurn]) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct OpenAiCompleter {
    client: OpenAiClient,
    deployment: String,
}

impl OpenAiCompleter {
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        Ok(Self {
            client: OpenAiClient::new(config)?,
            deployment: config.chat_deployment.clone(),
        })
    }
}

#[async_trait]
impl Completer for OpenAiCompleter {
    async fn complete(&self, messages: &[ConversationTurn]) -> Result<String> {
        log::debug!("requesting completion for {} messages", messages.len());
        let response = self
            .client
            .post_json(
                &self.deployment,
                "chat/completions",
                json!({ "messages": messages }),
                RagError::Completion,
            )
            .await?;
        parse_completion_response(&response)
    }
}

/// Extract `choices[0].message.content`.
pub fn parse_completion_response(json: &Value) -> Result<String> {
    let choice = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| RagError::Completion("invalid chat response: no choices".into()))?;

    if choice.get("finish_reason").and_then(|r| r.as_str()) == Some("content_filter") {
        return Err(RagError::Completion(
            "response was blocked by the content filter".into(),
        ));
    }

    choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| RagError::Completion("invalid chat response: missing message content".into()))
}
