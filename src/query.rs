//! Query pipeline: question → embedding → hybrid retrieval → grounded
//! prompt → completion.
//!
//! [`answer`] is a function of the conversation history and the injected
//! collaborators. It never mutates the history; on success it hands back the
//! assistant turn for the caller to append.

use crate::completion::Completer;
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::index::{HybridQuery, SearchIndex};
use crate::models::{ConversationHistory, ConversationTurn, RetrievedSource};
use crate::prompt;

/// Retrieval parameters for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub top_k: usize,
    /// Projection, record id first, record text second.
    pub fields: Vec<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            fields: vec!["id".to_string(), "content".to_string()],
        }
    }
}

impl From<&crate::config::SearchConfig> for QueryOptions {
    fn from(config: &crate::config::SearchConfig) -> Self {
        Self {
            top_k: config.top_k,
            fields: config.selected_fields(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// Completion text, verbatim.
    pub answer: String,
    /// Sources the prompt was grounded on, in retrieval order.
    pub sources: Vec<RetrievedSource>,
    /// The assistant turn to append to the history.
    pub turn: ConversationTurn,
}

/// Answer the latest user turn in `history`.
///
/// Steps run strictly in order and the first failure is returned unchanged.
///
/// # Errors
///
/// [`RagError::EmptyHistory`] when there is no user turn, otherwise the
/// error of whichever collaborator failed.
pub async fn answer(
    history: &ConversationHistory,
    embedder: &dyn Embedder,
    index: &dyn SearchIndex,
    completer: &dyn Completer,
    options: &QueryOptions,
) -> Result<QueryOutcome> {
    let question = history
        .latest_user_content()
        .ok_or(RagError::EmptyHistory)?;

    let vector = embedder.embed(question).await?;

    let query = HybridQuery {
        text: question.to_string(),
        vector,
        top_k: options.top_k,
        fields: options.fields.clone(),
    };
    let sources = index.query(&query).await?;
    log::info!("retrieved {} sources", sources.len());

    let messages = prompt::build_messages(question, &sources);
    let answer = completer.complete(&messages).await?;

    Ok(QueryOutcome {
        turn: ConversationTurn::assistant(answer.clone()),
        answer,
        sources,
    })
}
