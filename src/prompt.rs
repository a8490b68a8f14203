//! Grounded prompt assembly.
//!
//! Turns a question and the retriever's ranked sources into the exact
//! message list sent to the completion service: one fixed system message
//! carrying the grounding policy, and one user message holding the question
//! followed by a `Sources:` section.

use crate::models::{ConversationTurn, RetrievedSource};

/// Reply the model is told to give when the sources cannot answer the question.
pub const FALLBACK_ANSWER: &str = "すみません。わかりません。";

/// Written in place of the source list when retrieval returned nothing.
pub const NO_SOURCES_MARKER: &str = "(no sources found)";

pub const SOURCES_HEADING: &str = "Sources:";

/// Persona and grounding policy. Answers come only from the `Sources:`
/// section, stay short, and fall back to [`FALLBACK_ANSWER`].
pub const SYSTEM_PROMPT: &str = "あなたはユーザーの質問に回答するチャットボットです。
回答については、「Sources:」以下に記載されている内容に基づいて回答してください。回答は簡潔にしてください。
「Sources:」に記載されている情報以外の回答はしないでください。
情報が複数ある場合は「Sources:」のあとに[Source0]、[Source1]、[Source2]のように、渡された順に記載されますので、それに基づいて回答してください。
ユーザーの質問に対して、Sources:以下に記載されている内容に基づいて適切な回答ができない場合は、「すみません。わかりません。」とだけ回答してください。";

/// Build the `[system, user]` message pair for one question.
///
/// Sources are emitted in the order given; ranking belongs to the index.
pub fn build_messages(question: &str, sources: &[RetrievedSource]) -> Vec<ConversationTurn> {
    vec![
        ConversationTurn::system(SYSTEM_PROMPT),
        ConversationTurn::user(user_message(question, sources)),
    ]
}

/// `question`, a blank line, the `Sources:` heading, then one
/// `[Source<id>]: <text>` line per source.
pub fn user_message(question: &str, sources: &[RetrievedSource]) -> String {
    let body = if sources.is_empty() {
        NO_SOURCES_MARKER.to_string()
    } else {
        sources
            .iter()
            .map(format_source)
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!("{}\n\n{}\n{}", question, SOURCES_HEADING, body)
}

fn format_source(source: &RetrievedSource) -> String {
    format!("[Source{}]: {}", source.id, source.text)
}
