//! `ragchat ask` and `ragchat chat`.
//!
//! The interactive shell owns the [`ConversationHistory`]. Each line read is
//! appended as a user turn and answered by the query pipeline. A failed turn
//! is reported and dropped, so the history only ever holds answered
//! questions. A line that cannot be decoded counts as a failed turn.

use anyhow::Result;
use std::io::{BufRead, Write};

use crate::completion::{Completer, OpenAiCompleter};
use crate::config::Config;
use crate::embedding::{Embedder, OpenAiEmbedder};
use crate::index::azure::AzureSearchIndex;
use crate::index::SearchIndex;
use crate::models::{ConversationHistory, ConversationTurn};
use crate::query::{self, QueryOptions};

/// Shown in place of an answer when a turn fails.
pub const ANSWER_FAILED: &str = "error: could not generate an answer";

const EXIT_COMMAND: &str = "/exit";

/// Collaborators for one chat session.
pub struct ChatSession<'a> {
    pub embedder: &'a dyn Embedder,
    pub index: &'a dyn SearchIndex,
    pub completer: &'a dyn Completer,
    pub options: QueryOptions,
    /// Print a `> ` prompt before each read.
    pub prompt: bool,
}

impl ChatSession<'_> {
    /// Read questions from `input` until EOF or `/exit`, writing answers to
    /// `output`. Returns the final history.
    pub async fn run<R: BufRead, W: Write>(
        &self,
        input: R,
        mut output: W,
    ) -> Result<ConversationHistory> {
        let mut history = ConversationHistory::new();
        let mut lines = input.lines();

        loop {
            if self.prompt {
                write!(output, "> ")?;
                output.flush()?;
            }
            let line = match lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    log::warn!("unreadable input line: {}", e);
                    writeln!(output, "{}: {}", ANSWER_FAILED, e)?;
                    continue;
                }
                None => break,
            };
            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if question == EXIT_COMMAND {
                break;
            }

            let mut pending = history.clone();
            pending.push(ConversationTurn::user(question));
            let result = query::answer(
                &pending,
                self.embedder,
                self.index,
                self.completer,
                &self.options,
            )
            .await;
            match result {
                Ok(outcome) => {
                    writeln!(output, "{}", outcome.answer)?;
                    pending.push(outcome.turn);
                    history = pending;
                }
                Err(e) => {
                    log::error!("turn failed: {}", e);
                    writeln!(output, "{}: {}", ANSWER_FAILED, e)?;
                }
            }
        }

        Ok(history)
    }
}

/// `ragchat ask`: answer a single question and print the reply.
pub async fn run_ask(config: &Config, question: &str, show_sources: bool) -> Result<()> {
    let embedder = OpenAiEmbedder::new(&config.openai)?;
    let completer = OpenAiCompleter::new(&config.openai)?;
    let index = AzureSearchIndex::new(&config.search)?;

    let history = ConversationHistory::from(vec![ConversationTurn::user(question)]);
    let outcome = query::answer(
        &history,
        &embedder,
        &index,
        &completer,
        &QueryOptions::from(&config.search),
    )
    .await?;

    println!("{}", outcome.answer);
    if show_sources {
        println!();
        for source in &outcome.sources {
            let preview: String = source.text.chars().take(80).collect();
            match source.score {
                Some(score) => println!("[Source{}] ({:.4}) {}", source.id, score, preview),
                None => println!("[Source{}] {}", source.id, preview),
            }
        }
    }
    Ok(())
}

/// `ragchat chat`: interactive shell over stdin/stdout.
pub async fn run_chat(config: &Config) -> Result<()> {
    let embedder = OpenAiEmbedder::new(&config.openai)?;
    let completer = OpenAiCompleter::new(&config.openai)?;
    let index = AzureSearchIndex::new(&config.search)?;

    let session = ChatSession {
        embedder: &embedder,
        index: &index,
        completer: &completer,
        options: QueryOptions::from(&config.search),
        prompt: atty::is(atty::Stream::Stdin),
    };

    let stdin = std::io::stdin();
    let history = session.run(stdin.lock(), std::io::stdout()).await?;
    log::info!("chat ended after {} turns", history.len());
    Ok(())
}
