//! # Grounded Chat
//!
//! Retrieval-augmented question answering over a single document.
//!
//! An offline indexer extracts a document's text, splits it into overlapping
//! chunks, embeds each chunk, and upserts it into a hybrid (lexical + vector)
//! search index. An online query pipeline embeds the user's question,
//! retrieves the best-matching chunks, and asks a chat model to answer using
//! only those chunks.
//!
//! ## Architecture
//!
//! ```text
//! index:  Extractor ──▶ TextSplitter ──▶ Embedder ──▶ SearchIndex::upsert
//!
//! query:  history ──▶ Embedder ──▶ SearchIndex::query ──▶ prompt ──▶ Completer
//! ```
//!
//! The drivers ([`ingest::index_chunks`], [`query::answer`]) only see the
//! collaborator traits, so tests inject in-memory fakes.
//!
//! ## Quick Start
//!
//! ```bash
//! export SEARCH_SERVICE_API_KEY=... AOAI_API_KEY=...
//! ragchat init-index                  # create the search index schema
//! ragchat index ./handbook.pdf        # chunk, embed, upsert
//! ragchat ask "有給は何日取れますか？"
//! ragchat chat                        # interactive shell
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and credential resolution |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Chunks, records, sources, conversation turns |
//! | [`extract`] | PDF / DOCX / text extraction |
//! | [`chunk`] | Recursive overlapping text splitter |
//! | [`embedding`] | Embedding trait and OpenAI adapter |
//! | [`completion`] | Chat completion trait and OpenAI adapter |
//! | [`index`] | Search index trait, Azure AI Search and in-memory backends |
//! | [`prompt`] | Grounded prompt assembly |
//! | [`ingest`] | Indexing driver |
//! | [`query`] | Query driver |
//! | [`chat`] | One-shot and interactive front-ends |
//! | [`progress`] | Indexing progress reporting |

pub mod chat;
pub mod chunk;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
mod http;
pub mod index;
pub mod ingest;
pub mod models;
pub mod openai;
pub mod progress;
pub mod prompt;
pub mod query;
