//! Error taxonomy shared by the pipelines and their collaborators.
//!
//! Every external collaborator reports failures through its own variant so
//! callers can tell an embedding outage from a search outage. The drivers
//! never retry or swallow these errors: the first failure aborts the
//! remainder of the driver's sequence and is returned to the caller.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    /// Missing or invalid settings. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The document could not be read or parsed.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The embedding service failed or returned an unusable response.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The search index rejected an upsert or query.
    #[error("search index error: {0}")]
    Index(String),

    /// The completion service failed or returned no choices.
    #[error("completion failed: {0}")]
    Completion(String),

    /// The conversation history holds no user turn to answer.
    #[error("conversation history contains no user question")]
    EmptyHistory,
}

pub type Result<T> = std::result::Result<T, RagError>;
