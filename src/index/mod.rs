//! Search index abstraction.
//!
//! The [`SearchIndex`] trait is everything the drivers need from a search
//! backend: persist one [`IndexRecord`] and run one hybrid query. Ranking is
//! the backend's business; callers treat the returned order as final.
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`azure::AzureSearchIndex`] | Azure AI Search over REST |
//! | [`memory::InMemoryIndex`] | process-local, for tests |

pub mod azure;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{IndexRecord, RetrievedSource};

/// One hybrid (lexical + vector) query.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridQuery {
    /// Raw question text for the lexical side.
    pub text: String,
    /// Embedding of `text` for the vector side.
    pub vector: Vec<f32>,
    pub top_k: usize,
    /// Fields to project, record id first, record text second. Empty means
    /// the index's configured fields.
    pub fields: Vec<String>,
}

/// A store of index records supporting hybrid retrieval.
///
/// Failures surface as [`RagError::Index`](crate::error::RagError::Index).
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Insert or replace the record with `record.id`.
    async fn upsert(&self, record: &IndexRecord) -> Result<()>;

    /// Return at most `query.top_k` records, best first.
    async fn query(&self, query: &HybridQuery) -> Result<Vec<RetrievedSource>>;
}
