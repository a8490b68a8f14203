//! In-memory [`SearchIndex`] for tests.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`. Queries rank records
//! twice, once by lexical term matches and once by brute-force cosine
//! similarity, and fuse the two rankings by reciprocal rank.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::{RagError, Result};
use crate::models::{IndexRecord, RetrievedSource};

use super::{HybridQuery, SearchIndex};

/// Rank offset in `1 / (k + rank)`.
const RRF_K: f64 = 60.0;

#[derive(Debug, Default)]
pub struct InMemoryIndex {
    records: RwLock<Vec<IndexRecord>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record, in insertion order.
    pub fn records(&self) -> Vec<IndexRecord> {
        self.records
            .read()
            .map(|r| r.to_vec())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<IndexRecord> {
        self.records
            .read()
            .ok()?
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }
}

fn poisoned<T>(_: T) -> RagError {
    RagError::Index("in-memory index lock poisoned".to_string())
}

/// Number of whitespace-separated query terms contained in `text`.
///
/// A query with no whitespace (typical for Japanese) is one term.
fn lexical_score(terms: &[String], text: &str) -> usize {
    let text_lower = text.to_lowercase();
    terms
        .iter()
        .filter(|t| text_lower.contains(t.as_str()))
        .count()
}

/// Indices of `scores` with a positive score, best first, ties by position.
fn ranking(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).filter(|&i| scores[i] > 0.0).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    order
}

#[async_trait]
impl SearchIndex for InMemoryIndex {
    async fn upsert(&self, record: &IndexRecord) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    async fn query(&self, query: &HybridQuery) -> Result<Vec<RetrievedSource>> {
        let records = self.records.read().map_err(poisoned)?;
        let terms: Vec<String> = query
            .text
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let lexical: Vec<f64> = records
            .iter()
            .map(|r| lexical_score(&terms, &r.text) as f64)
            .collect();
        let semantic: Vec<f64> = records
            .iter()
            .map(|r| cosine_similarity(&query.vector, &r.vector) as f64)
            .collect();

        let mut fused: HashMap<usize, f64> = HashMap::new();
        for order in [ranking(&lexical), ranking(&semantic)] {
            for (rank, idx) in order.into_iter().enumerate() {
                *fused.entry(idx).or_insert(0.0) += 1.0 / (RRF_K + rank as f64 + 1.0);
            }
        }

        let mut hits: Vec<(usize, f64)> = fused.into_iter().collect();
        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        hits.truncate(query.top_k);

        Ok(hits
            .into_iter()
            .map(|(idx, score)| RetrievedSource {
                id: records[idx].id.clone(),
                text: records[idx].text.clone(),
                score: Some(score),
            })
            .collect())
    }
}
