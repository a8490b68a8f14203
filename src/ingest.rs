//! Indexing pipeline orchestration.
//!
//! Coordinates the offline flow: extraction → chunking → embedding → index
//! upsert. Chunks are processed one at a time in document order, and the
//! first failure stops the run: chunks before it stay persisted, chunks
//! after it are never embedded.

use anyhow::{Context, Result};
use std::path::Path;

use crate::chunk::TextSplitter;
use crate::config::Config;
use crate::embedding::{Embedder, OpenAiEmbedder};
use crate::error;
use crate::extract::{Extractor, FileExtractor};
use crate::index::azure::AzureSearchIndex;
use crate::index::SearchIndex;
use crate::models::{Chunk, IndexRecord};
use crate::progress::{IndexProgressEvent, ProgressMode, ProgressReporter};

/// Embed and upsert `chunks` in order, one record per chunk.
///
/// Returns the number of records written, which equals `chunks.len()` on
/// success.
///
/// # Errors
///
/// The first [`RagError::Embedding`](crate::error::RagError::Embedding) or
/// [`RagError::Index`](crate::error::RagError::Index) is returned as-is and
/// the remaining chunks are skipped.
pub async fn index_chunks(
    chunks: &[Chunk],
    embedder: &dyn Embedder,
    index: &dyn SearchIndex,
    progress: &dyn ProgressReporter,
) -> error::Result<usize> {
    let total = chunks.len() as u64;
    let mut written = 0usize;

    for chunk in chunks {
        let id = chunk.record_id();
        progress.report(IndexProgressEvent::Indexing {
            n: chunk.index as u64 + 1,
            total,
            id: id.clone(),
        });

        let vector = embedder.embed(&chunk.text).await?;
        log::debug!("chunk id={} embedded ({} dims)", id, vector.len());

        let record = IndexRecord {
            id,
            text: chunk.text.clone(),
            vector,
        };
        index.upsert(&record).await?;
        written += 1;
    }

    Ok(written)
}

/// Outcome of indexing one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub chunks: usize,
    pub written: usize,
}

/// Extract, split, and index the document at `path`.
///
/// An empty document produces zero chunks and writes nothing.
pub async fn index_document(
    path: &Path,
    extractor: &dyn Extractor,
    splitter: &TextSplitter,
    embedder: &dyn Embedder,
    index: &dyn SearchIndex,
    progress: &dyn ProgressReporter,
) -> error::Result<IndexReport> {
    let text = extractor.extract(path)?;
    let chunks = splitter.split(&text);
    log::info!(
        "{}: {} chars -> {} chunks",
        path.display(),
        text.chars().count(),
        chunks.len()
    );
    progress.report(IndexProgressEvent::Chunked {
        total: chunks.len() as u64,
    });

    let written = index_chunks(&chunks, embedder, index, progress).await?;
    Ok(IndexReport {
        chunks: chunks.len(),
        written,
    })
}

/// `ragchat index`: index one document into the configured search service.
pub async fn run_index(
    config: &Config,
    path: &Path,
    dry_run: bool,
    progress: ProgressMode,
) -> Result<()> {
    let splitter = TextSplitter::from_config(&config.chunking)?;

    if dry_run {
        let text = FileExtractor
            .extract(path)
            .with_context(|| format!("failed to extract {}", path.display()))?;
        let chunks = splitter.split(&text);
        let longest = chunks
            .iter()
            .map(|c| c.text.chars().count())
            .max()
            .unwrap_or(0);
        println!("index {} (dry-run)", path.display());
        println!("  characters: {}", text.chars().count());
        println!("  chunks: {}", chunks.len());
        println!("  longest chunk: {} chars", longest);
        return Ok(());
    }

    let embedder = OpenAiEmbedder::new(&config.openai)?;
    let index = AzureSearchIndex::new(&config.search)?;
    let reporter = progress.reporter();

    let report = index_document(
        path,
        &FileExtractor,
        &splitter,
        &embedder,
        &index,
        reporter.as_ref(),
    )
    .await
    .with_context(|| format!("indexing {} failed", path.display()))?;

    println!("index {}", path.display());
    if report.chunks == 0 {
        println!("  nothing to index (document is empty)");
    }
    println!("  chunks indexed: {}", report.written);
    println!("ok");
    Ok(())
}
