//! Ingestion pipeline: documents → text → passages → index.
//!
//! [`ingest`] runs synchronously and is all-or-nothing: any document that
//! cannot be extracted fails the whole call and no index is produced.
//!
//! # Pipeline
//!
//! | Step | Failure |
//! |------|---------|
//! | Check filenames are unique | [`IngestError::DuplicateDocument`] |
//! | Extract each document page by page | [`IngestError::Extraction`] |
//! | Chunk each document's text | none |
//! | Embed and index every passage | [`IngestError::EmptyIndex`], [`IngestError::Embedding`] |

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::chunk::{chunk_text, ChunkOptions};
use crate::embedding::EmbeddingProvider;
use crate::error::IngestError;
use crate::extract::{extract, TextExtractor};
use crate::index::{VectorIndex, DEFAULT_BATCH_SIZE};
use crate::models::SourceDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    pub chunking: ChunkOptions,
    /// Passages per embedding call.
    pub batch_size: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunking: ChunkOptions::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// A single progress event during ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    /// Starting on document `n` of `total`.
    Extracting { filename: String, n: usize, total: usize },
    /// Document was cut into `passages` passages.
    Chunked { filename: String, passages: usize },
    /// All documents are chunked; embedding `passages` passages.
    Embedding { passages: usize },
}

/// Receives [`IngestEvent`]s. Called on the ingesting thread.
pub trait IngestProgress: Send + Sync {
    fn report(&self, event: IngestEvent);
}

/// Reporter that discards every event.
pub struct NoProgress;

impl IngestProgress for NoProgress {
    fn report(&self, _event: IngestEvent) {}
}

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub filename: String,
    pub passages: usize,
    pub page_count: usize,
    /// Pages whose text could not be extracted.
    pub skipped_pages: Vec<u32>,
}

#[derive(Debug)]
pub struct IngestReport {
    pub index: VectorIndex,
    /// One entry per document, in upload order.
    pub files: Vec<FileReport>,
}

impl IngestReport {
    pub fn total_passages(&self) -> usize {
        self.files.iter().map(|f| f.passages).sum()
    }
}

/// Build a fresh index from `documents`.
///
/// Passages are indexed in upload order, then by position within each
/// document, which is also the tie-break order for equal search scores.
pub fn ingest(
    extractor: &dyn TextExtractor,
    provider: Arc<dyn EmbeddingProvider>,
    documents: &[SourceDocument],
    options: &IngestOptions,
    progress: &dyn IngestProgress,
) -> Result<IngestReport, IngestError> {
    let mut seen = HashSet::new();
    for doc in documents {
        if !seen.insert(doc.filename.as_str()) {
            return Err(IngestError::DuplicateDocument(doc.filename.clone()));
        }
    }

    let total = documents.len();
    let mut passages = Vec::new();
    let mut files = Vec::with_capacity(total);

    for (i, doc) in documents.iter().enumerate() {
        progress.report(IngestEvent::Extracting {
            filename: doc.filename.clone(),
            n: i + 1,
            total,
        });

        let extracted = extract(extractor, doc)?;
        let chunks = chunk_text(&extracted.text, &doc.filename, &options.chunking);
        debug!(
            filename = %doc.filename,
            pages = extracted.page_count,
            passages = chunks.len(),
            "chunked document"
        );
        progress.report(IngestEvent::Chunked {
            filename: doc.filename.clone(),
            passages: chunks.len(),
        });

        files.push(FileReport {
            filename: doc.filename.clone(),
            passages: chunks.len(),
            page_count: extracted.page_count,
            skipped_pages: extracted.skipped_pages,
        });
        passages.extend(chunks);
    }

    progress.report(IngestEvent::Embedding {
        passages: passages.len(),
    });
    let index = VectorIndex::build(provider, passages, options.batch_size)?;

    info!(
        documents = files.len(),
        passages = index.len(),
        "ingested documents"
    );
    Ok(IngestReport { index, files })
}
