//! Error taxonomy for the retrieval pipeline.
//!
//! Every failure the core can produce is a typed value the caller can
//! branch on. None of them is fatal to a session: an ingest failure leaves
//! the previous index in place, and answer-time failures are folded into
//! the [`Answer`](crate::answer::Answer) itself.

use thiserror::Error;

/// A document produced no usable text.
///
/// Recoverable: the caller can drop the offending document and ingest the
/// rest of the file set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The document could not be opened or parsed at all.
    #[error("Error extracting text from {filename}: {reason}")]
    Unreadable { filename: String, reason: String },

    /// Every page raised an error during extraction.
    #[error("Error extracting text from {filename}: all {pages} page(s) failed")]
    AllPagesFailed { filename: String, pages: usize },

    /// Extraction succeeded but yielded only whitespace.
    #[error("No text could be extracted from {filename}")]
    NoText { filename: String },
}

impl ExtractionError {
    pub fn filename(&self) -> &str {
        match self {
            ExtractionError::Unreadable { filename, .. }
            | ExtractionError::AllPagesFailed { filename, .. }
            | ExtractionError::NoText { filename } => filename,
        }
    }
}

/// The embedding backend could not be created or loaded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Error initializing embeddings ({model}): {reason}")]
pub struct EmbeddingInitError {
    pub model: String,
    pub reason: String,
}

/// A single embedding call failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error("embedding backend failed: {0}")]
    Backend(String),

    #[error("embedding has {actual} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding backend returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },
}

/// An index was requested over zero passages.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("no passages to index: the documents contain no extractable text")]
pub struct EmptyIndexError;

/// Failure while building a [`VectorIndex`](crate::index::VectorIndex).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error(transparent)]
    Empty(#[from] EmptyIndexError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Failure of the generation backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The API key variable is unset; detected when the backend is created.
    #[error("{0} not found in environment variables")]
    MissingApiKey(String),

    #[error("unknown generation provider: {0}")]
    UnknownProvider(String),

    #[error("request to generation backend failed: {0}")]
    Transport(String),

    #[error("generation backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response from generation backend: {0}")]
    Malformed(String),
}

/// Failure of [`ingest`](crate::ingest::ingest).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("duplicate document name in upload: {0}")]
    DuplicateDocument(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    EmptyIndex(#[from] EmptyIndexError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

impl From<IndexError> for IngestError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Empty(e) => IngestError::EmptyIndex(e),
            IndexError::Embedding(e) => IngestError::Embedding(e),
        }
    }
}

/// Misuse of a [`Session`](crate::session::Session).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("no documents have been indexed in this session")]
    NoIndex,
}
