//! Vector storage abstraction.
//!
//! The [`VectorStore`] trait is the seam between the index and whatever
//! holds the vectors. The only backend is [`memory::InMemoryStore`]: an
//! index lives for one session, so nothing is persisted.

pub mod memory;

use crate::error::EmbeddingError;
use crate::models::EmbeddedPassage;

/// A stored passage matched against a query vector.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'a> {
    pub entry: &'a EmbeddedPassage,
    /// Cosine similarity to the query; larger is closer.
    pub score: f32,
}

/// Storage backend for embedded passages.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert`](VectorStore::insert) | Add an embedded passage, enforcing dimensionality |
/// | [`nearest`](VectorStore::nearest) | Best-first k-nearest-neighbor query |
/// | [`len`](VectorStore::len) | Number of stored passages |
pub trait VectorStore: Send + Sync {
    /// Dimensionality every stored vector must have.
    fn dims(&self) -> usize;

    /// Number of stored passages.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store one embedded passage.
    ///
    /// Fails with [`EmbeddingError::DimensionMismatch`] when the vector
    /// length differs from [`dims`](VectorStore::dims).
    fn insert(&mut self, entry: EmbeddedPassage) -> Result<(), EmbeddingError>;

    /// Return up to `limit` passages ordered by descending similarity.
    ///
    /// Equal scores keep insertion order.
    fn nearest(&self, query: &[f32], limit: usize) -> Vec<Neighbor<'_>>;
}
