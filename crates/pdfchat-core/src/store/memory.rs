//! In-memory [`VectorStore`] implementation.
//!
//! Vectors are kept in insertion order in a `Vec`; search is brute-force
//! cosine similarity over all of them.

use crate::embedding::cosine_similarity;
use crate::error::EmbeddingError;
use crate::models::EmbeddedPassage;

use super::{Neighbor, VectorStore};

/// In-memory store, dropped together with its index.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    dims: usize,
    entries: Vec<EmbeddedPassage>,
}

impl InMemoryStore {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            entries: Vec::new(),
        }
    }

    pub fn with_capacity(dims: usize, capacity: usize) -> Self {
        Self {
            dims,
            entries: Vec::with_capacity(capacity),
        }
    }
}

impl VectorStore for InMemoryStore {
    fn dims(&self) -> usize {
        self.dims
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn insert(&mut self, entry: EmbeddedPassage) -> Result<(), EmbeddingError> {
        if entry.vector.len() != self.dims {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dims,
                actual: entry.vector.len(),
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    fn nearest(&self, query: &[f32], limit: usize) -> Vec<Neighbor<'_>> {
        let mut scored: Vec<Neighbor<'_>> = self
            .entries
            .iter()
            .map(|entry| Neighbor {
                entry,
                score: cosine_similarity(query, &entry.vector),
            })
            .collect();
        // Stable sort: ties stay in insertion order.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        scored
    }
}
