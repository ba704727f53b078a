//! Vector index over one session's passages.
//!
//! A [`VectorIndex`] is built in one shot from every passage of a file set
//! and is never updated afterwards; a changed file set gets a fresh index.
//! Because [`VectorIndex::build`] returns the finished index by value, a
//! failed build never touches the index the caller already holds.
//!
//! Scores are cosine similarities in `[-1, 1]` and larger is better,
//! everywhere in this crate.

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info};
use uuid::Uuid;

use crate::embedding::EmbeddingProvider;
use crate::error::{EmbeddingError, EmptyIndexError, IndexError};
use crate::models::{EmbeddedPassage, Passage, ScoredPassage};
use crate::store::memory::InMemoryStore;
use crate::store::VectorStore;

/// Default number of texts sent to the provider per call.
pub const DEFAULT_BATCH_SIZE: usize = 64;

pub struct VectorIndex {
    id: Uuid,
    provider: Arc<dyn EmbeddingProvider>,
    store: Box<dyn VectorStore>,
}

impl VectorIndex {
    /// Embed every passage and store it.
    ///
    /// Batches of `batch_size` passages are embedded in parallel; the
    /// passage-to-vector pairing does not depend on scheduling.
    ///
    /// # Errors
    ///
    /// - [`IndexError::Empty`] when `passages` is empty.
    /// - [`IndexError::Embedding`] when the provider fails or returns
    ///   vectors of the wrong size or count.
    pub fn build(
        provider: Arc<dyn EmbeddingProvider>,
        passages: Vec<Passage>,
        batch_size: usize,
    ) -> Result<Self, IndexError> {
        if passages.is_empty() {
            return Err(EmptyIndexError.into());
        }

        let batch_size = batch_size.max(1);
        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();

        let batches = texts
            .par_chunks(batch_size)
            .map(|batch| {
                let vectors = provider.embed_batch(batch)?;
                if vectors.len() != batch.len() {
                    return Err(EmbeddingError::CountMismatch {
                        expected: batch.len(),
                        actual: vectors.len(),
                    });
                }
                Ok(vectors)
            })
            .collect::<Result<Vec<_>, EmbeddingError>>()?;

        let mut store = InMemoryStore::with_capacity(provider.dims(), passages.len());
        for (passage, vector) in passages.into_iter().zip(batches.into_iter().flatten()) {
            store.insert(EmbeddedPassage { passage, vector })?;
        }

        let id = Uuid::new_v4();
        info!(
            index = %id,
            model = provider.model_name(),
            passages = store.len(),
            "built vector index"
        );

        Ok(Self {
            id,
            provider,
            store: Box::new(store),
        })
    }

    /// Return the `k` passages most similar to `query`, best first.
    ///
    /// `k` is clamped to the number of stored passages.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>, EmbeddingError> {
        let limit = k.min(self.store.len());
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query_vec = self.provider.embed(query)?;
        if query_vec.len() != self.store.dims() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.store.dims(),
                actual: query_vec.len(),
            });
        }

        let hits: Vec<ScoredPassage> = self
            .store
            .nearest(&query_vec, limit)
            .into_iter()
            .map(|n| ScoredPassage {
                passage: n.entry.passage.clone(),
                score: n.score,
            })
            .collect();
        debug!(index = %self.id, k, hits = hits.len(), "searched index");
        Ok(hits)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.store.dims()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }
}

impl fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIndex")
            .field("id", &self.id)
            .field("model", &self.provider.model_name())
            .field("dims", &self.store.dims())
            .field("passages", &self.store.len())
            .finish()
    }
}
