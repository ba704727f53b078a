//! Embedding provider construction.
//!
//! The provider traits and the offline hashed provider live in
//! `pdfchat_core::embedding`; this module adds the model-backed
//! [`LocalProvider`] and the [`create_provider`] factory.
//!
//! # Providers
//!
//! | Config value | Provider | Notes |
//! |--------------|----------|-------|
//! | `"local"` | [`LocalProvider`] | fastembed; model downloaded from Hugging Face on first use, then offline |
//! | `"hashed"` | [`HashedProvider`] | no model, no network; lexical overlap only |
//!
//! A provider is built once per process and shared behind an `Arc`, so the
//! model is loaded a single time no matter how often the index is rebuilt.

use anyhow::{bail, Result};
use std::sync::Arc;

use pdfchat_core::embedding::{EmbeddingProvider, HashedProvider};

use crate::config::EmbeddingConfig;

/// Default dimensionality for the hashed provider.
pub const DEFAULT_HASHED_DIMS: usize = 384;

/// Default local model (384 dimensions).
pub const DEFAULT_LOCAL_MODEL: &str = "all-minilm-l6-v2";

#[cfg(feature = "local-embeddings-fastembed")]
pub use local::LocalProvider;

#[cfg(feature = "local-embeddings-fastembed")]
mod local {
    use std::sync::Mutex;

    use anyhow::{bail, Result};
    use pdfchat_core::embedding::EmbeddingProvider;
    use pdfchat_core::error::{EmbeddingError, EmbeddingInitError};

    use super::DEFAULT_LOCAL_MODEL;
    use crate::config::EmbeddingConfig;

    /// Sentence-embedding model run in-process with fastembed.
    ///
    /// Calls are serialised on the model; fastembed batches internally.
    pub struct LocalProvider {
        model_name: String,
        dims: usize,
        batch_size: usize,
        model: Mutex<fastembed::TextEmbedding>,
    }

    impl LocalProvider {
        /// Load (downloading if needed) the configured model. Blocking.
        pub fn new(config: &EmbeddingConfig) -> Result<Self> {
            let model_name = config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());
            let (fastembed_model, native_dims) = config_to_fastembed_model(&model_name)?;

            if let Some(dims) = config.dims {
                if dims != native_dims {
                    bail!(
                        "embedding.dims = {} does not match model '{}' ({} dimensions)",
                        dims,
                        model_name,
                        native_dims
                    );
                }
            }

            let model = fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(fastembed_model)
                    .with_show_download_progress(atty::is(atty::Stream::Stderr)),
            )
            .map_err(|e| EmbeddingInitError {
                model: model_name.clone(),
                reason: e.to_string(),
            })?;

            tracing::info!(model = %model_name, dims = native_dims, "loaded embedding model");

            Ok(Self {
                model_name,
                dims: native_dims,
                batch_size: config.batch_size,
                model: Mutex::new(model),
            })
        }
    }

    impl EmbeddingProvider for LocalProvider {
        fn model_name(&self) -> &str {
            &self.model_name
        }

        fn dims(&self) -> usize {
            self.dims
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            let mut model = self
                .model
                .lock()
                .map_err(|_| EmbeddingError::Backend("embedding model lock poisoned".into()))?;
            model
                .embed(texts.to_vec(), Some(self.batch_size))
                .map_err(|e| EmbeddingError::Backend(e.to_string()))
        }
    }

    fn config_to_fastembed_model(name: &str) -> Result<(fastembed::EmbeddingModel, usize)> {
        match name {
            "all-minilm-l6-v2" => Ok((fastembed::EmbeddingModel::AllMiniLML6V2, 384)),
            "bge-small-en-v1.5" => Ok((fastembed::EmbeddingModel::BGESmallENV15, 384)),
            "bge-base-en-v1.5" => Ok((fastembed::EmbeddingModel::BGEBaseENV15, 768)),
            "bge-large-en-v1.5" => Ok((fastembed::EmbeddingModel::BGELargeENV15, 1024)),
            "nomic-embed-text-v1.5" => Ok((fastembed::EmbeddingModel::NomicEmbedTextV15, 768)),
            "multilingual-e5-small" => Ok((fastembed::EmbeddingModel::MultilingualE5Small, 384)),
            other => bail!(
                "Unknown local embedding model: '{}'. Supported models: \
                 all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
                 nomic-embed-text-v1.5, multilingual-e5-small",
                other
            ),
        }
    }

}

/// Create the configured [`EmbeddingProvider`].
///
/// Loading a local model may download it and is blocking; call from
/// `spawn_blocking` inside async code.
///
/// # Errors
///
/// Unknown provider names, unknown models, a `dims` that contradicts the
/// model, or a model that fails to load.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "hashed" => {
            let dims = config.dims.unwrap_or(DEFAULT_HASHED_DIMS);
            Ok(Arc::new(HashedProvider::new(dims)?))
        }
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => bail!(
            "Local embedding provider requires --features local-embeddings-fastembed; \
             set [embedding] provider = \"hashed\" to run without a model"
        ),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// [`create_provider`] on the blocking pool.
pub async fn load_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || create_provider(&config)).await?
}
