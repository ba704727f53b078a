//! TOML configuration.
//!
//! Every section and field is optional; a missing file section falls back to
//! the defaults below, and running without `--config` uses
//! [`Config::default`].
//!
//! ```toml
//! [chunking]
//! chunk_size = 1000
//! overlap = 200
//!
//! [embedding]
//! provider = "local"           # or "hashed" (offline, no model download)
//! model = "all-minilm-l6-v2"
//! batch_size = 64
//!
//! [retrieval]
//! k = 4
//! # min_score = 0.3            # drop passages below this cosine similarity
//!
//! [generation]
//! provider = "gemini"
//! model = "gemini-2.5-flash"
//! temperature = 0.1
//! max_output_tokens = 1000
//! api_key_env = "GEMINI_API_KEY"
//!
//! [logging]
//! level = "warn"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use pdfchat_core::answer::AnswerParams;
use pdfchat_core::chunk::ChunkOptions;
use pdfchat_core::ingest::IngestOptions;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
        }
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub min_score: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            min_score: None,
        }
    }
}

fn default_k() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
        }
    }
}

fn default_generation_provider() -> String {
    "gemini".to_string()
}
fn default_generation_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_output_tokens() -> u32 {
    1000
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            chunking: ChunkOptions {
                chunk_size: self.chunking.chunk_size,
                overlap: self.chunking.overlap,
            },
            batch_size: self.embedding.batch_size,
        }
    }

    pub fn answer_params(&self) -> AnswerParams {
        AnswerParams {
            k: self.retrieval.k,
            min_score: self.retrieval.min_score,
            temperature: self.generation.temperature,
            max_output_tokens: self.generation.max_output_tokens,
        }
    }
}

/// Load the file at `path`, or the defaults when no path is given.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config(p),
        None => {
            let config = Config::default();
            validate(&config)?;
            Ok(config)
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.overlap must be smaller than chunking.chunk_size");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "local" | "hashed" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be local or hashed.",
            other
        ),
    }
    if config.embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    // Validate retrieval
    if config.retrieval.k < 1 {
        anyhow::bail!("retrieval.k must be >= 1");
    }
    if let Some(min) = config.retrieval.min_score {
        if !(-1.0..=1.0).contains(&min) {
            anyhow::bail!("retrieval.min_score must be in [-1.0, 1.0]");
        }
    }

    // Validate generation
    if config.generation.provider != "gemini" {
        anyhow::bail!(
            "Unknown generation provider: '{}'. Must be gemini.",
            config.generation.provider
        );
    }
    if !(0.0..=2.0).contains(&config.generation.temperature) {
        anyhow::bail!("generation.temperature must be in [0.0, 2.0]");
    }
    if config.generation.max_output_tokens == 0 {
        anyhow::bail!("generation.max_output_tokens must be > 0");
    }
    if config.generation.api_key_env.trim().is_empty() {
        anyhow::bail!("generation.api_key_env must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = load_or_default(None).unwrap();
        assert_eq!(cfg.chunking.chunk_size, 1000);
        assert_eq!(cfg.chunking.overlap, 200);
        assert_eq!(cfg.embedding.provider, "local");
        assert_eq!(cfg.retrieval.k, 4);
        assert_eq!(cfg.generation.model, "gemini-2.5-flash");
        assert_eq!(cfg.generation.api_key_env, "GEMINI_API_KEY");
        assert_eq!(cfg.answer_params(), AnswerParams::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = write_config("[embedding]\nprovider = \"hashed\"\ndims = 256\n\n[retrieval]\nmin_score = 0.25\n");
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.embedding.provider, "hashed");
        assert_eq!(cfg.embedding.dims, Some(256));
        assert_eq!(cfg.retrieval.min_score, Some(0.25));
        assert_eq!(cfg.retrieval.k, 4);
        assert_eq!(cfg.ingest_options().chunking.chunk_size, 1000);
    }

    #[test]
    fn rejects_overlap_not_below_chunk_size() {
        let file = write_config("[chunking]\nchunk_size = 100\noverlap = 100\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn rejects_unknown_providers() {
        let file = write_config("[embedding]\nprovider = \"openai\"\n");
        assert!(load_config(file.path()).is_err());

        let file = write_config("[generation]\nprovider = \"ollama\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        for body in [
            "[retrieval]\nk = 0\n",
            "[retrieval]\nmin_score = 1.5\n",
            "[generation]\ntemperature = 3.0\n",
            "[embedding]\nbatch_size = 0\n",
        ] {
            let file = write_config(body);
            assert!(load_config(file.path()).is_err(), "accepted: {}", body);
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Path::new("/nonexistent/pdfchat.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
