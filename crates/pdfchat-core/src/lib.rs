//! # pdfchat core
//!
//! Document question-answering logic with no I/O of its own: data models,
//! page-aware chunking, the embedding trait, an in-memory vector index, the
//! retrieval-augmented answerer, and per-user session state.
//!
//! This crate contains no tokio runtime, HTTP client, or PDF parser. Those
//! live in the `pdfchat` application, which plugs them in through
//! [`extract::TextExtractor`], [`embedding::EmbeddingProvider`] and
//! [`answer::GenerationBackend`].
//!
//! # Flow
//!
//! ```text
//! SourceDocument ─extract─► ExtractedText ─chunk─► Passage ─embed─► VectorIndex
//!                                                                      │
//!                          Answer ◄─generate─ context + citations ◄─search
//! ```

pub mod answer;
pub mod chunk;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod models;
pub mod session;
pub mod store;
