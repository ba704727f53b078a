//! # pdfchat
//!
//! Ask questions about a set of PDF documents and get answers grounded in
//! their text, with `filename (Page N)` citations.
//!
//! Documents are extracted page by page, split into overlapping passages,
//! embedded, and held in an in-memory vector index for the lifetime of the
//! process. Each question retrieves the closest passages and sends them to
//! a generation backend (Gemini) with instructions to answer only from
//! that context.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Documents  │──▶│ Extract+Chunk │──▶│ Vector index │
//! │ PDF/TXT/MD  │   │    +Embed     │   │  (in memory) │
//! └─────────────┘   └──────────────┘   └──────┬───────┘
//!                                             │ top-k
//!                                             ▼
//!                                      ┌──────────────┐
//!                                      │   Answerer   │──▶ Gemini
//!                                      └──────────────┘
//! ```
//!
//! The pipeline itself lives in the `pdfchat-core` crate; this crate adds
//! configuration, PDF extraction, the embedding and generation backends,
//! and the CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`documents`] | Resolve `--file`/`--dir` arguments into documents |
//! | [`pdf`] | PDF and plain-text extraction |
//! | [`embedding`] | Embedding provider construction |
//! | [`generation`] | Gemini generation backend |
//! | [`progress`] | Ingest progress on stderr |
//! | [`ingest`] | `pdfchat index` and index building |
//! | [`search`] | `pdfchat search` |
//! | [`chat`] | `pdfchat ask` and the `pdfchat chat` REPL |

pub mod chat;
pub mod config;
pub mod documents;
pub mod embedding;
pub mod generation;
pub mod ingest;
pub mod logging;
pub mod pdf;
pub mod progress;
pub mod search;
