//! `pdfchat index` and the shared index-building step.
//!
//! Extraction, chunking, and embedding are CPU-bound and synchronous in the
//! core, so they run on tokio's blocking pool.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::sync::Arc;

use pdfchat_core::embedding::EmbeddingProvider;
use pdfchat_core::ingest::{ingest, FileReport, IngestReport};
use pdfchat_core::models::SourceDocument;
use pdfchat_core::session::FileSetFingerprint;

use crate::config::Config;
use crate::documents::{load_documents, DocumentArgs};
use crate::embedding::load_provider;
use crate::pdf::DocumentExtractor;
use crate::progress::ProgressMode;

/// Extract, chunk, and embed `documents` into a fresh index.
pub async fn build_index(
    config: &Config,
    provider: Arc<dyn EmbeddingProvider>,
    documents: Vec<SourceDocument>,
    progress: ProgressMode,
) -> Result<IngestReport> {
    let options = config.ingest_options();
    let report = tokio::task::spawn_blocking(move || {
        let reporter = progress.reporter();
        ingest(
            &DocumentExtractor,
            provider,
            &documents,
            &options,
            reporter.as_ref(),
        )
    })
    .await
    .context("ingest task failed")??;
    Ok(report)
}

/// Per-file lines plus the summary, as printed after processing.
pub fn format_report(report: &IngestReport) -> String {
    let mut out = String::new();
    for file in &report.files {
        out.push_str(&format!("• {}: {} chunks", file.filename, file.passages));
        if !file.skipped_pages.is_empty() {
            let pages: Vec<String> = file.skipped_pages.iter().map(|p| p.to_string()).collect();
            out.push_str(&format!(" (skipped pages: {})", pages.join(", ")));
        }
        out.push('\n');
    }
    out.push_str(&format!(
        "Successfully processed {} PDF(s) into {} chunks\n",
        report.files.len(),
        report.total_passages()
    ));
    out
}

/// `pdfchat index --json` output.
#[derive(Debug, Serialize)]
pub struct IndexSummary<'a> {
    pub index_id: String,
    pub fingerprint: &'a FileSetFingerprint,
    pub embedding_model: &'a str,
    pub files: &'a [FileReport],
    pub total_passages: usize,
}

pub fn report_json(report: &IngestReport, fingerprint: &FileSetFingerprint) -> Result<String> {
    let summary = IndexSummary {
        index_id: report.index.id().to_string(),
        fingerprint,
        embedding_model: report.index.model_name(),
        files: &report.files,
        total_passages: report.total_passages(),
    };
    Ok(serde_json::to_string_pretty(&summary)?)
}

pub async fn run_index(config: &Config, docs: &DocumentArgs, json: bool) -> Result<()> {
    if docs.is_empty() {
        bail!("No documents given. Use --file <PATH> or --dir <PATH>.");
    }
    let documents = load_documents(docs)?;
    if documents.is_empty() {
        bail!("No PDF documents found.");
    }

    let fingerprint = FileSetFingerprint::of(&documents);
    let provider = load_provider(&config.embedding).await?;
    let report = build_index(config, provider, documents, ProgressMode::default_for_tty())
        .await
        .context("Error processing PDFs")?;

    if json {
        println!("{}", report_json(&report, &fingerprint)?);
    } else {
        print!("{}", format_report(&report));
    }
    Ok(())
}
