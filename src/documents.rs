//! Gathering documents from the command line.
//!
//! `--file` paths are taken as given; `--dir` paths are walked recursively
//! and every supported file underneath is picked up in sorted order. Each
//! document is identified by its bare filename.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use pdfchat_core::models::SourceDocument;

use crate::pdf::is_supported;

/// Where to read documents from.
#[derive(Args, Debug, Clone, Default)]
pub struct DocumentArgs {
    /// A document to load (PDF, or .txt/.md). Repeatable.
    #[arg(long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// A directory to search recursively for documents. Repeatable.
    #[arg(long = "dir", value_name = "PATH")]
    pub dirs: Vec<PathBuf>,
}

impl DocumentArgs {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    /// Split free-form paths (as typed after `/load`) into files and dirs.
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut args = Self::default();
        for path in paths {
            let path = path.into();
            if path.is_dir() {
                args.dirs.push(path);
            } else {
                args.files.push(path);
            }
        }
        args
    }
}

/// Resolve `args` to a list of file paths, files first, then each
/// directory's matches in sorted order.
pub fn collect_paths(args: &DocumentArgs) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for file in &args.files {
        if !file.is_file() {
            bail!("Document not found: {}", file.display());
        }
        paths.push(file.clone());
    }

    for dir in &args.dirs {
        if !dir.is_dir() {
            bail!("Directory not found: {}", dir.display());
        }
        let mut found = Vec::new();
        for entry in WalkDir::new(dir) {
            let entry = entry?;
            if entry.file_type().is_file() && is_supported(entry.path()) {
                found.push(entry.path().to_path_buf());
            }
        }
        // Sort for deterministic ordering
        found.sort();
        paths.extend(found);
    }

    Ok(paths)
}

pub fn load_document(path: &Path) -> Result<SourceDocument> {
    let content =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SourceDocument::new(filename, content))
}

pub fn load_documents(args: &DocumentArgs) -> Result<Vec<SourceDocument>> {
    collect_paths(args)?
        .iter()
        .map(|p| load_document(p))
        .collect()
}
