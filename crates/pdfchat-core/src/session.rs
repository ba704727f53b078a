//! Per-user conversation state.
//!
//! A [`Session`] owns at most one [`VectorIndex`], the fingerprint of the
//! file set it was built from, and the conversation history. The caller
//! decides when to rebuild by comparing fingerprints with
//! [`Session::needs_rebuild`], builds the new index off to the side, and
//! hands it over with [`Session::install_index`] only on success.

use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::answer::{Answer, Answerer};
use crate::error::SessionError;
use crate::index::VectorIndex;
use crate::models::{Citation, ConversationTurn, Role, SourceDocument};

/// Identity of a set of uploaded documents.
///
/// SHA-256 over the sorted filenames and the SHA-256 of each document's
/// bytes. Upload order does not matter; renaming or editing a file does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FileSetFingerprint(String);

impl FileSetFingerprint {
    pub fn of(documents: &[SourceDocument]) -> Self {
        let mut entries: Vec<(&str, String)> = documents
            .iter()
            .map(|d| (d.filename.as_str(), format!("{:x}", Sha256::digest(&d.content))))
            .collect();
        entries.sort();

        let mut hasher = Sha256::new();
        for (name, digest) in entries {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            hasher.update(digest.as_bytes());
            hasher.update([b'\n']);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Default)]
pub struct Session {
    index: Option<Arc<VectorIndex>>,
    fingerprint: Option<FileSetFingerprint>,
    history: Vec<ConversationTurn>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `documents` differ from the set the current index was
    /// built from, or when there is no index yet.
    pub fn needs_rebuild(&self, documents: &[SourceDocument]) -> bool {
        match &self.fingerprint {
            Some(current) => *current != FileSetFingerprint::of(documents),
            None => true,
        }
    }

    /// Replace the session's index. History is kept.
    pub fn install_index(&mut self, index: VectorIndex, fingerprint: FileSetFingerprint) {
        info!(
            index = %index.id(),
            passages = index.len(),
            fingerprint = fingerprint.as_str(),
            "installed index"
        );
        self.index = Some(Arc::new(index));
        self.fingerprint = Some(fingerprint);
    }

    pub fn index(&self) -> Option<&Arc<VectorIndex>> {
        self.index.as_ref()
    }

    pub fn fingerprint(&self) -> Option<&FileSetFingerprint> {
        self.fingerprint.as_ref()
    }

    /// Answer `question` and record both turns in the history.
    ///
    /// Fails only when no index has been installed; nothing is recorded in
    /// that case.
    pub async fn ask(&mut self, answerer: &Answerer, question: &str) -> Result<Answer, SessionError> {
        let index = self.index.clone().ok_or(SessionError::NoIndex)?;

        self.history.push(ConversationTurn::user(question));
        let answer = answerer.ask(&index, question).await;
        self.history
            .push(ConversationTurn::assistant(answer.text.clone(), answer.citations.clone()));
        Ok(answer)
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Drop the index, fingerprint and history.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Citations of the most recent assistant turn.
    pub fn last_citations(&self) -> &[Citation] {
        self.history
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant)
            .map(|t| t.citations.as_slice())
            .unwrap_or(&[])
    }
}
