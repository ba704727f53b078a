//! Core data models that flow through the ingestion and answering pipeline.
//!
//! Documents enter as [`SourceDocument`]s, are cut into [`Passage`]s by the
//! chunker, gain vectors as [`EmbeddedPassage`]s inside the index, and come
//! back out of a query as [`Citation`]s attached to an answer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An uploaded document: a filename plus its raw bytes.
///
/// The filename is the document's identity and must be unique within a
/// session's file set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub filename: String,
    pub content: Vec<u8>,
}

impl SourceDocument {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// Text pulled out of a [`SourceDocument`], with page markers embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub filename: String,
    /// Full text with `--- Page N ---` marker lines.
    pub text: String,
    /// Number of pages the document reported.
    pub page_count: usize,
    /// 1-based page numbers whose extraction failed.
    pub skipped_pages: Vec<u32>,
}

/// Page provenance of a passage.
///
/// Serializes as a plain integer for known pages and as the string
/// `"unknown"` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Page {
    Number(u32),
    Unknown,
}

impl Page {
    pub fn number(&self) -> Option<u32> {
        match self {
            Page::Number(n) => Some(*n),
            Page::Unknown => None,
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Page::Number(n) => write!(f, "{}", n),
            Page::Unknown => f.write_str("Unknown"),
        }
    }
}

impl Serialize for Page {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Page::Number(n) => serializer.serialize_u32(*n),
            Page::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for Page {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Page::Number(n)),
            Raw::Text(s) if s.eq_ignore_ascii_case("unknown") => Ok(Page::Unknown),
            Raw::Text(s) => Err(serde::de::Error::custom(format!(
                "invalid page '{}': expected a number or \"unknown\"",
                s
            ))),
        }
    }
}

/// A bounded span of one document's text; the atomic retrievable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Passage {
    pub text: String,
    /// Filename of the owning [`SourceDocument`].
    pub source: String,
    pub page: Page,
    /// Position within the owning document, contiguous from 0.
    pub sequence: usize,
    /// SHA-256 of `text`.
    pub hash: String,
}

impl Passage {
    pub fn citation(&self) -> Citation {
        Citation {
            filename: self.source.clone(),
            page: self.page,
        }
    }
}

/// A [`Passage`] together with its embedding vector.
#[derive(Debug, Clone)]
pub struct EmbeddedPassage {
    pub passage: Passage,
    pub vector: Vec<f32>,
}

/// A passage returned from a search, with its cosine similarity to the query.
///
/// Larger scores are closer matches.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f32,
}

/// A `{filename, page}` reference shown alongside an answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    pub filename: String,
    pub page: Page,
}

impl Citation {
    pub fn new(filename: impl Into<String>, page: Page) -> Self {
        Self {
            filename: filename.into(),
            page,
        }
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Page {})", self.filename, self.page)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of a session's conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            citations: Vec::new(),
            at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            citations,
            at: Utc::now(),
        }
    }
}
