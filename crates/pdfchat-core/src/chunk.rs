//! Recursive character chunker with page provenance.
//!
//! Splits extracted document text into [`Passage`]s no longer than
//! `chunk_size` characters, carrying up to `overlap` characters of trailing
//! context from one passage into the next.
//!
//! # Algorithm
//!
//! 1. Pick the first separator from `["\n\n", "\n", " ", ""]` that occurs in
//!    the text (`""` always matches and means "between characters").
//! 2. Split on it, keeping each separator attached to the start of the piece
//!    that follows it.
//! 3. Pieces shorter than `chunk_size` are merged greedily. When the next
//!    piece would overflow, the buffer is emitted and its leading pieces are
//!    dropped until at most `overlap` characters remain; those carry over.
//! 4. Pieces of `chunk_size` or more are split again with the remaining
//!    separators. A piece that is still too long once the separators run
//!    out is emitted as is.
//! 5. Every emitted chunk is trimmed; empty chunks are dropped.
//!
//! Lengths are counted in `char`s, so multi-byte text never splits inside
//! a code point.
//!
//! # Page numbers
//!
//! Extraction embeds `--- Page N ---` marker lines between pages. A
//! passage's page is the first marker line inside its own text, or
//! [`Page::Unknown`] when it contains none. Short pages merged into one
//! passage therefore cite the page the passage starts on.
//!
//! # Example
//!
//! ```rust
//! use pdfchat_core::chunk::{chunk_text, ChunkOptions};
//! use pdfchat_core::models::Page;
//!
//! let text = "\n--- Page 1 ---\nHold the button for 3 seconds.\n";
//! let passages = chunk_text(text, "manual.pdf", &ChunkOptions::default());
//! assert_eq!(passages.len(), 1);
//! assert_eq!(passages[0].page, Page::Number(1));
//! ```

use std::collections::VecDeque;

use sha2::{Digest, Sha256};

use crate::models::{Page, Passage};

/// Separator priority list, coarsest first.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

const MARKER_PREFIX: &str = "--- Page ";
const MARKER_SUFFIX: &str = " ---";

/// Size limits for [`chunk_text`], in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// The marker line that introduces page `number` in extracted text.
pub fn page_marker(number: u32) -> String {
    format!("{}{}{}", MARKER_PREFIX, number, MARKER_SUFFIX)
}

/// Split one document's text into passages.
///
/// Returns an empty vector for empty or whitespace-only text; whether
/// that is an error is the caller's decision.
pub fn chunk_text(text: &str, filename: &str, options: &ChunkOptions) -> Vec<Passage> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    split_recursive(text, &SEPARATORS, options)
        .into_iter()
        .filter(|chunk| !chunk.trim().is_empty())
        .enumerate()
        .map(|(sequence, chunk)| make_passage(filename, sequence, chunk))
        .collect()
}

/// Recover the page number of a chunk from the first marker line it contains.
pub fn page_of(text: &str) -> Page {
    text.lines()
        .find_map(|line| {
            line.trim()
                .strip_prefix(MARKER_PREFIX)?
                .strip_suffix(MARKER_SUFFIX)?
                .trim()
                .parse::<u32>()
                .ok()
        })
        .map(Page::Number)
        .unwrap_or(Page::Unknown)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn split_recursive(text: &str, separators: &[&str], options: &ChunkOptions) -> Vec<String> {
    let (index, separator) = separators
        .iter()
        .enumerate()
        .find(|(_, sep)| sep.is_empty() || text.contains(**sep))
        .map(|(i, sep)| (i, *sep))
        .unwrap_or((separators.len(), ""));
    let finer: &[&str] = if separator.is_empty() {
        &[]
    } else {
        &separators[index + 1..]
    };

    let mut chunks = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for piece in split_keeping_separator(text, separator) {
        if char_len(piece) < options.chunk_size {
            pending.push(piece);
            continue;
        }
        if !pending.is_empty() {
            chunks.extend(merge_pieces(&pending, options));
            pending.clear();
        }
        if finer.is_empty() {
            chunks.push(piece.to_string());
        } else {
            chunks.extend(split_recursive(piece, finer, options));
        }
    }

    if !pending.is_empty() {
        chunks.extend(merge_pieces(&pending, options));
    }

    chunks
}

/// Split `text` on `separator`, leaving each separator at the start of the
/// piece after it. An empty separator splits into single characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(&text[start..pos]);
        }
        start = pos;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn merge_pieces(pieces: &[&str], options: &ChunkOptions) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        let len = char_len(piece);
        if total + len > options.chunk_size && !window.is_empty() {
            push_trimmed(&mut chunks, &window);
            while total > options.overlap || (total > 0 && total + len > options.chunk_size) {
                match window.pop_front() {
                    Some(front) => total -= char_len(front),
                    None => break,
                }
            }
        }
        window.push_back(piece);
        total += len;
    }

    push_trimmed(&mut chunks, &window);
    chunks
}

fn push_trimmed(chunks: &mut Vec<String>, window: &VecDeque<&str>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn make_passage(filename: &str, sequence: usize, text: String) -> Passage {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Passage {
        page: page_of(&text),
        text,
        source: filename.to_string(),
        sequence,
        hash,
    }
}
