//! Page-wise text extraction contract.
//!
//! Format-specific decoding (PDF, plain text) lives behind
//! [`TextExtractor`]; this module turns its per-page results into a single
//! text with `--- Page N ---` marker lines that the chunker reads back.
//!
//! A page that fails to decode is skipped with a warning. The document only
//! fails when it cannot be opened, when every page fails, or when nothing
//! but whitespace comes out.

use tracing::warn;

use crate::chunk::page_marker;
use crate::error::ExtractionError;
use crate::models::{ExtractedText, SourceDocument};

/// Extraction result for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number.
    pub number: u32,
    /// Page text, or the reason it could not be decoded.
    pub text: Result<String, String>,
}

impl PageText {
    pub fn ok(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: Ok(text.into()),
        }
    }

    pub fn failed(number: u32, reason: impl Into<String>) -> Self {
        Self {
            number,
            text: Err(reason.into()),
        }
    }
}

/// Decodes a document format into per-page text.
pub trait TextExtractor: Send + Sync {
    /// Open `document` and return one entry per page, in page order.
    ///
    /// Returns [`ExtractionError::Unreadable`] when the document cannot be
    /// opened at all; individual page failures go into [`PageText::text`].
    fn pages(&self, document: &SourceDocument) -> Result<Vec<PageText>, ExtractionError>;
}

/// Plain UTF-8 text, one page per form feed (`\x0c`).
///
/// This is the layout `pdftotext` produces, so pre-extracted dumps keep
/// their page numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn pages(&self, document: &SourceDocument) -> Result<Vec<PageText>, ExtractionError> {
        let text = std::str::from_utf8(&document.content).map_err(|e| {
            ExtractionError::Unreadable {
                filename: document.filename.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(text
            .split('\x0c')
            .enumerate()
            .map(|(i, page)| PageText::ok(i as u32 + 1, page))
            .collect())
    }
}

/// Extract the full marked-up text of one document.
pub fn extract(
    extractor: &dyn TextExtractor,
    document: &SourceDocument,
) -> Result<ExtractedText, ExtractionError> {
    let pages = extractor.pages(document)?;
    assemble(&document.filename, pages)
}

/// Join per-page results into marked-up text, skipping failed pages.
pub fn assemble(filename: &str, pages: Vec<PageText>) -> Result<ExtractedText, ExtractionError> {
    let page_count = pages.len();
    let mut text = String::new();
    let mut skipped_pages = Vec::new();

    for page in pages {
        match page.text {
            Ok(body) => {
                if !body.trim().is_empty() {
                    text.push('\n');
                    text.push_str(&page_marker(page.number));
                    text.push('\n');
                    text.push_str(&body);
                    text.push('\n');
                }
            }
            Err(reason) => {
                warn!(
                    filename,
                    page = page.number,
                    %reason,
                    "could not extract text from page; skipping"
                );
                skipped_pages.push(page.number);
            }
        }
    }

    if page_count > 0 && skipped_pages.len() == page_count {
        return Err(ExtractionError::AllPagesFailed {
            filename: filename.to_string(),
            pages: page_count,
        });
    }

    if text.trim().is_empty() {
        return Err(ExtractionError::NoText {
            filename: filename.to_string(),
        });
    }

    Ok(ExtractedText {
        filename: filename.to_string(),
        text,
        page_count,
        skipped_pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_marked() {
        let out = assemble(
            "manual.pdf",
            vec![PageText::ok(1, "First page."), PageText::ok(2, "Second page.")],
        )
        .unwrap();
        assert_eq!(
            out.text,
            "\n--- Page 1 ---\nFirst page.\n\n--- Page 2 ---\nSecond page.\n"
        );
        assert_eq!(out.page_count, 2);
        assert!(out.skipped_pages.is_empty());
    }

    #[test]
    fn blank_pages_are_omitted_but_counted() {
        let out = assemble("a.pdf", vec![PageText::ok(1, "  \n"), PageText::ok(2, "Body")]).unwrap();
        assert!(!out.text.contains("Page 1"));
        assert!(out.text.contains("--- Page 2 ---"));
        assert_eq!(out.page_count, 2);
    }

    #[test]
    fn failed_page_is_skipped() {
        let out = assemble(
            "a.pdf",
            vec![PageText::failed(1, "bad font"), PageText::ok(2, "Readable")],
        )
        .unwrap();
        assert_eq!(out.skipped_pages, vec![1]);
        assert!(out.text.contains("Readable"));
    }

    #[test]
    fn all_pages_failed_is_an_error() {
        let err = assemble(
            "a.pdf",
            vec![PageText::failed(1, "x"), PageText::failed(2, "y")],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ExtractionError::AllPagesFailed {
                filename: "a.pdf".into(),
                pages: 2
            }
        );
    }

    #[test]
    fn whitespace_only_is_an_error() {
        let err = assemble("scan.pdf", vec![PageText::ok(1, "   ")]).unwrap_err();
        assert!(matches!(err, ExtractionError::NoText { .. }));

        let err = assemble("empty.pdf", Vec::new()).unwrap_err();
        assert!(matches!(err, ExtractionError::NoText { .. }));
    }

    #[test]
    fn plain_text_splits_on_form_feed() {
        let doc = SourceDocument::new("notes.txt", "one\x0ctwo\x0cthree");
        let pages = PlainTextExtractor.pages(&doc).unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2], PageText::ok(3, "three"));
    }

    #[test]
    fn plain_text_rejects_invalid_utf8() {
        let doc = SourceDocument::new("bin.txt", vec![0xff, 0xfe, 0x00]);
        let err = extract(&PlainTextExtractor, &doc).unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable { .. }));
    }
}
