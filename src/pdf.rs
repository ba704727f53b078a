//! Page-wise text extraction for uploaded files.
//!
//! PDFs are read with `lopdf`, one page at a time, so a page with a broken
//! font or content stream is skipped on its own instead of sinking the whole
//! document. When `lopdf` cannot open the file, or every page fails, the
//! document is retried with `pdf-extract`.
//!
//! Plain-text files (`.txt`, `.md`) are accepted too, paged on form feeds.

use std::path::Path;

use pdfchat_core::error::ExtractionError;
use pdfchat_core::extract::{PageText, PlainTextExtractor, TextExtractor};
use pdfchat_core::models::SourceDocument;
use tracing::debug;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// PDF extractor: `lopdf` per page, `pdf-extract` as fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn pages(&self, document: &SourceDocument) -> Result<Vec<PageText>, ExtractionError> {
        let doc = match lopdf::Document::load_mem(&document.content) {
            Ok(doc) => doc,
            Err(e) => {
                debug!(filename = %document.filename, error = %e, "lopdf could not open document");
                return fallback_pages(&document.content).map_err(|reason| {
                    ExtractionError::Unreadable {
                        filename: document.filename.clone(),
                        reason: format!("{}; {}", e, reason),
                    }
                });
            }
        };

        let pages: Vec<PageText> = doc
            .get_pages()
            .keys()
            .map(|&number| match doc.extract_text(&[number]) {
                Ok(text) => PageText::ok(number, text),
                Err(e) => PageText::failed(number, e.to_string()),
            })
            .collect();

        if pages.is_empty() {
            return Err(ExtractionError::Unreadable {
                filename: document.filename.clone(),
                reason: "document has no pages".to_string(),
            });
        }

        if pages.iter().all(|p| p.text.is_err()) {
            if let Ok(fallback) = fallback_pages(&document.content) {
                debug!(filename = %document.filename, "using pdf-extract fallback");
                return Ok(fallback);
            }
        }

        Ok(pages)
    }
}

fn fallback_pages(bytes: &[u8]) -> Result<Vec<PageText>, String> {
    // pdf-extract panics on some malformed fonts.
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));
    match result {
        Ok(Ok(pages)) => Ok(pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageText::ok(i as u32 + 1, text))
            .collect()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("PDF parser panicked".to_string()),
    }
}

/// Chooses an extractor by file extension, falling back to content sniffing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn pages(&self, document: &SourceDocument) -> Result<Vec<PageText>, ExtractionError> {
        let ext = Path::new(&document.filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());

        match ext.as_deref() {
            Some("pdf") => PdfExtractor.pages(document),
            Some("txt") | Some("md") => PlainTextExtractor.pages(document),
            _ if document.content.starts_with(PDF_MAGIC) => PdfExtractor.pages(document),
            _ => Err(ExtractionError::Unreadable {
                filename: document.filename.clone(),
                reason: "unsupported file type (expected .pdf, .txt or .md)".to_string(),
            }),
        }
    }
}

/// True for filenames the app can ingest.
pub fn is_supported(path: &Path) -> bool {
    matches!(
        path.extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .as_deref(),
        Some("pdf") | Some("txt") | Some("md")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfchat_core::extract::extract;

    /// PDF with one Helvetica text line per page. Offsets are computed so
    /// both parsers accept it.
    fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        let n = pages.len();
        let font_id = 3 + 2 * n;
        let mut objects: Vec<String> = Vec::new();
        objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
        let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
        objects.push(format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            n
        ));
        for (i, text) in pages.iter().enumerate() {
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 {} 0 R >> >> >>",
                4 + 2 * i,
                font_id
            ));
            let stream = format!("BT /F1 12 Tf 72 700 Td ({}) Tj ET", text);
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                stream.len(),
                stream
            ));
        }
        objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n");
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj {} endobj\n", i + 1, body).as_bytes());
        }
        let xref_start = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
        out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_start
            )
            .as_bytes(),
        );
        out
    }

    #[test]
    fn extracts_each_page_with_markers() {
        let doc = SourceDocument::new(
            "manual.pdf",
            pdf_with_pages(&["Hold the button for 3 seconds", "Battery is under the cover"]),
        );
        let out = extract(&DocumentExtractor, &doc).unwrap();
        assert_eq!(out.page_count, 2);
        assert!(out.skipped_pages.is_empty());

        let p1 = out.text.find("--- Page 1 ---").unwrap();
        let p2 = out.text.find("--- Page 2 ---").unwrap();
        let seconds = out.text.find("3 seconds").unwrap();
        let battery = out.text.find("Battery").unwrap();
        assert!(p1 < seconds && seconds < p2 && p2 < battery);
    }

    #[test]
    fn blank_pdf_has_no_text() {
        let doc = SourceDocument::new("scan.pdf", pdf_with_pages(&[""]));
        let err = extract(&DocumentExtractor, &doc).unwrap_err();
        assert!(
            matches!(
                err,
                ExtractionError::NoText { .. } | ExtractionError::AllPagesFailed { .. }
            ),
            "{:?}",
            err
        );
    }

    #[test]
    fn garbage_is_unreadable() {
        let doc = SourceDocument::new("broken.pdf", b"not a pdf at all".to_vec());
        let err = extract(&DocumentExtractor, &doc).unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable { .. }), "{:?}", err);
        assert_eq!(err.filename(), "broken.pdf");
    }

    #[test]
    fn text_files_are_paged_on_form_feeds() {
        let doc = SourceDocument::new("notes.md", "first\x0csecond");
        let out = extract(&DocumentExtractor, &doc).unwrap();
        assert_eq!(out.page_count, 2);
        assert!(out.text.contains("--- Page 2 ---\nsecond"));
    }

    #[test]
    fn unknown_extension_without_pdf_magic_is_rejected() {
        let doc = SourceDocument::new("slides.pptx", b"PK\x03\x04".to_vec());
        assert!(DocumentExtractor.pages(&doc).is_err());
    }

    #[test]
    fn supported_extensions() {
        assert!(is_supported(Path::new("a/B.PDF")));
        assert!(is_supported(Path::new("notes.md")));
        assert!(!is_supported(Path::new("image.png")));
        assert!(!is_supported(Path::new("README")));
    }
}
