//! Bounded PDF text extraction.
//!
//! Only the first few pages are extracted. Papers front-load their
//! signal (title, abstract, introduction) and full-document extraction
//! dominates ingestion latency on large PDFs.

use std::path::Path;

/// Pages read from the front of each document
pub const MAX_PAGES: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Failed to read PDF: {0}")]
    Decode(String),
}

/// Extract text from the first `MAX_PAGES` pages of a PDF.
///
/// Whitespace-only output is returned as-is; rejecting empty documents
/// is the caller's decision.
pub fn extract_pdf_text(path: &Path) -> Result<String, ExtractError> {
    let pages =
        pdf_extract::extract_text_by_pages(path).map_err(|e| ExtractError::Decode(e.to_string()))?;

    let text = pages
        .iter()
        .take(MAX_PAGES)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_decode_error() {
        let result = extract_pdf_text(Path::new("/nonexistent/paper.pdf"));
        assert!(matches!(result, Err(ExtractError::Decode(_))));
    }

    #[test]
    fn test_corrupt_pdf_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.pdf");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"%PDF-1.4 this is not actually a pdf body").unwrap();

        let result = extract_pdf_text(&path);
        assert!(matches!(result, Err(ExtractError::Decode(_))));
    }
}
