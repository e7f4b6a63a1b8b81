//! PDF text extraction using lopdf and pdf-extract.

use lopdf::Document;
use tracing::debug;

use super::{Result, SourceText, TextSource};
use crate::error::SourceError;

/// Text-layer PDF source. Scanned PDFs without a text layer yield empty text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextSource;

impl PdfTextSource {
    pub fn new() -> Self {
        Self
    }

    /// Parse the document, decrypting empty-password PDFs.
    ///
    /// Returns the page count and the bytes pdf-extract should read.
    fn prepare(&self, data: &[u8]) -> Result<(u32, Vec<u8>)> {
        let mut doc = Document::load_mem(data).map_err(|e| SourceError::Parse(e.to_string()))?;

        let bytes = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(SourceError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| SourceError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        let page_count = doc.get_pages().len() as u32;
        if page_count == 0 {
            return Err(SourceError::NoPages);
        }
        Ok((page_count, bytes))
    }
}

impl TextSource for PdfTextSource {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn accepts(&self, extension: &str) -> bool {
        extension == "pdf"
    }

    fn load(&self, data: &[u8]) -> Result<SourceText> {
        let (page_count, bytes) = self.prepare(data)?;
        let text = pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|e| SourceError::TextExtraction(e.to_string()))?;

        debug!("Loaded PDF with {} pages, {} chars of text", page_count, text.len());
        Ok(SourceText::new(text, page_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            PdfTextSource::new().load(b"not a pdf"),
            Err(SourceError::Parse(_))
        ));
    }

    #[test]
    fn test_accepts_pdf_extension() {
        assert!(PdfTextSource.accepts("pdf"));
        assert!(!PdfTextSource.accepts("txt"));
    }
}
