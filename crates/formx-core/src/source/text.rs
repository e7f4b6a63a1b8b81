//! Plain text input.

use tracing::debug;

use super::{Result, SourceText, TextSource};

/// Form feed separates pages in text dumps of PDFs.
const PAGE_BREAK: char = '\u{000C}';

/// Reads already-linearized text files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextSource;

impl PlainTextSource {
    pub fn new() -> Self {
        Self
    }
}

impl TextSource for PlainTextSource {
    fn name(&self) -> &'static str {
        "text"
    }

    fn accepts(&self, extension: &str) -> bool {
        matches!(extension, "txt" | "text")
    }

    fn load(&self, data: &[u8]) -> Result<SourceText> {
        let decoded = String::from_utf8_lossy(data);
        let text = decoded.strip_prefix('\u{FEFF}').unwrap_or(decoded.as_ref());
        let page_count = if text.trim().is_empty() {
            0
        } else {
            text.split(PAGE_BREAK).count() as u32
        };
        debug!("Read {} characters of text over {} pages", text.len(), page_count);
        Ok(SourceText::new(text.replace(PAGE_BREAK, "\n"), page_count))
    }
}
