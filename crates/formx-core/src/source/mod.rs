//! Text sources: turn an input file into linearized text plus a page count.

#[cfg(feature = "pdf")]
mod pdf;
mod text;

#[cfg(feature = "pdf")]
pub use pdf::PdfTextSource;
pub use text::PlainTextSource;

use std::path::Path;

use tracing::debug;

use crate::error::SourceError;

/// Result type for text source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Linearized text of a whole form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceText {
    /// Full document text in reading order.
    pub full_text: String,
    /// Number of pages.
    pub page_count: u32,
}

impl SourceText {
    pub fn new(full_text: impl Into<String>, page_count: u32) -> Self {
        Self {
            full_text: full_text.into(),
            page_count,
        }
    }
}

/// Something that can turn raw bytes into form text.
pub trait TextSource {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this source handles files with `extension` (lowercase, no dot).
    fn accepts(&self, extension: &str) -> bool;

    /// Decode `data` into text.
    fn load(&self, data: &[u8]) -> Result<SourceText>;
}

/// Pick a text source for `path` based on its extension.
pub fn source_for(path: &Path) -> Result<Box<dyn TextSource>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let mut candidates: Vec<Box<dyn TextSource>> = Vec::new();
    #[cfg(feature = "pdf")]
    candidates.push(Box::new(PdfTextSource::new()));
    candidates.push(Box::new(PlainTextSource::new()));

    candidates
        .into_iter()
        .find(|source| source.accepts(&extension))
        .ok_or_else(|| SourceError::UnsupportedFormat(path.display().to_string()))
}

/// Read `path` and decode it with the matching text source.
pub fn load_source(path: &Path) -> Result<SourceText> {
    let source = source_for(path)?;
    let data = std::fs::read(path)?;
    debug!("Loading {} with {} source ({} bytes)", path.display(), source.name(), data.len());
    source.load(&data)
}
