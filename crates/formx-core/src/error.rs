//! Error types for the formx-core library.

use thiserror::Error;

/// Main error type for the formx library.
#[derive(Error, Debug)]
pub enum FormxError {
    /// Text source error (PDF or plain text loading).
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Field extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Mapping error.
    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Target schema error.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning a source file into text.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from the PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// File type is not handled by any text source.
    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),

    /// I/O error while reading the source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Issues raised during field extraction.
///
/// None of these abort a document. They are collected as warnings on the
/// extraction report; the worst outcome for a single part is an empty
/// field list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// No part headings were found; the document was treated as one part.
    #[error("no part headings found, treating document as a single part")]
    SegmentationEmpty,

    /// A part yielded no fields after primary and fallback attempts.
    #[error("no fields extracted for part {part}")]
    NoFieldsExtracted { part: u32 },

    /// The semantic extractor is not configured, not reachable, or failed.
    #[error("semantic extractor unavailable for part {part}: {reason}")]
    SemanticExtractorUnavailable { part: u32, reason: String },

    /// The semantic extractor did not answer within its deadline.
    #[error("semantic extractor timed out after {timeout_ms}ms for part {part}")]
    SemanticExtractorTimeout { part: u32, timeout_ms: u64 },

    /// Extraction was cancelled before this part was processed.
    #[error("extraction cancelled before part {part}")]
    Cancelled { part: u32 },
}

/// Errors related to schema mapping and user overrides.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// A classifier response key does not name exactly one field of its batch.
    #[error("classifier response key {key:?} does not identify a single field")]
    AmbiguousMapping { key: String },

    /// An automatic remap was attempted on a manually resolved field.
    #[error("field {identifier} in part {part} has a manual override")]
    ManualOverrideConflict { part: u32, identifier: String },

    /// The requested field does not exist.
    #[error("no field {identifier} in part {part}")]
    UnknownField { part: u32, identifier: String },

    /// The target path is not part of the schema vocabulary.
    #[error("unknown target path: {0}")]
    UnknownTargetPath(String),

    /// Parent fields carry no value and cannot be mapped.
    #[error("field {identifier} in part {part} is a parent field")]
    ParentField { part: u32, identifier: String },

    /// The semantic classifier failed or timed out.
    #[error("semantic classifier failed: {0}")]
    ClassifierFailed(String),
}

/// Errors detected while validating a target schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// An object has an empty name.
    #[error("schema object with empty name")]
    EmptyObjectName,

    /// The same object name appears twice.
    #[error("duplicate schema object: {0}")]
    DuplicateObject(String),

    /// A path is empty or contains empty segments.
    #[error("invalid path {path:?} in object {object}")]
    InvalidPath { object: String, path: String },

    /// The same path is declared more than once.
    #[error("duplicate path: {0}")]
    DuplicatePath(String),
}

/// Result type for the formx library.
pub type Result<T> = std::result::Result<T, FormxError>;
