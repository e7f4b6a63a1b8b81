//! Core library for structured field extraction from multi-part forms.
//!
//! This crate provides:
//! - Text sources (PDF text layer and plain text)
//! - Part segmentation and pattern-based field extraction
//! - Checkbox/radio choice detection and field type classification
//! - Tiered mapping of fields onto a target schema, with a questionnaire fallback
//! - Export views grouped by schema object and by part

pub mod error;
pub mod export;
pub mod extract;
pub mod mapping;
pub mod models;
pub mod semantic;
pub mod session;
pub mod source;

pub use error::{ExtractionError, FormxError, MappingError, Result, SchemaError, SourceError};
pub use export::{export, ExportBundle, MappedEntry, QuestionnaireEntry, QuestionnairePart};
pub use extract::{ExtractionReport, FieldMatcher, FormExtractor, PartReport, PartStage};
pub use mapping::{MappingEngine, MappingReport, MappingRules};
pub use models::{
    Choice, Document, ExtractionSource, Field, FieldKind, FieldMapping, FormxConfig, MappingSource, Part,
    SchemaObject, TargetSchema,
};
pub use semantic::{RecordedExtractor, SemanticClassifier, SemanticExtractor, SemanticField};
pub use session::{CancellationToken, SharedDocument};
pub use source::{load_source, SourceText, TextSource};
