//! Data models: the form document, the target schema and configuration.

pub mod config;
pub mod document;
pub mod schema;

pub use config::FormxConfig;
pub use document::{
    Choice, Document, ExtractionSource, Field, FieldKind, FieldMapping, MappingSource, Part,
};
pub use schema::{SchemaObject, TargetSchema};
