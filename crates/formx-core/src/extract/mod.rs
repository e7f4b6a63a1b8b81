//! Field extraction: segmentation, pattern matching, hierarchy and classification.

pub mod choices;
pub mod classifier;
pub mod hierarchy;
pub mod matcher;
pub mod orchestrator;
pub mod ordering;
pub mod patterns;
pub mod segmenter;

use crate::models::document::Field;

pub use classifier::{classify_fields, classify_label};
pub use hierarchy::{build_hierarchy, Hierarchy};
pub use matcher::{FieldShape, PatternFieldMatcher};
pub use orchestrator::{ExtractionReport, FormExtractor, PartReport, PartStage};
pub use ordering::{compare_identifiers, identifier_key, IdentifierKey};
pub use segmenter::{DocumentSegmenter, PartText, Segmentation};

/// Produces candidate fields from the text of one part.
pub trait FieldMatcher {
    /// Candidates in discovery order. Identifiers are unique within the result.
    fn match_fields(&self, text: &str, part_number: u32) -> Vec<Field>;
}
