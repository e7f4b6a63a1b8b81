//! Optional semantic collaborators and the timeout discipline around them.
//!
//! Both collaborators are advisory. Their calls run on a helper thread and
//! are abandoned once the deadline passes, so a slow or hung collaborator
//! never holds up the local pattern path.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::error::Result;
use crate::extract::patterns::normalize_label;
use crate::models::document::{ExtractionSource, Field, FieldKind};

/// Failure of a semantic collaborator call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Not configured or not reachable.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The call returned an error.
    #[error("failed: {0}")]
    Failed(String),

    /// The deadline passed before a response arrived.
    #[error("timed out")]
    TimedOut,
}

/// A field proposed by the semantic extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticField {
    pub identifier: String,
    pub label: String,
    #[serde(default)]
    pub type_hint: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
}

/// External text-understanding service proposing fields for a part.
pub trait SemanticExtractor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        "semantic-extractor"
    }

    /// Cheap reachability check made before each call.
    fn is_available(&self) -> bool {
        true
    }

    /// Propose fields for an excerpt of part `part_hint`.
    fn extract_fields(
        &self,
        excerpt: &str,
        part_hint: u32,
    ) -> std::result::Result<Vec<SemanticField>, CollaboratorError>;
}

/// A field submitted to the semantic classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub part: u32,
    pub identifier: String,
    pub label: String,
    pub kind: FieldKind,
}

/// External service suggesting schema paths for unresolved fields.
///
/// The response maps a field identifier or label to a schema path.
pub trait SemanticClassifier: Send + Sync {
    fn name(&self) -> &str {
        "semantic-classifier"
    }

    fn classify(
        &self,
        batch: &[ClassificationRequest],
        vocabulary: &[String],
    ) -> std::result::Result<BTreeMap<String, String>, CollaboratorError>;
}

/// Run `call` on a helper thread and wait at most `timeout` for its result.
///
/// On timeout the helper is left to finish on its own; its result is dropped.
pub fn call_with_timeout<T, F>(timeout: Duration, call: F) -> std::result::Result<T, CollaboratorError>
where
    T: Send + 'static,
    F: FnOnce() -> std::result::Result<T, CollaboratorError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("formx-collaborator".to_string())
        .spawn(move || {
            // The receiver is gone once the caller has timed out.
            let _ = tx.send(call());
        })
        .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(CollaboratorError::TimedOut),
        Err(RecvTimeoutError::Disconnected) => Err(CollaboratorError::Failed(
            "collaborator exited without a result".to_string(),
        )),
    }
}

/// Normalize a collaborator-supplied identifier: `" 1.A. "` → `"1.a"`.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(|c: char| c == '.' || c == ')' || c == ':')
        .trim_start_matches('(')
        .to_lowercase()
}

/// Convert semantic proposals into candidate fields.
///
/// Positions continue from `first_position` so pattern candidates keep
/// precedence as tie-breakers.
pub fn into_candidates(
    proposals: Vec<SemanticField>,
    part_number: u32,
    label_max_chars: usize,
    first_position: usize,
) -> Vec<Field> {
    let mut fields = Vec::with_capacity(proposals.len());
    for proposal in proposals {
        let identifier = normalize_identifier(&proposal.identifier);
        let label = normalize_label(&proposal.label, label_max_chars);
        if identifier.is_empty() || label.is_empty() {
            trace!("Dropping semantic proposal without identifier or label");
            continue;
        }

        let kind = proposal
            .type_hint
            .as_deref()
            .and_then(FieldKind::from_hint)
            .filter(|kind| *kind != FieldKind::Parent)
            .unwrap_or(FieldKind::Text);
        let parent = proposal.parent.as_deref().map(normalize_identifier);

        let position = first_position + fields.len();
        fields.push(
            Field::new(identifier, label, part_number, position)
                .with_kind(kind)
                .with_parent(parent)
                .with_source(ExtractionSource::SemanticExtractor),
        );
    }
    fields
}

/// Replays semantic extractor responses recorded in a JSON file.
///
/// The file maps part numbers to field lists:
/// `{"1": [{"identifier": "1.a", "label": "Family Name", "type_hint": "text"}]}`.
#[derive(Debug, Clone, Default)]
pub struct RecordedExtractor {
    responses: BTreeMap<u32, Vec<SemanticField>>,
}

impl RecordedExtractor {
    pub fn new(responses: BTreeMap<u32, Vec<SemanticField>>) -> Self {
        Self { responses }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let responses: BTreeMap<u32, Vec<SemanticField>> = serde_json::from_str(&content)?;
        Ok(Self::new(responses))
    }
}

impl SemanticExtractor for RecordedExtractor {
    fn name(&self) -> &str {
        "recorded"
    }

    fn extract_fields(
        &self,
        _excerpt: &str,
        part_hint: u32,
    ) -> std::result::Result<Vec<SemanticField>, CollaboratorError> {
        Ok(self.responses.get(&part_hint).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_with_timeout_returns_result() {
        let result = call_with_timeout(Duration::from_secs(5), || Ok(42));
        assert_eq!(result, Ok(42));
    }

    #[test]
    fn test_call_with_timeout_times_out() {
        let result: std::result::Result<u32, _> = call_with_timeout(Duration::from_millis(20), || {
            thread::sleep(Duration::from_millis(500));
            Ok(1)
        });
        assert_eq!(result, Err(CollaboratorError::TimedOut));
    }

    #[test]
    fn test_call_with_timeout_survives_panic() {
        let result: std::result::Result<u32, _> =
            call_with_timeout(Duration::from_secs(5), || panic!("collaborator crashed"));
        assert!(matches!(result, Err(CollaboratorError::Failed(_))));
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier(" 1.A. "), "1.a");
        assert_eq!(normalize_identifier("(3)"), "3");
        assert_eq!(normalize_identifier("12:"), "12");
    }

    #[test]
    fn test_into_candidates() {
        let proposals = vec![
            SemanticField {
                identifier: "2.B".to_string(),
                label: "  Date   of Birth ".to_string(),
                type_hint: Some("date".to_string()),
                parent: None,
            },
            SemanticField {
                identifier: "".to_string(),
                label: "orphan".to_string(),
                type_hint: None,
                parent: None,
            },
            SemanticField {
                identifier: "Q".to_string(),
                label: "Other".to_string(),
                type_hint: Some("parent".to_string()),
                parent: Some("4".to_string()),
            },
        ];
        let fields = into_candidates(proposals, 3, 150, 10);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].identifier, "2.b");
        assert_eq!(fields[0].label, "Date of Birth");
        assert_eq!(fields[0].kind, FieldKind::Date);
        assert_eq!(fields[0].parent_identifier.as_deref(), Some("2"));
        assert_eq!(fields[0].position, 10);
        assert_eq!(fields[0].extraction_source, ExtractionSource::SemanticExtractor);
        assert_eq!(fields[1].kind, FieldKind::Text);
        assert_eq!(fields[1].parent_identifier.as_deref(), Some("4"));
        assert_eq!(fields[1].position, 11);
    }

    #[test]
    fn test_recorded_extractor() {
        let mut responses = BTreeMap::new();
        responses.insert(
            2,
            vec![SemanticField {
                identifier: "1".to_string(),
                label: "Height".to_string(),
                type_hint: None,
                parent: None,
            }],
        );
        let extractor = RecordedExtractor::new(responses);
        assert_eq!(extractor.extract_fields("", 2).unwrap().len(), 1);
        assert!(extractor.extract_fields("", 5).unwrap().is_empty());
    }
}
