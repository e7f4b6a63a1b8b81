//! Export views of a mapped document.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::document::{Choice, Document, FieldKind, MappingSource};

/// A mapped field as seen from its schema object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedEntry {
    pub part: u32,
    pub identifier: String,
    pub label: String,
    pub kind: FieldKind,
    pub target_path: String,
    pub source: MappingSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A field waiting for manual completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionnaireEntry {
    pub identifier: String,
    pub label: String,
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_identifier: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Questionnaire fields of one part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionnairePart {
    pub number: u32,
    pub title: String,
    pub fields: Vec<QuestionnaireEntry>,
}

/// Everything a caller needs to render or persist a processed form.
#[derive(Debug, Clone, Serialize)]
pub struct ExportBundle {
    pub generated_at: DateTime<Utc>,
    pub page_count: u32,
    pub field_count: usize,
    /// Mapped fields keyed by schema object.
    pub mapped: BTreeMap<String, Vec<MappedEntry>>,
    /// Values nested by dotted target path.
    pub target: Value,
    pub questionnaire: Vec<QuestionnairePart>,
}

/// Mapped fields grouped by target object, each group in document order.
pub fn mapped_by_object(doc: &Document) -> BTreeMap<String, Vec<MappedEntry>> {
    let mut groups: BTreeMap<String, Vec<MappedEntry>> = BTreeMap::new();
    for field in doc.iter_fields() {
        let Some(mapping) = &field.mapping else {
            continue;
        };
        groups
            .entry(mapping.target_object.clone())
            .or_default()
            .push(MappedEntry {
                part: field.part_number,
                identifier: field.identifier.clone(),
                label: field.label.clone(),
                kind: field.kind,
                target_path: mapping.target_path.clone(),
                source: mapping.source,
                value: field.value.clone(),
            });
    }
    groups
}

/// Questionnaire fields grouped by part. Parts without any are omitted.
pub fn questionnaire_by_part(doc: &Document) -> Vec<QuestionnairePart> {
    doc.parts
        .iter()
        .filter_map(|part| {
            let fields: Vec<QuestionnaireEntry> = part
                .fields
                .iter()
                .filter(|f| f.in_questionnaire)
                .map(|f| QuestionnaireEntry {
                    identifier: f.identifier.clone(),
                    label: f.label.clone(),
                    kind: f.kind,
                    parent_identifier: f.parent_identifier.clone(),
                    choices: f.choices.clone(),
                    value: f.value.clone(),
                })
                .collect();
            (!fields.is_empty()).then(|| QuestionnairePart {
                number: part.number,
                title: part.title.clone(),
                fields,
            })
        })
        .collect()
}

/// Nest mapped values by dotted path: `applicant.family_name` becomes
/// `{"applicant": {"family_name": ...}}`. Unfilled fields are `null`.
///
/// When two fields share a path the first non-null value is kept.
pub fn to_target_json(doc: &Document) -> Value {
    let mut root = Map::new();
    for field in doc.iter_fields() {
        let Some(mapping) = &field.mapping else {
            continue;
        };
        let value = field.value.clone().map(Value::String).unwrap_or(Value::Null);
        insert_path(&mut root, &mapping.target_path, value);
    }
    Value::Object(root)
}

fn insert_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut node = root;
    for segment in segments {
        let entry = node
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            debug!("Path {} overrides a value at segment {}", path, segment);
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        node = next;
    }

    match node.get(leaf) {
        Some(existing) if !existing.is_null() => {}
        _ => {
            node.insert(leaf.to_string(), value);
        }
    }
}

/// Build all export views.
pub fn export(doc: &Document) -> ExportBundle {
    ExportBundle {
        generated_at: Utc::now(),
        page_count: doc.page_count,
        field_count: doc.field_count(),
        mapped: mapped_by_object(doc),
        target: to_target_json(doc),
        questionnaire: questionnaire_by_part(doc),
    }
}
