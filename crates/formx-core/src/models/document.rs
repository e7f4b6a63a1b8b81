//! Form document model: document → parts → fields → choices.

use serde::{Deserialize, Serialize};

use crate::error::MappingError;
use crate::extract::ordering::{parent_of, sort_fields};
use crate::models::schema::TargetSchema;

/// A fully extracted form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Parts in ascending part-number order.
    pub parts: Vec<Part>,

    /// Number of pages reported by the text source.
    #[serde(default)]
    pub page_count: u32,
}

/// A top-level numbered section of a form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    /// Part number (1-based, unique within the document).
    pub number: u32,

    /// Heading title, without continuation markers.
    pub title: String,

    /// Fields in canonical identifier order.
    pub fields: Vec<Field>,
}

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text.
    #[default]
    Text,
    /// Calendar date.
    Date,
    /// Identifier or numeric value.
    Number,
    /// Checkbox group (or yes/no question).
    Checkbox,
    /// Mutually exclusive option group.
    Radio,
    /// Signature block.
    Signature,
    /// Container for subfields, carries no value itself.
    Parent,
}

impl FieldKind {
    /// Parse a loose type hint such as `"date"` or `"checkbox"`.
    pub fn from_hint(hint: &str) -> Option<Self> {
        let hint = hint.trim().to_lowercase();
        match hint.as_str() {
            "text" | "string" => Some(FieldKind::Text),
            "date" => Some(FieldKind::Date),
            "number" | "numeric" | "integer" | "id" => Some(FieldKind::Number),
            "checkbox" | "boolean" | "bool" => Some(FieldKind::Checkbox),
            "radio" => Some(FieldKind::Radio),
            "signature" => Some(FieldKind::Signature),
            "parent" | "group" => Some(FieldKind::Parent),
            _ => None,
        }
    }

    /// Lowercase display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Date => "date",
            FieldKind::Number => "number",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Radio => "radio",
            FieldKind::Signature => "signature",
            FieldKind::Parent => "parent",
        }
    }

    /// Whether this kind carries a choice group.
    pub fn has_choices(&self) -> bool {
        matches!(self, FieldKind::Checkbox | FieldKind::Radio)
    }
}

/// Where a field came from. Used for display only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    /// Local regular-expression patterns.
    #[default]
    Pattern,
    /// External semantic extractor.
    SemanticExtractor,
}

/// Which resolution tier produced a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingSource {
    /// Exact identifier rule.
    IdentifierRule,
    /// Label keyword rule.
    LabelRule,
    /// External semantic batch classifier.
    SemanticClassifier,
    /// Set by the user.
    Manual,
}

/// Target-schema destination of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Schema object the path belongs to.
    pub target_object: String,

    /// Dotted destination path.
    pub target_path: String,

    /// Resolution tier.
    pub source: MappingSource,
}

/// One selectable option of a checkbox or radio group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Sequential letter starting at `'a'`.
    pub letter: char,

    /// Option text.
    pub text: String,

    /// Whether the option was marked in the source.
    #[serde(default)]
    pub selected: bool,
}

/// A single numbered or lettered item within a part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// Raw item label such as `"1"`, `"1.a"` or `"12"`.
    pub identifier: String,

    /// Whitespace-normalized prompt text.
    pub label: String,

    /// Semantic type. A hint, not ground truth.
    pub kind: FieldKind,

    /// Number of the owning part.
    pub part_number: u32,

    /// Identifier of the numbered parent for subfields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_identifier: Option<String>,

    /// Has at least one subfield.
    #[serde(default)]
    pub is_parent: bool,

    /// Is a child of another field.
    #[serde(default)]
    pub is_subfield: bool,

    /// Options for checkbox/radio groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,

    /// Entered or extracted value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Schema destination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<FieldMapping>,

    /// Queued for manual completion.
    #[serde(default)]
    pub in_questionnaire: bool,

    /// Resolution was set by the user and is never changed automatically.
    #[serde(default)]
    pub manual_override: bool,

    /// Provenance.
    #[serde(default)]
    pub extraction_source: ExtractionSource,

    /// Discovery order. Tie-break only.
    pub position: usize,
}

impl Field {
    /// Create a field; subfield relationship is derived from the identifier shape.
    pub fn new(
        identifier: impl Into<String>,
        label: impl Into<String>,
        part_number: u32,
        position: usize,
    ) -> Self {
        let identifier = identifier.into();
        let parent_identifier = parent_of(&identifier);
        Self {
            is_subfield: parent_identifier.is_some(),
            parent_identifier,
            identifier,
            label: label.into(),
            kind: FieldKind::Text,
            part_number,
            is_parent: false,
            choices: Vec::new(),
            value: None,
            mapping: None,
            in_questionnaire: false,
            manual_override: false,
            extraction_source: ExtractionSource::Pattern,
            position,
        }
    }

    /// Placeholder container for subfields whose numbered parent was never matched.
    pub fn synthesized_parent(identifier: &str, part_number: u32, position: usize) -> Self {
        let mut field = Self::new(identifier, format!("Field {}", identifier), part_number, position);
        field.kind = FieldKind::Parent;
        field.is_parent = true;
        field
    }

    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_source(mut self, source: ExtractionSource) -> Self {
        self.extraction_source = source;
        self
    }

    pub fn with_parent(mut self, parent: Option<String>) -> Self {
        if let Some(parent) = parent.filter(|p| !p.is_empty() && *p != self.identifier) {
            self.parent_identifier = Some(parent);
            self.is_subfield = true;
        }
        self
    }

    /// Whether the field is a value-less container.
    pub fn is_container(&self) -> bool {
        self.kind == FieldKind::Parent
    }

    /// Exactly one of mapping/questionnaire holds (neither for containers).
    pub fn resolution_is_consistent(&self) -> bool {
        if self.is_container() {
            self.mapping.is_none() && !self.in_questionnaire
        } else {
            self.mapping.is_some() != self.in_questionnaire
        }
    }

    /// Whether the field has been resolved either way.
    pub fn is_resolved(&self) -> bool {
        self.mapping.is_some() || self.in_questionnaire
    }

    pub(crate) fn assign_mapping(&mut self, mapping: FieldMapping) {
        self.mapping = Some(mapping);
        self.in_questionnaire = false;
    }

    pub(crate) fn assign_questionnaire(&mut self) {
        self.mapping = None;
        self.in_questionnaire = true;
    }
}

impl Part {
    pub fn new(number: u32, title: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            fields: Vec::new(),
        }
    }

    /// Look up a field by identifier.
    pub fn field(&self, identifier: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.identifier == identifier)
    }

    pub fn field_mut(&mut self, identifier: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.identifier == identifier)
    }

    /// Direct children of a field, in canonical order.
    pub fn children_of<'a>(&'a self, identifier: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields
            .iter()
            .filter(move |f| f.parent_identifier.as_deref() == Some(identifier))
    }

    /// Restore canonical identifier order.
    pub fn sort_fields(&mut self) {
        sort_fields(&mut self.fields);
    }
}

impl Document {
    pub fn new(parts: Vec<Part>, page_count: u32) -> Self {
        Self { parts, page_count }
    }

    pub fn part(&self, number: u32) -> Option<&Part> {
        self.parts.iter().find(|p| p.number == number)
    }

    pub fn part_mut(&mut self, number: u32) -> Option<&mut Part> {
        self.parts.iter_mut().find(|p| p.number == number)
    }

    pub fn field(&self, part: u32, identifier: &str) -> Option<&Field> {
        self.part(part).and_then(|p| p.field(identifier))
    }

    pub fn field_mut(&mut self, part: u32, identifier: &str) -> Option<&mut Field> {
        self.part_mut(part).and_then(|p| p.field_mut(identifier))
    }

    /// All fields, part by part, in canonical order.
    pub fn iter_fields(&self) -> impl Iterator<Item = &Field> {
        self.parts.iter().flat_map(|p| p.fields.iter())
    }

    pub fn iter_fields_mut(&mut self) -> impl Iterator<Item = &mut Field> {
        self.parts.iter_mut().flat_map(|p| p.fields.iter_mut())
    }

    pub fn field_count(&self) -> usize {
        self.parts.iter().map(|p| p.fields.len()).sum()
    }

    /// Fields queued for manual completion.
    pub fn questionnaire_fields(&self) -> impl Iterator<Item = &Field> {
        self.iter_fields().filter(|f| f.in_questionnaire)
    }

    /// Enter a value for a field.
    pub fn set_value(
        &mut self,
        part: u32,
        identifier: &str,
        value: Option<String>,
    ) -> Result<(), MappingError> {
        let field = self.require_field_mut(part, identifier)?;
        field.value = value;
        Ok(())
    }

    /// Force a field onto a schema path. Overrides any automatic result.
    pub fn set_manual_mapping(
        &mut self,
        part: u32,
        identifier: &str,
        target_path: &str,
        schema: &TargetSchema,
    ) -> Result<(), MappingError> {
        let target_object = schema
            .object_for(target_path)
            .ok_or_else(|| MappingError::UnknownTargetPath(target_path.to_string()))?
            .to_string();

        let field = self.require_field_mut(part, identifier)?;
        if field.is_container() {
            return Err(MappingError::ParentField {
                part,
                identifier: identifier.to_string(),
            });
        }

        field.assign_mapping(FieldMapping {
            target_object,
            target_path: target_path.to_string(),
            source: MappingSource::Manual,
        });
        field.manual_override = true;
        Ok(())
    }

    /// Force a field into the questionnaire. Overrides any automatic result.
    pub fn set_manual_questionnaire(&mut self, part: u32, identifier: &str) -> Result<(), MappingError> {
        let field = self.require_field_mut(part, identifier)?;
        if field.is_container() {
            return Err(MappingError::ParentField {
                part,
                identifier: identifier.to_string(),
            });
        }
        field.assign_questionnaire();
        field.manual_override = true;
        Ok(())
    }

    /// Drop a manual decision so the next mapping run resolves the field again.
    /// Until then the field waits in the questionnaire.
    pub fn clear_manual_override(&mut self, part: u32, identifier: &str) -> Result<(), MappingError> {
        let field = self.require_field_mut(part, identifier)?;
        field.manual_override = false;
        if field.is_container() {
            field.mapping = None;
            field.in_questionnaire = false;
        } else {
            field.assign_questionnaire();
        }
        Ok(())
    }

    fn require_field_mut(&mut self, part: u32, identifier: &str) -> Result<&mut Field, MappingError> {
        self.field_mut(part, identifier)
            .ok_or_else(|| MappingError::UnknownField {
                part,
                identifier: identifier.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut part = Part::new(1, "Information About You");
        part.fields.push(Field::synthesized_parent("1", 1, 2));
        part.fields.push(Field::new("1.a", "Family Name", 1, 0));
        part.fields.push(Field::new("1.b", "Given Name", 1, 1));
        Document::new(vec![part], 3)
    }

    #[test]
    fn test_field_new_derives_subfield() {
        let field = Field::new("1.a", "Family Name", 1, 0);
        assert!(field.is_subfield);
        assert_eq!(field.parent_identifier.as_deref(), Some("1"));

        let field = Field::new("12", "Email", 1, 0);
        assert!(!field.is_subfield);
        assert!(field.parent_identifier.is_none());
    }

    #[test]
    fn test_synthesized_parent() {
        let field = Field::synthesized_parent("4", 2, 9);
        assert_eq!(field.label, "Field 4");
        assert_eq!(field.kind, FieldKind::Parent);
        assert!(field.is_parent);
        assert!(field.resolution_is_consistent());
    }

    #[test]
    fn test_kind_from_hint() {
        assert_eq!(FieldKind::from_hint("Date"), Some(FieldKind::Date));
        assert_eq!(FieldKind::from_hint(" boolean "), Some(FieldKind::Checkbox));
        assert_eq!(FieldKind::from_hint("blob"), None);
    }

    #[test]
    fn test_manual_mapping_and_questionnaire() {
        let schema = TargetSchema::default();
        let mut doc = sample();

        doc.set_manual_mapping(1, "1.a", "applicant.family_name", &schema)
            .unwrap();
        let field = doc.field(1, "1.a").unwrap();
        assert!(field.manual_override);
        assert_eq!(field.mapping.as_ref().unwrap().target_object, "applicant");
        assert!(field.resolution_is_consistent());

        doc.set_manual_questionnaire(1, "1.a").unwrap();
        let field = doc.field(1, "1.a").unwrap();
        assert!(field.in_questionnaire);
        assert!(field.mapping.is_none());

        doc.set_manual_mapping(1, "1.a", "applicant.family_name", &schema)
            .unwrap();
        doc.clear_manual_override(1, "1.a").unwrap();
        let field = doc.field(1, "1.a").unwrap();
        assert!(!field.manual_override);
        assert!(field.in_questionnaire);
        assert!(field.resolution_is_consistent());
    }

    #[test]
    fn test_manual_mapping_rejects_unknown_targets() {
        let schema = TargetSchema::default();
        let mut doc = sample();

        assert_eq!(
            doc.set_manual_mapping(1, "1.a", "nowhere.at_all", &schema),
            Err(MappingError::UnknownTargetPath("nowhere.at_all".to_string()))
        );
        assert!(matches!(
            doc.set_manual_mapping(1, "9", "applicant.family_name", &schema),
            Err(MappingError::UnknownField { .. })
        ));
        assert!(matches!(
            doc.set_manual_questionnaire(1, "1"),
            Err(MappingError::ParentField { .. })
        ));
    }

    #[test]
    fn test_children_of() {
        let doc = sample();
        let part = doc.part(1).unwrap();
        let children: Vec<_> = part.children_of("1").map(|f| f.identifier.as_str()).collect();
        assert_eq!(children, vec!["1.a", "1.b"]);
    }
}
