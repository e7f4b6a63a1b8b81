//! End-to-end extraction and mapping scenarios.

use std::collections::HashSet;
use std::sync::Arc;

use formx_core::extract::ordering::compare_identifiers;
use formx_core::extract::{FieldMatcher, PatternFieldMatcher};
use formx_core::semantic::CollaboratorError;
use formx_core::{
    export, CancellationToken, Choice, Document, ExtractionError, FieldKind, FormExtractor, FormxConfig,
    MappingEngine, MappingSource, SemanticExtractor, SemanticField, SharedDocument, SourceText, TargetSchema,
};
use pretty_assertions::assert_eq;

const SAMPLE_FORM: &str = "\
Part 1. Information About You
1. Your Full Name
1.a. Family Name (Last Name)
1.b. Given Name (First Name)
1.c. Middle Name
2. Date of Birth (mm/dd/yyyy)
3. Are you currently married?
☐ Yes
☐ No
4. Preferred pizza topping
Part 2. Biographic Information
1. Gender
○ Male
○ Female
2. Height
Part 3. Contact Information
1. Daytime Telephone Number
2. Email Address
Part 2. Biographic Information (continued)
3. Eye Color
Part 4. Signature
1. Applicant's Signature
2. Date of Signature
";

fn run(text: &str) -> (Document, Vec<ExtractionError>) {
    let report = FormExtractor::default().extract(&SourceText::new(text, 1));
    (report.document, report.warnings)
}

fn ids(doc: &Document, part: u32) -> Vec<String> {
    doc.part(part)
        .map(|p| p.fields.iter().map(|f| f.identifier.clone()).collect())
        .unwrap_or_default()
}

#[test]
fn identifier_order() {
    use std::cmp::Ordering::Less;
    assert_eq!(compare_identifiers("1", "1.a"), Less);
    assert_eq!(compare_identifiers("1.a", "1.b"), Less);
    assert_eq!(compare_identifiers("1.b", "2"), Less);
    assert_eq!(compare_identifiers("2", "10"), Less);
}

#[test]
fn single_numbered_field() {
    let (doc, _) = run("Part 1. About You\n1. Family Name\n");
    let part = doc.part(1).unwrap();
    assert_eq!(part.fields.len(), 1);

    let field = &part.fields[0];
    assert_eq!(field.identifier, "1");
    assert_eq!(field.label, "Family Name");
    assert_eq!(field.kind, FieldKind::Text);
    assert!(field.parent_identifier.is_none());
}

#[test]
fn subfield_parent_synthesis() {
    let (doc, _) = run("Part 1. About You\n1.a. Last Name\n1.b. First Name\n");
    assert_eq!(ids(&doc, 1), vec!["1", "1.a", "1.b"]);

    let parent = doc.field(1, "1").unwrap();
    assert_eq!(parent.label, "Field 1");
    assert_eq!(parent.kind, FieldKind::Parent);
    assert!(parent.is_parent);
    assert_eq!(doc.field(1, "1.b").unwrap().parent_identifier.as_deref(), Some("1"));
}

#[test]
fn checkbox_detection() {
    let (doc, _) = run("Part 1. About You\n1. Are you married?\n☐ Yes\n☐ No\n");
    let field = doc.field(1, "1").unwrap();
    assert_eq!(field.kind, FieldKind::Checkbox);
    assert_eq!(
        field.choices,
        vec![
            Choice { letter: 'a', text: "Yes".to_string(), selected: false },
            Choice { letter: 'b', text: "No".to_string(), selected: false },
        ]
    );
}

#[test]
fn continued_part_merge() {
    let (doc, _) = run(SAMPLE_FORM);
    let numbers: Vec<u32> = doc.parts.iter().map(|p| p.number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);

    let part = doc.part(2).unwrap();
    assert_eq!(part.title, "Biographic Information");
    assert_eq!(ids(&doc, 2), vec!["1", "2", "3"]);
    assert_eq!(part.fields[0].kind, FieldKind::Radio);
    assert_eq!(part.fields[2].label, "Eye Color");
}

#[test]
fn sample_form_kinds() {
    let (doc, warnings) = run(SAMPLE_FORM);
    assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);

    let kind = |part: u32, id: &str| doc.field(part, id).unwrap().kind;
    assert_eq!(kind(1, "1"), FieldKind::Parent);
    assert_eq!(kind(1, "2"), FieldKind::Date);
    assert_eq!(kind(1, "3"), FieldKind::Checkbox);
    assert_eq!(kind(1, "4"), FieldKind::Text);
    assert_eq!(kind(3, "1"), FieldKind::Number);
    assert_eq!(kind(4, "1"), FieldKind::Signature);
    assert_eq!(kind(4, "2"), FieldKind::Date);
}

#[test]
fn pattern_matcher_is_deterministic() {
    let matcher = PatternFieldMatcher::new();
    let first = matcher.match_fields(SAMPLE_FORM, 1);
    let second = matcher.match_fields(SAMPLE_FORM, 1);
    let summary = |fields: &[formx_core::Field]| -> Vec<(String, String, FieldKind, usize)> {
        fields
            .iter()
            .map(|f| (f.identifier.clone(), f.label.clone(), f.kind, f.position))
            .collect()
    };
    assert_eq!(summary(&first), summary(&second));
}

#[test]
fn no_duplicates_or_orphans() {
    let text = "Part 1. A\n3.b. Zip\n1. Name\n1. Name again\n2.a. Street\n(5) Phone\n7 - City\n";
    let (doc, _) = run(text);
    for part in &doc.parts {
        let identifiers: HashSet<&str> = part.fields.iter().map(|f| f.identifier.as_str()).collect();
        assert_eq!(identifiers.len(), part.fields.len(), "duplicate identifier in part {}", part.number);
        for field in &part.fields {
            if let Some(parent) = &field.parent_identifier {
                assert!(identifiers.contains(parent.as_str()), "orphan {}", field.identifier);
            }
        }
    }
    assert_eq!(ids(&doc, 1), vec!["1", "2", "2.a", "3", "3.b", "5", "7"]);
}

#[test]
fn mapping_fallback_to_questionnaire() {
    let (mut doc, _) = run("Part 5. Preferences\n37. Preferred pizza topping\n");
    let report = MappingEngine::default().apply(&mut doc);

    let field = doc.field(5, "37").unwrap();
    assert!(field.in_questionnaire);
    assert!(field.mapping.is_none());
    assert_eq!(report.questionnaire, 1);
}

#[test]
fn mapping_exclusivity() {
    let (mut doc, _) = run(SAMPLE_FORM);
    MappingEngine::default().apply(&mut doc);

    for field in doc.iter_fields() {
        assert!(field.resolution_is_consistent(), "field {} in part {}", field.identifier, field.part_number);
    }

    let target = |part: u32, id: &str| {
        doc.field(part, id)
            .and_then(|f| f.mapping.as_ref())
            .map(|m| (m.target_path.clone(), m.source))
    };
    assert_eq!(
        target(1, "1.a"),
        Some(("applicant.family_name".to_string(), MappingSource::IdentifierRule))
    );
    assert_eq!(
        target(1, "2"),
        Some(("applicant.date_of_birth".to_string(), MappingSource::LabelRule))
    );
    assert_eq!(
        target(3, "2"),
        Some(("contact.email".to_string(), MappingSource::LabelRule))
    );
    assert_eq!(
        target(4, "2"),
        Some(("signature.date_of_signature".to_string(), MappingSource::LabelRule))
    );
    assert!(doc.field(1, "4").unwrap().in_questionnaire);
}

#[test]
fn manual_edits_survive_remapping() {
    let (doc, _) = run(SAMPLE_FORM);
    let shared = SharedDocument::new(doc);
    let engine = MappingEngine::default();
    let schema = TargetSchema::default();

    shared.map_with(&engine);
    shared
        .edit(|doc| doc.set_manual_mapping(1, "4", "applicant.other_names", &schema))
        .unwrap();
    shared.edit(|doc| doc.set_manual_questionnaire(3, "2")).unwrap();
    let report = shared.map_with(&engine);
    assert_eq!(report.manual_kept, 2);

    let doc = shared.snapshot();
    assert_eq!(
        doc.field(1, "4").unwrap().mapping.as_ref().unwrap().source,
        MappingSource::Manual
    );
    assert!(doc.field(3, "2").unwrap().in_questionnaire);
}

#[test]
fn export_views() {
    let (mut doc, _) = run(SAMPLE_FORM);
    MappingEngine::default().apply(&mut doc);
    doc.set_value(3, "2", Some("jane@example.com".to_string())).unwrap();

    let bundle = export(&doc);
    assert!(bundle.mapped.contains_key("applicant"));
    assert_eq!(bundle.target["contact"]["email"], "jane@example.com");

    let parts: Vec<u32> = bundle.questionnaire.iter().map(|p| p.number).collect();
    let mut sorted = parts.clone();
    sorted.sort_unstable();
    assert_eq!(parts, sorted);
    assert!(bundle.questionnaire[0]
        .fields
        .iter()
        .any(|f| f.label == "Preferred pizza topping"));
}

struct ScriptedExtractor;

impl SemanticExtractor for ScriptedExtractor {
    fn extract_fields(&self, _excerpt: &str, part: u32) -> Result<Vec<SemanticField>, CollaboratorError> {
        match part {
            1 => Ok(vec![
                SemanticField {
                    identifier: "1.a".to_string(),
                    label: "Surname (semantic)".to_string(),
                    type_hint: None,
                    parent: None,
                },
                SemanticField {
                    identifier: "5".to_string(),
                    label: "Mother's maiden name".to_string(),
                    type_hint: Some("text".to_string()),
                    parent: None,
                },
            ]),
            _ => Err(CollaboratorError::Unavailable("offline".to_string())),
        }
    }
}

#[test]
fn semantic_extractor_merges_without_overriding_patterns() {
    let extractor = FormExtractor::default().with_semantic_extractor(Arc::new(ScriptedExtractor));
    let report = extractor.extract(&SourceText::new(SAMPLE_FORM, 1));

    let doc = &report.document;
    assert_eq!(doc.field(1, "1.a").unwrap().label, "Family Name (Last Name)");
    assert_eq!(doc.field(1, "5").unwrap().label, "Mother's maiden name");

    let unavailable = report
        .warnings
        .iter()
        .filter(|w| matches!(w, ExtractionError::SemanticExtractorUnavailable { .. }))
        .count();
    assert_eq!(unavailable, 3);
    assert_eq!(doc.part(2).unwrap().fields.len(), 3);
}

/// Cancels the run while the first part is being extracted.
struct CancelDuringFirstPart(CancellationToken);

impl SemanticExtractor for CancelDuringFirstPart {
    fn extract_fields(&self, _excerpt: &str, part: u32) -> Result<Vec<SemanticField>, CollaboratorError> {
        if part == 1 {
            self.0.cancel();
        }
        Ok(Vec::new())
    }
}

#[test]
fn cancellation_keeps_completed_parts() {
    let shared = SharedDocument::default();
    let cancel = CancellationToken::new();
    let extractor =
        FormExtractor::default().with_semantic_extractor(Arc::new(CancelDuringFirstPart(cancel.clone())));
    let text = "Part 1. About You\n1. Family Name\n2. Given Name\nPart 2. Contact\n1. Email Address\n";

    let report = shared.extract_into(&extractor, &SourceText::new(text, 1), &cancel);
    assert!(report.cancelled);
    assert_eq!(report.warnings, vec![ExtractionError::Cancelled { part: 2 }]);

    let doc = shared.snapshot();
    assert_eq!(doc.parts.len(), 1);
    assert_eq!(ids(&doc, 1), vec!["1", "2"]);
    assert!(doc.part(2).is_none());
}

#[test]
fn cancellation_before_start_extracts_nothing() {
    let shared = SharedDocument::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = shared.extract_into(&FormExtractor::default(), &SourceText::new(SAMPLE_FORM, 1), &cancel);
    assert!(report.cancelled);
    assert_eq!(report.warnings, vec![ExtractionError::Cancelled { part: 1 }]);
    assert_eq!(shared.snapshot().parts.len(), 0);
}

#[test]
fn parallel_extraction_matches_sequential() {
    let mut config = FormxConfig::default();
    config.extraction.parallel_parts = true;

    let (sequential, _) = run(SAMPLE_FORM);
    let parallel = FormExtractor::new(config).extract(&SourceText::new(SAMPLE_FORM, 1)).document;

    for (a, b) in sequential.parts.iter().zip(&parallel.parts) {
        assert_eq!(a.number, b.number);
        assert_eq!(a.title, b.title);
        let labels = |p: &formx_core::Part| p.fields.iter().map(|f| f.label.clone()).collect::<Vec<_>>();
        assert_eq!(labels(a), labels(b));
    }
}
