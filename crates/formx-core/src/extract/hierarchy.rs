//! Deduplication, parent synthesis and canonical ordering of a part's fields.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::models::document::{Field, FieldKind};

use super::ordering::sort_fields;

/// Outcome of building a part's hierarchy.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    /// Deduplicated fields in canonical order.
    pub fields: Vec<Field>,
    /// Candidates dropped because their identifier was already taken.
    pub duplicates_dropped: usize,
    /// Placeholder parents created for orphaned subfields.
    pub parents_synthesized: usize,
}

/// Turns raw candidates into a complete, ordered field tree.
///
/// Candidates are deduplicated in the order given, so callers pass
/// pattern results before semantic ones to let patterns win.
pub fn build_hierarchy(candidates: Vec<Field>, part_number: u32) -> Hierarchy {
    let mut seen: HashSet<String> = HashSet::new();
    let mut fields: Vec<Field> = Vec::with_capacity(candidates.len());
    let mut duplicates_dropped = 0;

    for mut field in candidates {
        if !seen.insert(field.identifier.clone()) {
            duplicates_dropped += 1;
            continue;
        }
        field.part_number = part_number;
        fields.push(field);
    }

    let mut next_position = fields.iter().map(|f| f.position + 1).max().unwrap_or(0);
    let mut parents_synthesized = 0;

    // Synthesized parents may reference parents of their own; repeat until closed.
    loop {
        let missing: BTreeSet<String> = fields
            .iter()
            .filter_map(|f| f.parent_identifier.clone())
            .filter(|p| !seen.contains(p))
            .collect();
        if missing.is_empty() {
            break;
        }

        for identifier in missing {
            seen.insert(identifier.clone());
            fields.push(Field::synthesized_parent(&identifier, part_number, next_position));
            next_position += 1;
            parents_synthesized += 1;
        }
    }

    let parents: HashSet<String> = fields
        .iter()
        .filter_map(|f| f.parent_identifier.clone())
        .collect();

    for field in fields.iter_mut() {
        if parents.contains(&field.identifier) {
            field.is_parent = true;
            field.kind = FieldKind::Parent;
            field.choices.clear();
        }
    }

    sort_fields(&mut fields);

    debug!(
        "Part {}: {} fields after hierarchy ({} duplicates dropped, {} parents synthesized)",
        part_number,
        fields.len(),
        duplicates_dropped,
        parents_synthesized
    );

    Hierarchy {
        fields,
        duplicates_dropped,
        parents_synthesized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::ExtractionSource;
    use pretty_assertions::assert_eq;

    fn ids(fields: &[Field]) -> Vec<&str> {
        fields.iter().map(|f| f.identifier.as_str()).collect()
    }

    #[test]
    fn test_synthesizes_missing_parent() {
        let candidates = vec![
            Field::new("1.a", "Last Name", 1, 0),
            Field::new("1.b", "First Name", 1, 1),
        ];
        let hierarchy = build_hierarchy(candidates, 1);
        assert_eq!(ids(&hierarchy.fields), vec!["1", "1.a", "1.b"]);
        assert_eq!(hierarchy.parents_synthesized, 1);

        let parent = &hierarchy.fields[0];
        assert_eq!(parent.label, "Field 1");
        assert_eq!(parent.kind, FieldKind::Parent);
        assert!(parent.is_parent);
    }

    #[test]
    fn test_first_candidate_wins() {
        let candidates = vec![
            Field::new("2", "Pattern Label", 1, 0),
            Field::new("2", "Semantic Label", 1, 1).with_source(ExtractionSource::SemanticExtractor),
        ];
        let hierarchy = build_hierarchy(candidates, 1);
        assert_eq!(hierarchy.fields.len(), 1);
        assert_eq!(hierarchy.fields[0].label, "Pattern Label");
        assert_eq!(hierarchy.duplicates_dropped, 1);
    }

    #[test]
    fn test_existing_parent_becomes_container() {
        let candidates = vec![
            Field::new("3.a", "Street", 1, 0),
            Field::new("3", "Mailing Address", 1, 1),
            Field::new("2", "Email", 1, 2),
        ];
        let hierarchy = build_hierarchy(candidates, 1);
        assert_eq!(ids(&hierarchy.fields), vec!["2", "3", "3.a"]);
        assert_eq!(hierarchy.parents_synthesized, 0);
        assert_eq!(hierarchy.fields[1].kind, FieldKind::Parent);
        assert_eq!(hierarchy.fields[1].label, "Mailing Address");
        assert_eq!(hierarchy.fields[0].kind, FieldKind::Text);
    }

    #[test]
    fn test_no_orphans_or_duplicates() {
        let candidates = vec![
            Field::new("10.c", "Zip", 1, 0),
            Field::new("2.a", "Name", 1, 1),
            Field::new("2.a", "Name again", 1, 2),
            Field::new("7", "Phone", 1, 3).with_parent(Some("Q7".to_string())),
        ];
        let hierarchy = build_hierarchy(candidates, 1);

        let identifiers: HashSet<&str> = hierarchy.fields.iter().map(|f| f.identifier.as_str()).collect();
        assert_eq!(identifiers.len(), hierarchy.fields.len());
        for field in &hierarchy.fields {
            if let Some(parent) = &field.parent_identifier {
                assert!(identifiers.contains(parent.as_str()), "orphan {}", field.identifier);
            }
        }
        assert_eq!(ids(&hierarchy.fields), vec!["2", "2.a", "7", "10", "10.c", "Q7"]);
    }
}
