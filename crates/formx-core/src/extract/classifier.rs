//! Label-based field type classification.
//!
//! Best effort only: the result is a hint for display and mapping, never a
//! guarantee about the value a field holds.

use crate::models::document::{Field, FieldKind};

use super::patterns::{DATE_TERMS, NUMBER_TERMS, QUESTION_TERMS, SIGNATURE_TERMS};

/// Classify a label. Rules are checked in order and the first match wins.
pub fn classify_label(label: &str) -> FieldKind {
    if DATE_TERMS.is_match(label) {
        FieldKind::Date
    } else if NUMBER_TERMS.is_match(label) {
        FieldKind::Number
    } else if SIGNATURE_TERMS.is_match(label) {
        FieldKind::Signature
    } else if QUESTION_TERMS.is_match(label) {
        FieldKind::Checkbox
    } else {
        FieldKind::Text
    }
}

/// Assign kinds to fields that are still provisional `Text`.
///
/// Containers, fields with detected choice groups and fields carrying a
/// non-text type hint from the semantic extractor keep their kind.
pub fn classify_fields(fields: &mut [Field]) -> usize {
    let mut changed = 0;
    for field in fields.iter_mut() {
        match field.kind {
            FieldKind::Text if field.choices.is_empty() => {
                let kind = classify_label(&field.label);
                if kind != FieldKind::Text {
                    field.kind = kind;
                    changed += 1;
                }
            }
            FieldKind::Text
            | FieldKind::Date
            | FieldKind::Number
            | FieldKind::Checkbox
            | FieldKind::Radio
            | FieldKind::Signature
            | FieldKind::Parent => {}
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_order() {
        assert_eq!(classify_label("Date of Birth (mm/dd/yyyy)"), FieldKind::Date);
        assert_eq!(classify_label("Passport Expiration Date"), FieldKind::Date);
        assert_eq!(classify_label("Alien Registration Number (A-Number)"), FieldKind::Number);
        assert_eq!(classify_label("U.S. Social Security Number"), FieldKind::Number);
        assert_eq!(classify_label("Receipt No."), FieldKind::Number);
        assert_eq!(classify_label("Applicant's Signature"), FieldKind::Signature);
        assert_eq!(classify_label("Date of Signature"), FieldKind::Date);
        assert_eq!(classify_label("Are you currently employed?"), FieldKind::Checkbox);
        assert_eq!(classify_label("Is your spouse a U.S. citizen?"), FieldKind::Checkbox);
        assert_eq!(classify_label("Family Name"), FieldKind::Text);
    }

    #[test]
    fn test_is_needs_word_boundary() {
        assert_eq!(classify_label("This Address"), FieldKind::Text);
        assert_eq!(classify_label("Preferred pizza topping"), FieldKind::Text);
    }

    #[test]
    fn test_classify_fields_skips_fixed_kinds() {
        let mut fields = vec![
            Field::new("1", "Date of Birth", 1, 0),
            Field::synthesized_parent("2", 1, 1),
            Field::new("3", "Social Security Number", 1, 2).with_kind(FieldKind::Text),
            Field::new("4", "Have you ever been arrested?", 1, 3).with_kind(FieldKind::Radio),
        ];
        let changed = classify_fields(&mut fields);
        assert_eq!(changed, 2);
        assert_eq!(fields[0].kind, FieldKind::Date);
        assert_eq!(fields[1].kind, FieldKind::Parent);
        assert_eq!(fields[2].kind, FieldKind::Number);
        assert_eq!(fields[3].kind, FieldKind::Radio);
    }
}
