//! Pattern-based field matcher.
//!
//! Runs an ordered list of field shapes over a part's text. Earlier shapes
//! win when two shapes produce the same identifier, and within a shape the
//! first occurrence wins.

use std::collections::HashSet;

use regex::{Captures, Regex};
use tracing::debug;

use crate::models::config::ExtractionConfig;
use crate::models::document::{Field, FieldKind};

use super::choices::{yes_no_choices, ChoiceExtractor};
use super::patterns::*;
use super::FieldMatcher;

/// Field shapes in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// `1.a. Label`
    LetteredSubfield,
    /// `1. Label`
    Numbered,
    /// `1.2. Label`
    NumericSubfield,
    /// `(1) Label`
    Parenthesized,
    /// `1 - Label`
    Dashed,
    /// `1 Are you ...?`
    Interrogative,
}

impl FieldShape {
    pub const ALL: [FieldShape; 6] = [
        FieldShape::LetteredSubfield,
        FieldShape::Numbered,
        FieldShape::NumericSubfield,
        FieldShape::Parenthesized,
        FieldShape::Dashed,
        FieldShape::Interrogative,
    ];

    fn regex(&self) -> &'static Regex {
        match self {
            FieldShape::LetteredSubfield => &LETTERED_SUBFIELD,
            FieldShape::Numbered => &NUMBERED_FIELD,
            FieldShape::NumericSubfield => &NUMERIC_SUBFIELD,
            FieldShape::Parenthesized => &PARENTHESIZED_FIELD,
            FieldShape::Dashed => &DASHED_FIELD,
            FieldShape::Interrogative => &INTERROGATIVE_FIELD,
        }
    }

    /// Identifier and label capture group of a match.
    fn split<'t>(&self, caps: &Captures<'t>) -> Option<(String, regex::Match<'t>)> {
        match self {
            FieldShape::LetteredSubfield => Some((
                format!("{}.{}", &caps[1], caps[2].to_lowercase()),
                caps.get(3)?,
            )),
            FieldShape::NumericSubfield => {
                Some((format!("{}.{}", &caps[1], &caps[2]), caps.get(3)?))
            }
            _ => Some((caps[1].to_string(), caps.get(2)?)),
        }
    }
}

/// Regex-driven field matcher with checkbox detection.
#[derive(Debug, Clone)]
pub struct PatternFieldMatcher {
    span_chars: usize,
    label_max_chars: usize,
    checkbox_window_chars: usize,
    choices: ChoiceExtractor,
}

impl PatternFieldMatcher {
    /// Create a matcher with default limits.
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            span_chars: config.matcher_span_chars,
            label_max_chars: config.label_max_chars,
            checkbox_window_chars: config.checkbox_window_chars,
            choices: ChoiceExtractor::new(config.max_choices),
        }
    }

    /// Set the number of characters scanned per part.
    pub fn with_span_chars(mut self, chars: usize) -> Self {
        self.span_chars = chars;
        self
    }

    /// Attach checkbox or radio options found after a field.
    fn detect_choices(&self, field: &mut Field, following: &str) {
        let mut window = char_prefix(following, self.checkbox_window_chars);
        if let Some(next_item) = ITEM_START.find(window).filter(|m| m.start() > 0) {
            window = &window[..next_item.start()];
        }

        if let Some(group) = self.choices.extract(window) {
            field.kind = if group.radio {
                FieldKind::Radio
            } else {
                FieldKind::Checkbox
            };
            field.choices = group.choices;
        } else if YES_NO_PAIR.is_match(window) {
            field.kind = FieldKind::Checkbox;
            field.choices = yes_no_choices();
        }
    }
}

impl Default for PatternFieldMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMatcher for PatternFieldMatcher {
    fn match_fields(&self, text: &str, part_number: u32) -> Vec<Field> {
        let span = char_prefix(text, self.span_chars);
        let mut seen: HashSet<String> = HashSet::new();
        let mut fields: Vec<Field> = Vec::new();

        for shape in FieldShape::ALL {
            for caps in shape.regex().captures_iter(span) {
                let Some((identifier, label_match)) = shape.split(&caps) else {
                    continue;
                };
                if seen.contains(&identifier) {
                    continue;
                }

                // Labels stop at the first inline checkbox; the options belong to the window.
                let raw_label = label_match.as_str();
                let (label_text, window_start) = match CHOICE_MARKER.find(raw_label) {
                    Some(marker) => (
                        &raw_label[..marker.start()],
                        label_match.start() + marker.start(),
                    ),
                    None => (raw_label, label_match.end()),
                };

                let label = normalize_label(label_text, self.label_max_chars);
                if label.is_empty() {
                    continue;
                }

                seen.insert(identifier.clone());
                let mut field = Field::new(identifier, label, part_number, fields.len());
                self.detect_choices(&mut field, &span[window_start..]);
                fields.push(field);
            }
        }

        debug!(
            "Pattern matcher found {} candidate fields in part {}",
            fields.len(),
            part_number
        );
        fields
    }
}
