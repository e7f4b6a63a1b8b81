//! Checkbox and radio option group detection.

use tracing::trace;

use crate::models::document::Choice;

use super::patterns::{CHOICE_GLYPHS, CHOICE_OPTION, RADIO_GLYPHS, SELECTED_GLYPHS};

/// Fewer matched options than this are treated as stray symbols.
pub const MIN_GROUP_SIZE: usize = 2;

/// Options are lettered `a` to `z`; larger groups are cut here.
pub const MAX_GROUP_SIZE: usize = 26;

/// A detected option group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceGroup {
    /// Options in source order, lettered from `'a'`.
    pub choices: Vec<Choice>,
    /// Every option used a round glyph or parenthesis box.
    pub radio: bool,
}

/// Detects option groups in the text following a field.
#[derive(Debug, Clone)]
pub struct ChoiceExtractor {
    max_choices: usize,
}

impl ChoiceExtractor {
    pub fn new(max_choices: usize) -> Self {
        Self {
            max_choices: max_choices.clamp(MIN_GROUP_SIZE, MAX_GROUP_SIZE),
        }
    }

    /// Extract an option group from `window`, or `None` when fewer than two options match.
    pub fn extract(&self, window: &str) -> Option<ChoiceGroup> {
        let mut options: Vec<(String, bool, bool)> = Vec::new();

        for caps in CHOICE_OPTION.captures_iter(window) {
            let Some(text_match) = caps.get(5) else {
                continue;
            };

            // A run that keeps going past the cap is prose, not an option.
            if let Some(next) = window[text_match.end()..].chars().next() {
                if !is_run_terminator(next) {
                    continue;
                }
            }

            let text = text_match.as_str().trim();
            if text.chars().count() < 2 {
                continue;
            }

            let glyph = caps.get(1).and_then(|m| m.as_str().chars().next());
            let marked = caps.get(2).or_else(|| caps.get(4)).is_some_and(|m| !m.as_str().is_empty());
            let selected = marked || glyph.is_some_and(|g| SELECTED_GLYPHS.contains(g));
            let radio = caps.get(3).is_some() || glyph.is_some_and(|g| RADIO_GLYPHS.contains(g));

            options.push((text.to_string(), selected, radio));
            if options.len() == self.max_choices {
                break;
            }
        }

        if options.len() < MIN_GROUP_SIZE {
            trace!("Ignoring {} stray choice marker(s)", options.len());
            return None;
        }

        let radio = options.iter().all(|(_, _, radio)| *radio);
        let choices = options
            .into_iter()
            .enumerate()
            .map(|(i, (text, selected, _))| Choice {
                letter: choice_letter(i),
                text,
                selected,
            })
            .collect();

        Some(ChoiceGroup { choices, radio })
    }
}

impl Default for ChoiceExtractor {
    fn default() -> Self {
        Self::new(5)
    }
}

/// Options for a bare "Yes / No" question.
pub fn yes_no_choices() -> Vec<Choice> {
    ["Yes", "No"]
        .iter()
        .enumerate()
        .map(|(i, text)| Choice {
            letter: choice_letter(i),
            text: (*text).to_string(),
            selected: false,
        })
        .collect()
}

fn choice_letter(index: usize) -> char {
    (b'a' + index.min(MAX_GROUP_SIZE - 1) as u8) as char
}

fn is_run_terminator(c: char) -> bool {
    c == '\n' || c == '[' || c == ']' || c == '(' || CHOICE_GLYPHS.contains(c)
}
