//! Splits document text into numbered parts.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::models::config::SegmentationConfig;

use super::patterns::{char_prefix, normalize_label, CONTINUED_MARKER, PART_HEADING};

/// Text belonging to one part, before field extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartText {
    /// Part number from the heading.
    pub number: u32,
    /// Canonical title (first non-empty occurrence).
    pub title: String,
    /// Concatenated body text of every occurrence, in document order.
    pub text: String,
}

/// Result of segmenting a document.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Parts in ascending number order.
    pub parts: Vec<PartText>,
    /// Number of heading occurrences found (before merging).
    pub headings_found: usize,
}

impl Segmentation {
    /// No headings were found and the whole document became part 1.
    pub fn is_fallback(&self) -> bool {
        self.headings_found == 0
    }
}

/// Heading-based document segmenter.
#[derive(Debug, Clone)]
pub struct DocumentSegmenter {
    title_max_chars: usize,
    max_part_span_chars: usize,
}

struct Heading<'a> {
    start: usize,
    number: u32,
    raw_title: &'a str,
}

impl DocumentSegmenter {
    pub fn new() -> Self {
        Self::from_config(&SegmentationConfig::default())
    }

    pub fn from_config(config: &SegmentationConfig) -> Self {
        Self {
            title_max_chars: config.title_max_chars,
            max_part_span_chars: config.max_part_span_chars,
        }
    }

    /// Split `text` into parts, merging repeated headings.
    pub fn segment(&self, text: &str) -> Segmentation {
        let headings: Vec<Heading> = PART_HEADING
            .captures_iter(text)
            .filter_map(|caps| {
                let start = caps.get(0)?.start();
                let number = caps[1].parse::<u32>().ok().filter(|n| *n >= 1)?;
                let raw_title = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                Some(Heading {
                    start,
                    number,
                    raw_title,
                })
            })
            .collect();

        if headings.is_empty() {
            debug!("No part headings found, using whole document as part 1");
            return Segmentation {
                parts: vec![PartText {
                    number: 1,
                    title: String::new(),
                    text: text.to_string(),
                }],
                headings_found: 0,
            };
        }

        let mut merged: BTreeMap<u32, PartText> = BTreeMap::new();

        for (i, heading) in headings.iter().enumerate() {
            let next_start = headings.get(i + 1).map(|h| h.start).unwrap_or(text.len());
            let capped = heading.start + char_prefix(&text[heading.start..], self.max_part_span_chars).len();
            let body = &text[heading.start..next_start.min(capped)];
            let title = self.clean_title(heading.raw_title);

            trace!(
                "Heading for part {} at offset {} ({} bytes)",
                heading.number,
                heading.start,
                body.len()
            );

            merged
                .entry(heading.number)
                .and_modify(|part| {
                    part.text.push('\n');
                    part.text.push_str(body);
                    if part.title.is_empty() {
                        part.title = title.clone();
                    }
                })
                .or_insert_with(|| PartText {
                    number: heading.number,
                    title,
                    text: body.to_string(),
                });
        }

        debug!(
            "Segmented document into {} parts from {} headings",
            merged.len(),
            headings.len()
        );

        Segmentation {
            parts: merged.into_values().collect(),
            headings_found: headings.len(),
        }
    }

    fn clean_title(&self, raw: &str) -> String {
        let stripped = CONTINUED_MARKER.replace_all(raw, " ");
        let trimmed = stripped.trim_matches(|c: char| c.is_whitespace() || matches!(c, '.' | ':' | '-' | '–'));
        normalize_label(trimmed, self.title_max_chars)
    }
}

impl Default for DocumentSegmenter {
    fn default() -> Self {
        Self::new()
    }
}
