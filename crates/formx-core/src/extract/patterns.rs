//! Common regex patterns for form field extraction.

use lazy_static::lazy_static;
use regex::Regex;

/// Checkbox and radio glyphs recognised in linearized form text.
pub const CHOICE_GLYPHS: &str = "☐☑☒□■❏◻◼○●◯";

/// Glyphs that mark an option as selected.
pub const SELECTED_GLYPHS: &str = "☑☒■◼●";

/// Round glyphs, used for mutually exclusive option groups.
pub const RADIO_GLYPHS: &str = "○●◯";

lazy_static! {
    // Field shapes, in priority order.
    // "1.a. Family Name", "1.B Given Name"
    pub static ref LETTERED_SUBFIELD: Regex = Regex::new(
        r"(?mi)^[ \t]*(\d{1,3})\.([a-z])\.?[ \t]+(\S[^\n]*)$"
    ).unwrap();

    // "1. Family Name"
    pub static ref NUMBERED_FIELD: Regex = Regex::new(
        r"(?m)^[ \t]*(\d{1,3})\.[ \t]+(\S[^\n]*)$"
    ).unwrap();

    // "3.2. Country"
    pub static ref NUMERIC_SUBFIELD: Regex = Regex::new(
        r"(?m)^[ \t]*(\d{1,3})\.(\d{1,2})\.?[ \t]+(\S[^\n]*)$"
    ).unwrap();

    // "(4) Mailing Address"
    pub static ref PARENTHESIZED_FIELD: Regex = Regex::new(
        r"(?m)^[ \t]*\((\d{1,3})\)[ \t]+(\S[^\n]*)$"
    ).unwrap();

    // "5 - Place of Birth"
    pub static ref DASHED_FIELD: Regex = Regex::new(
        r"(?m)^[ \t]*(\d{1,3})[ \t]*[-–][ \t]+(\S[^\n]*)$"
    ).unwrap();

    // "6) Have you ever ...", "7 Are you ..."
    pub static ref INTERROGATIVE_FIELD: Regex = Regex::new(
        r"(?mi)^[ \t]*(\d{1,3})[.)]?[ \t]+((?:are|have|do|did|is|was|were|will|has)\b[^\n]*)$"
    ).unwrap();

    // Start of any numbered item or part heading; bounds checkbox windows.
    pub static ref ITEM_START: Regex = Regex::new(
        r"(?mi)^[ \t]*(?:\(?\d{1,3}(?:\.[a-z0-9]{1,2})?\.?\)?[ \t]*[-–]?[ \t]+\S|part[ \t]+\d)"
    ).unwrap();

    // Choice options: glyph or bracket prefix followed by a short text run.
    pub static ref CHOICE_OPTION: Regex = Regex::new(
        r"(?:([☐☑☒□■❏◻◼○●◯])|\[[ \t]*([xX✓✔]?)[ \t]*\]|(\()[ \t]*([xX✓✔]?)[ \t]*\))[ \t]*([^\n☐☑☒□■❏◻◼○●◯\[\](]{2,80})"
    ).unwrap();

    // Any glyph or bracket box; labels are cut at the first one.
    pub static ref CHOICE_MARKER: Regex = Regex::new(
        r"[☐☑☒□■❏◻◼○●◯]|\[[ \t]*[xX✓✔]?[ \t]*\]"
    ).unwrap();

    // A Yes/No pair without glyphs, as standalone tokens: "Yes  No",
    // "Yes / No", or one per line. Prose such as "if yes, ..." is not a pair.
    pub static ref YES_NO_PAIR: Regex = Regex::new(
        r"(?mi)^[ \t]*yes[ \t.,;:/|\-]*(?:\n[ \t]*)?no[ \t.,;:]*$"
    ).unwrap();

    // Part headings: "Part 2. Biographic Information", "PART 3 - Signature"
    pub static ref PART_HEADING: Regex = Regex::new(
        r"(?mi)^[ \t]*part[ \t]+(\d{1,2})\b[ \t]*[.:\-–]?[ \t]*([^\n]*)$"
    ).unwrap();

    // Continuation markers stripped from part titles: a bracketed marker
    // anywhere, or the bare word at the end of the title.
    pub static ref CONTINUED_MARKER: Regex = Regex::new(
        r"(?i)[(\[][ \t]*continued[ \t]*[)\]]|\bcontinued\b[ \t]*$"
    ).unwrap();

    // Classifier keyword groups, in rule order.
    pub static ref DATE_TERMS: Regex = Regex::new(
        r"(?i)\b(?:date|dates|birth|born|dob|expir\w*|mm/dd/yyyy)\b"
    ).unwrap();

    pub static ref NUMBER_TERMS: Regex = Regex::new(
        r"(?i)(?:\b(?:number|numbers|num|ssn|receipt|case|identifier|id|a-number)\b|\bsocial security\b|\bno\.|#)"
    ).unwrap();

    pub static ref SIGNATURE_TERMS: Regex = Regex::new(
        r"(?i)signature"
    ).unwrap();

    pub static ref QUESTION_TERMS: Regex = Regex::new(
        r"(?i)(?:\b(?:are|have|do|did)[ \t]+you\b|\b(?:is|was|will)[ \t])"
    ).unwrap();
}

/// Collapse whitespace and cap a label at `max_chars` characters.
pub fn normalize_label(raw: &str, max_chars: usize) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    collapsed
        .chars()
        .take(max_chars)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Longest prefix of `text` that holds at most `max_chars` characters.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lettered_subfield() {
        let caps = LETTERED_SUBFIELD.captures("  1.a. Family Name (Last Name)").unwrap();
        assert_eq!(&caps[1], "1");
        assert_eq!(&caps[2], "a");
        assert_eq!(&caps[3], "Family Name (Last Name)");

        let caps = LETTERED_SUBFIELD.captures("2.B Given Name").unwrap();
        assert_eq!(&caps[2], "B");

        assert!(LETTERED_SUBFIELD.captures("1.Apple").is_none());
        assert!(LETTERED_SUBFIELD.captures("1. Family Name").is_none());
    }

    #[test]
    fn test_numbered_field_does_not_match_subfields() {
        assert!(NUMBERED_FIELD.is_match("12. Email Address"));
        assert!(!NUMBERED_FIELD.is_match("1.a. Family Name"));
        assert!(!NUMBERED_FIELD.is_match("3.2 Country"));
        assert!(!NUMBERED_FIELD.is_match("See Part 2. below"));
    }

    #[test]
    fn test_part_heading() {
        let caps = PART_HEADING.captures("Part 2. Biographic Information").unwrap();
        assert_eq!(&caps[1], "2");
        assert_eq!(&caps[2], "Biographic Information");

        let caps = PART_HEADING.captures("PART 10 - Signature").unwrap();
        assert_eq!(&caps[1], "10");
        assert_eq!(&caps[2], "Signature");

        assert!(PART_HEADING.captures("Complete Part 3 of this form").is_none());
    }

    #[test]
    fn test_choice_option() {
        let found: Vec<_> = CHOICE_OPTION
            .captures_iter("☐ Yes ☒ No [x] Maybe")
            .map(|c| c[5].trim().to_string())
            .collect();
        assert_eq!(found, vec!["Yes", "No", "Maybe"]);
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Family \t Name\n ", 150), "Family Name");
        assert_eq!(normalize_label("abcdef", 3), "abc");
        assert_eq!(normalize_label("ab cd", 3), "ab");
    }

    #[test]
    fn test_char_prefix_respects_char_boundaries() {
        assert_eq!(char_prefix("☐☐☐", 2), "☐☐");
        assert_eq!(char_prefix("abc", 10), "abc");
    }
}
