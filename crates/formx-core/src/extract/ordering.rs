//! Total ordering over form item identifiers.
//!
//! `"1" < "1.a" < "1.b" < "1.2" < "2" < "10"`, with unparseable identifiers
//! sorted last and discovery position as the final tie-break.

use std::cmp::Ordering;

use crate::models::document::Field;

/// `main` value for identifiers without leading digits.
pub const UNPARSED_MAIN: u32 = 999;

/// Offset applied to numeric sub-identifiers so they follow all lettered ones.
pub const NUMERIC_SUB_OFFSET: u32 = 100;

/// Comparable sort key of an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdentifierKey {
    pub main: u32,
    pub sub: u32,
    pub position: usize,
}

/// Parsed shape of an identifier.
struct Shape<'a> {
    main_digits: Option<&'a str>,
    main: u32,
    sub: u32,
}

fn is_separator(c: char) -> bool {
    matches!(c, '.' | '-' | ' ' | '(' | ')' | '_' | '/')
}

fn parse_shape(identifier: &str) -> Shape<'_> {
    let identifier = identifier.trim();
    let digits_end = identifier
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(identifier.len());

    let main = match identifier[..digits_end].parse::<u32>() {
        Ok(main) if digits_end > 0 => main,
        _ => {
            return Shape {
                main_digits: None,
                main: UNPARSED_MAIN,
                sub: 0,
            };
        }
    };

    let rest = identifier[digits_end..].trim_start_matches(is_separator);
    let token: &str = rest.split(is_separator).next().unwrap_or("");

    let sub = match token.chars().next() {
        Some(c) if c.is_ascii_lowercase() => c as u32 - 'a' as u32 + 1,
        Some(c) if c.is_ascii_digit() && token.chars().all(|c| c.is_ascii_digit()) => token
            .parse::<u32>()
            .map(|n| NUMERIC_SUB_OFFSET.saturating_add(n))
            .unwrap_or(0),
        _ => 0,
    };

    Shape {
        main_digits: Some(&identifier[..digits_end]),
        main,
        sub,
    }
}

/// Compute the sort key of an identifier discovered at `position`.
pub fn identifier_key(identifier: &str, position: usize) -> IdentifierKey {
    let shape = parse_shape(identifier);
    IdentifierKey {
        main: shape.main,
        sub: shape.sub,
        position,
    }
}

/// Compare two identifiers ignoring discovery position.
pub fn compare_identifiers(a: &str, b: &str) -> Ordering {
    identifier_key(a, 0).cmp(&identifier_key(b, 0))
}

/// Numbered parent of a sub-identifier: `"1.a"` → `"1"`, `"3.2"` → `"3"`.
pub fn parent_of(identifier: &str) -> Option<String> {
    let shape = parse_shape(identifier);
    match (shape.main_digits, shape.sub) {
        (Some(digits), sub) if sub > 0 => Some(digits.to_string()),
        _ => None,
    }
}

/// Sort fields into canonical order. Stable.
pub fn sort_fields(fields: &mut [Field]) {
    fields.sort_by_key(|f| identifier_key(&f.identifier, f.position));
}
