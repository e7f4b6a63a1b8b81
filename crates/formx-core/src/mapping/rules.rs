//! Deterministic rule tables for tiers 1 and 2 of the mapping engine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tier 1: exact identifier match, optionally limited to one part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierRule {
    /// Part the rule applies to; `None` means every part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<u32>,
    pub identifier: String,
    pub target: String,
}

/// Tier 2: case-insensitive keyword search in the field label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRule {
    /// Any keyword matching is enough.
    pub keywords: Vec<String>,
    pub target: String,
    /// Keywords must not be embedded in longer words ("state" vs "statement").
    #[serde(default)]
    pub whole_word: bool,
}

impl LabelRule {
    fn new(keywords: &[&str], target: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            target: target.to_string(),
            whole_word: false,
        }
    }

    fn whole_word(mut self) -> Self {
        self.whole_word = true;
        self
    }

    /// Whether the rule fires for an already lowercased label.
    pub fn matches(&self, label_lower: &str) -> bool {
        self.keywords.iter().any(|keyword| {
            let keyword = keyword.to_lowercase();
            if keyword.is_empty() {
                false
            } else if self.whole_word {
                contains_word(label_lower, &keyword)
            } else {
                label_lower.contains(&keyword)
            }
        })
    }
}

/// Ordered rule tables. Earlier rules win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRules {
    #[serde(default)]
    pub identifier_rules: Vec<IdentifierRule>,
    #[serde(default)]
    pub label_rules: Vec<LabelRule>,
}

impl MappingRules {
    /// Tables with no rules; every field goes to later tiers.
    pub fn empty() -> Self {
        Self {
            identifier_rules: Vec::new(),
            label_rules: Vec::new(),
        }
    }

    /// Load rules from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Part-scoped rules take precedence over unscoped ones.
    pub fn match_identifier(&self, part: u32, identifier: &str) -> Option<&IdentifierRule> {
        let candidates = || {
            self.identifier_rules
                .iter()
                .filter(move |rule| rule.identifier.eq_ignore_ascii_case(identifier))
        };
        candidates()
            .find(|rule| rule.part == Some(part))
            .or_else(|| candidates().find(|rule| rule.part.is_none()))
    }

    pub fn match_label(&self, label: &str) -> Option<&LabelRule> {
        let label = label.to_lowercase();
        self.label_rules.iter().find(|rule| rule.matches(&label))
    }

    /// Every target referenced by a rule.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.identifier_rules
            .iter()
            .map(|r| r.target.as_str())
            .chain(self.label_rules.iter().map(|r| r.target.as_str()))
    }
}

impl Default for MappingRules {
    /// Rules for the built-in schema. Specific phrases come before generic ones.
    fn default() -> Self {
        let identifier_rules = [
            ("1.a", "applicant.family_name"),
            ("1.b", "applicant.given_name"),
            ("1.c", "applicant.middle_name"),
        ]
        .into_iter()
        .map(|(identifier, target)| IdentifierRule {
            part: Some(1),
            identifier: identifier.to_string(),
            target: target.to_string(),
        })
        .collect();

        let label_rules = vec![
            LabelRule::new(&["other names", "aliases", "maiden name"], "applicant.other_names"),
            LabelRule::new(&["in care of"], "mailing_address.in_care_of"),
            LabelRule::new(&["family name", "last name", "surname"], "applicant.family_name"),
            LabelRule::new(&["given name", "first name"], "applicant.given_name"),
            LabelRule::new(&["middle name"], "applicant.middle_name"),
            LabelRule::new(&["date of birth", "birth date"], "applicant.date_of_birth"),
            LabelRule::new(&["city of birth", "town of birth", "place of birth"], "applicant.city_of_birth"),
            LabelRule::new(&["country of birth"], "applicant.country_of_birth"),
            LabelRule::new(&["citizenship", "nationality"], "applicant.country_of_citizenship"),
            LabelRule::new(&["a-number", "alien registration"], "applicant.a_number"),
            LabelRule::new(&["uscis online account"], "applicant.uscis_account_number"),
            LabelRule::new(&["social security", "ssn"], "applicant.ssn"),
            LabelRule::new(&["passport expiration", "passport expiry"], "applicant.passport_expiration_date"),
            LabelRule::new(&["passport number", "passport no"], "applicant.passport_number"),
            LabelRule::new(&["i-94"], "applicant.i94_number"),
            LabelRule::new(&["receipt number"], "case.receipt_number"),
            LabelRule::new(&["form type", "form number"], "case.form_type"),
            LabelRule::new(&["email", "e-mail"], "contact.email"),
            LabelRule::new(&["mobile", "cell phone"], "contact.mobile_phone"),
            LabelRule::new(&["telephone", "phone"], "contact.daytime_phone"),
            LabelRule::new(&["street"], "mailing_address.street"),
            LabelRule::new(&["apt", "ste", "flr", "suite", "unit"], "mailing_address.unit").whole_word(),
            LabelRule::new(&["city", "town"], "mailing_address.city").whole_word(),
            LabelRule::new(&["state"], "mailing_address.state").whole_word(),
            LabelRule::new(&["zip code", "zip"], "mailing_address.zip_code").whole_word(),
            LabelRule::new(&["postal code"], "mailing_address.postal_code"),
            LabelRule::new(&["province"], "mailing_address.province"),
            LabelRule::new(&["country"], "mailing_address.country").whole_word(),
            LabelRule::new(&["date of signature"], "signature.date_of_signature"),
            LabelRule::new(&["signature"], "signature.applicant_signature"),
            LabelRule::new(&["gender", "sex"], "applicant.gender").whole_word(),
            LabelRule::new(&["marital status"], "applicant.marital_status"),
        ];

        Self {
            identifier_rules,
            label_rules,
        }
    }
}

/// `needle` occurs in `haystack` without alphanumeric neighbours.
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
