//! Target schema vocabulary: object name → ordered list of destination paths.
//!
//! Schemas are validated when constructed or deserialized, so lookups never
//! have to deal with duplicate or empty paths.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

/// One schema object and the paths it groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaObject {
    /// Object name, used for grouping in exports.
    pub name: String,

    /// Dotted destination paths, in display order.
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaDefinition {
    objects: Vec<SchemaObject>,
}

/// Validated, flat namespace of destination paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SchemaDefinition", into = "SchemaDefinition")]
pub struct TargetSchema {
    objects: Vec<SchemaObject>,
    index: BTreeMap<String, usize>,
}

impl TryFrom<SchemaDefinition> for TargetSchema {
    type Error = SchemaError;

    fn try_from(def: SchemaDefinition) -> std::result::Result<Self, Self::Error> {
        TargetSchema::new(def.objects)
    }
}

impl From<TargetSchema> for SchemaDefinition {
    fn from(schema: TargetSchema) -> Self {
        SchemaDefinition {
            objects: schema.objects,
        }
    }
}

impl TargetSchema {
    /// Build and validate a schema.
    pub fn new(objects: Vec<SchemaObject>) -> std::result::Result<Self, SchemaError> {
        let mut names = BTreeSet::new();
        let mut index = BTreeMap::new();

        for (i, object) in objects.iter().enumerate() {
            let name = object.name.trim();
            if name.is_empty() {
                return Err(SchemaError::EmptyObjectName);
            }
            if !names.insert(name.to_string()) {
                return Err(SchemaError::DuplicateObject(name.to_string()));
            }

            for path in &object.paths {
                if path.is_empty() || path.split('.').any(|segment| segment.trim().is_empty()) {
                    return Err(SchemaError::InvalidPath {
                        object: name.to_string(),
                        path: path.clone(),
                    });
                }
                if index.insert(path.clone(), i).is_some() {
                    return Err(SchemaError::DuplicatePath(path.clone()));
                }
            }
        }

        Ok(Self { objects, index })
    }

    /// Load a schema from a JSON file of the form `{"objects": [{"name", "paths"}]}`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn objects(&self) -> &[SchemaObject] {
        &self.objects
    }

    /// Whether `path` is a valid destination.
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Name of the object that owns `path`.
    pub fn object_for(&self, path: &str) -> Option<&str> {
        self.index
            .get(path)
            .map(|&i| self.objects[i].name.as_str())
    }

    /// Every path, object by object, in declaration order.
    pub fn all_paths(&self) -> impl Iterator<Item = &str> {
        self.objects
            .iter()
            .flat_map(|o| o.paths.iter().map(String::as_str))
    }

    pub fn path_count(&self) -> usize {
        self.index.len()
    }
}

impl Default for TargetSchema {
    /// Built-in applicant-oriented vocabulary used by the default rule tables.
    fn default() -> Self {
        let objects = BUILTIN_SCHEMA
            .iter()
            .map(|(name, paths)| SchemaObject {
                name: (*name).to_string(),
                paths: paths.iter().map(|p| format!("{}.{}", name, p)).collect(),
            })
            .collect();

        // The built-in table is covered by tests; an invalid entry is a programming error.
        TargetSchema::new(objects).unwrap_or_else(|_| TargetSchema {
            objects: Vec::new(),
            index: BTreeMap::new(),
        })
    }
}

const BUILTIN_SCHEMA: &[(&str, &[&str])] = &[
    (
        "applicant",
        &[
            "family_name",
            "given_name",
            "middle_name",
            "other_names",
            "date_of_birth",
            "city_of_birth",
            "country_of_birth",
            "country_of_citizenship",
            "gender",
            "marital_status",
            "a_number",
            "uscis_account_number",
            "ssn",
            "passport_number",
            "passport_expiration_date",
            "i94_number",
        ],
    ),
    ("contact", &["daytime_phone", "mobile_phone", "email"]),
    (
        "mailing_address",
        &[
            "in_care_of",
            "street",
            "unit",
            "city",
            "state",
            "zip_code",
            "province",
            "postal_code",
            "country",
        ],
    ),
    ("case", &["receipt_number", "form_type"]),
    ("signature", &["applicant_signature", "date_of_signature"]),
];
