//! Tiered mapping engine.
//!
//! Each field without a manual decision is resolved by the first tier that
//! produces a result:
//!
//! 1. exact identifier rule
//! 2. label keyword rule
//! 3. semantic classifier (optional, batched)
//!
//! Anything left over is queued for the questionnaire.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::MappingError;
use crate::models::config::MappingConfig;
use crate::models::document::{Document, Field, FieldMapping, MappingSource};
use crate::models::schema::TargetSchema;
use crate::semantic::{call_with_timeout, ClassificationRequest, SemanticClassifier};

use super::rules::MappingRules;

/// Tier statistics and warnings of a mapping run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MappingReport {
    pub identifier_rule: usize,
    pub label_rule: usize,
    pub semantic: usize,
    pub questionnaire: usize,
    /// Fields left untouched because the user resolved them.
    pub manual_kept: usize,
    /// Classifier failures and rejected classifier responses.
    #[serde(skip)]
    pub warnings: Vec<MappingError>,
}

impl MappingReport {
    /// Fields with an automatic mapping.
    pub fn mapped(&self) -> usize {
        self.identifier_rule + self.label_rule + self.semantic
    }
}

/// Location of a field inside a document.
#[derive(Debug, Clone, Copy)]
struct Slot {
    part: usize,
    field: usize,
}

/// Resolves fields to schema paths.
pub struct MappingEngine {
    schema: TargetSchema,
    rules: MappingRules,
    batch_size: usize,
    classifier_timeout: Duration,
    classifier: Option<Arc<dyn SemanticClassifier>>,
    rule_issues: Vec<MappingError>,
}

impl MappingEngine {
    /// Create an engine. Rules pointing outside the schema are reported and ignored.
    pub fn new(schema: TargetSchema, mut rules: MappingRules, config: &MappingConfig) -> Self {
        let mut rule_issues = Vec::new();
        for target in rules.targets() {
            if !schema.contains(target) {
                warn!("Mapping rule targets unknown path {}", target);
                let issue = MappingError::UnknownTargetPath(target.to_string());
                if !rule_issues.contains(&issue) {
                    rule_issues.push(issue);
                }
            }
        }
        rules.identifier_rules.retain(|rule| schema.contains(&rule.target));
        rules.label_rules.retain(|rule| schema.contains(&rule.target));

        Self {
            schema,
            rules,
            batch_size: config.batch_size.max(1),
            classifier_timeout: config.classifier_timeout(),
            classifier: None,
            rule_issues,
        }
    }

    /// Use `classifier` for fields no rule resolves.
    pub fn with_classifier(mut self, classifier: Arc<dyn SemanticClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn schema(&self) -> &TargetSchema {
        &self.schema
    }

    pub fn rules(&self) -> &MappingRules {
        &self.rules
    }

    /// Rule targets missing from the schema.
    pub fn rule_issues(&self) -> &[MappingError] {
        &self.rule_issues
    }

    /// Resolve every field of `doc` that has no manual decision.
    pub fn apply(&self, doc: &mut Document) -> MappingReport {
        let mut report = MappingReport::default();
        let mut unresolved = Vec::new();

        for (pi, part) in doc.parts.iter_mut().enumerate() {
            for (fi, field) in part.fields.iter_mut().enumerate() {
                if field.is_container() {
                    field.mapping = None;
                    field.in_questionnaire = false;
                    continue;
                }
                if field.manual_override {
                    report.manual_kept += 1;
                    continue;
                }

                field.mapping = None;
                field.in_questionnaire = false;
                match self.resolve_by_rules(field) {
                    Some(mapping) => {
                        match mapping.source {
                            MappingSource::IdentifierRule => report.identifier_rule += 1,
                            _ => report.label_rule += 1,
                        }
                        field.assign_mapping(mapping);
                    }
                    None => unresolved.push(Slot { part: pi, field: fi }),
                }
            }
        }

        if let Some(classifier) = &self.classifier {
            if !unresolved.is_empty() {
                report.semantic = self.classify_slots(doc, &unresolved, classifier, &mut report.warnings);
            }
        }

        for slot in unresolved {
            let field = &mut doc.parts[slot.part].fields[slot.field];
            if field.mapping.is_none() {
                field.assign_questionnaire();
                report.questionnaire += 1;
            }
        }

        info!(
            "Mapped {} fields (identifier: {}, label: {}, semantic: {}), {} queued for questionnaire, {} manual",
            report.mapped(),
            report.identifier_rule,
            report.label_rule,
            report.semantic,
            report.questionnaire,
            report.manual_kept
        );
        report
    }

    /// Re-resolve a single field.
    ///
    /// Returns the new mapping, or `None` when the field went to the questionnaire.
    pub fn remap_field(
        &self,
        doc: &mut Document,
        part: u32,
        identifier: &str,
    ) -> Result<Option<FieldMapping>, MappingError> {
        let (pi, fi) = doc
            .parts
            .iter()
            .enumerate()
            .find_map(|(pi, p)| {
                (p.number == part)
                    .then(|| p.fields.iter().position(|f| f.identifier == identifier).map(|fi| (pi, fi)))
                    .flatten()
            })
            .ok_or_else(|| MappingError::UnknownField {
                part,
                identifier: identifier.to_string(),
            })?;

        let field = &mut doc.parts[pi].fields[fi];
        if field.manual_override {
            return Err(MappingError::ManualOverrideConflict {
                part,
                identifier: identifier.to_string(),
            });
        }
        if field.is_container() {
            return Err(MappingError::ParentField {
                part,
                identifier: identifier.to_string(),
            });
        }

        field.mapping = None;
        field.in_questionnaire = false;

        let mut mapping = self.resolve_by_rules(field);
        if mapping.is_none() {
            if let Some(classifier) = &self.classifier {
                let mut warnings = Vec::new();
                let slot = Slot { part: pi, field: fi };
                self.classify_slots(doc, &[slot], classifier, &mut warnings);
                mapping = doc.parts[pi].fields[fi].mapping.clone();
            }
        }

        let field = &mut doc.parts[pi].fields[fi];
        match &mapping {
            Some(m) => field.assign_mapping(m.clone()),
            None => field.assign_questionnaire(),
        }
        Ok(mapping)
    }

    fn resolve_by_rules(&self, field: &Field) -> Option<FieldMapping> {
        if let Some(rule) = self.rules.match_identifier(field.part_number, &field.identifier) {
            return self.mapping_for(&rule.target, MappingSource::IdentifierRule);
        }

        self.rules
            .match_label(&field.label)
            .and_then(|rule| self.mapping_for(&rule.target, MappingSource::LabelRule))
    }

    fn mapping_for(&self, path: &str, source: MappingSource) -> Option<FieldMapping> {
        let object = self.schema.object_for(path)?;
        Some(FieldMapping {
            target_object: object.to_string(),
            target_path: path.to_string(),
            source,
        })
    }

    /// Send unresolved fields to the classifier in batches. Returns fields mapped.
    fn classify_slots(
        &self,
        doc: &mut Document,
        slots: &[Slot],
        classifier: &Arc<dyn SemanticClassifier>,
        warnings: &mut Vec<MappingError>,
    ) -> usize {
        let vocabulary: Arc<Vec<String>> = Arc::new(self.schema.all_paths().map(String::from).collect());
        let mut mapped = 0;

        for batch in slots.chunks(self.batch_size) {
            let requests: Vec<ClassificationRequest> = batch
                .iter()
                .map(|slot| {
                    let field = &doc.parts[slot.part].fields[slot.field];
                    ClassificationRequest {
                        part: field.part_number,
                        identifier: field.identifier.clone(),
                        label: field.label.clone(),
                        kind: field.kind,
                    }
                })
                .collect();

            debug!("Classifying batch of {} fields with {}", requests.len(), classifier.name());
            let worker = Arc::clone(classifier);
            let vocab = Arc::clone(&vocabulary);
            let sent = requests.clone();
            let response = match call_with_timeout(self.classifier_timeout, move || worker.classify(&sent, &vocab)) {
                Ok(response) => response,
                Err(error) => {
                    warn!("Semantic classifier {} failed: {}", classifier.name(), error);
                    warnings.push(MappingError::ClassifierFailed(error.to_string()));
                    continue;
                }
            };

            mapped += self.accept_response(doc, batch, &requests, response, warnings);
        }
        mapped
    }

    /// Keep only responses whose key names exactly one field of the batch and
    /// whose value is a schema path.
    fn accept_response(
        &self,
        doc: &mut Document,
        batch: &[Slot],
        requests: &[ClassificationRequest],
        response: BTreeMap<String, String>,
        warnings: &mut Vec<MappingError>,
    ) -> usize {
        let mut mapped = 0;
        for (key, path) in response {
            let matches: Vec<usize> = requests
                .iter()
                .enumerate()
                .filter(|(_, r)| r.identifier == key || r.label == key)
                .map(|(i, _)| i)
                .collect();

            let [index] = matches[..] else {
                debug!("Rejecting classifier key {:?} matching {} fields", key, matches.len());
                warnings.push(MappingError::AmbiguousMapping { key });
                continue;
            };

            let Some(mapping) = self.mapping_for(&path, MappingSource::SemanticClassifier) else {
                debug!("Rejecting classifier path {:?} outside the schema", path);
                continue;
            };

            let slot = batch[index];
            let field = &mut doc.parts[slot.part].fields[slot.field];
            if field.mapping.is_none() {
                field.assign_mapping(mapping);
                mapped += 1;
            }
        }
        mapped
    }
}

impl Default for MappingEngine {
    fn default() -> Self {
        Self::new(
            TargetSchema::default(),
            MappingRules::default(),
            &MappingConfig::default(),
        )
    }
}
