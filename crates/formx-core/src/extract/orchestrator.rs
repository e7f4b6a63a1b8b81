//! Drives segmentation and per-part extraction.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::error::ExtractionError;
use crate::models::config::FormxConfig;
use crate::models::document::{Document, Part};
use crate::semantic::{call_with_timeout, into_candidates, CollaboratorError, SemanticExtractor, SemanticField};
use crate::session::CancellationToken;
use crate::source::SourceText;

use super::classifier::classify_fields;
use super::hierarchy::build_hierarchy;
use super::matcher::PatternFieldMatcher;
use super::patterns::char_prefix;
use super::segmenter::{DocumentSegmenter, PartText};
use super::FieldMatcher;

/// Per-part pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartStage {
    Pending,
    SemanticAttempted,
    PatternExtracted,
    HierarchyBuilt,
    Classified,
    Done,
}

/// What happened while extracting one part.
#[derive(Debug, Clone, Serialize)]
pub struct PartReport {
    pub number: u32,
    pub stage: PartStage,
    pub semantic_candidates: usize,
    pub pattern_candidates: usize,
    pub used_global_fallback: bool,
    pub duplicates_dropped: usize,
    pub parents_synthesized: usize,
    pub field_count: usize,
}

impl PartReport {
    fn new(number: u32) -> Self {
        Self {
            number,
            stage: PartStage::Pending,
            semantic_candidates: 0,
            pattern_candidates: 0,
            used_global_fallback: false,
            duplicates_dropped: 0,
            parents_synthesized: 0,
            field_count: 0,
        }
    }

    fn advance(&mut self, stage: PartStage) {
        trace!("Part {}: {:?} -> {:?}", self.number, self.stage, stage);
        self.stage = stage;
    }
}

/// Result of extracting a document.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    /// Extracted document (completed parts only when cancelled).
    pub document: Document,
    /// One report per processed part.
    pub parts: Vec<PartReport>,
    /// Non-fatal issues.
    pub warnings: Vec<ExtractionError>,
    /// Extraction stopped early.
    pub cancelled: bool,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

struct PartOutcome {
    part: Part,
    report: PartReport,
    warnings: Vec<ExtractionError>,
}

/// Segments a document and extracts each part's fields.
pub struct FormExtractor {
    config: FormxConfig,
    segmenter: DocumentSegmenter,
    matcher: PatternFieldMatcher,
    semantic: Option<Arc<dyn SemanticExtractor>>,
}

impl FormExtractor {
    pub fn new(config: FormxConfig) -> Self {
        Self {
            segmenter: DocumentSegmenter::from_config(&config.segmentation),
            matcher: PatternFieldMatcher::from_config(&config.extraction),
            semantic: None,
            config,
        }
    }

    /// Consult `extractor` before the pattern path of every part.
    pub fn with_semantic_extractor(mut self, extractor: Arc<dyn SemanticExtractor>) -> Self {
        self.semantic = Some(extractor);
        self
    }

    pub fn config(&self) -> &FormxConfig {
        &self.config
    }

    /// Extract a document.
    pub fn extract(&self, source: &SourceText) -> ExtractionReport {
        self.extract_with_cancel(source, &CancellationToken::new())
    }

    /// Extract a document, stopping between parts once `cancel` fires.
    pub fn extract_with_cancel(&self, source: &SourceText, cancel: &CancellationToken) -> ExtractionReport {
        let start = Instant::now();
        let mut warnings = Vec::new();

        info!(
            "Extracting fields from {} characters of text ({} pages)",
            source.full_text.len(),
            source.page_count
        );

        let segmentation = self.segmenter.segment(&source.full_text);
        if segmentation.is_fallback() {
            warnings.push(ExtractionError::SegmentationEmpty);
        }

        let outcomes: Vec<Option<PartOutcome>> = if self.config.extraction.parallel_parts
            && segmentation.parts.len() > 1
        {
            self.extract_parallel(&segmentation.parts, &source.full_text, cancel)
        } else {
            segmentation
                .parts
                .iter()
                .map(|part_text| {
                    (!cancel.is_cancelled())
                        .then(|| self.extract_part(part_text, &source.full_text))
                })
                .collect()
        };

        let mut parts = Vec::with_capacity(outcomes.len());
        let mut reports = Vec::with_capacity(outcomes.len());
        let mut cancelled = false;

        for (part_text, outcome) in segmentation.parts.iter().zip(outcomes) {
            match outcome {
                Some(outcome) => {
                    parts.push(outcome.part);
                    reports.push(outcome.report);
                    warnings.extend(outcome.warnings);
                }
                None => {
                    if !cancelled {
                        warn!("Extraction cancelled before part {}", part_text.number);
                        warnings.push(ExtractionError::Cancelled {
                            part: part_text.number,
                        });
                    }
                    cancelled = true;
                }
            }
        }

        let document = Document::new(parts, source.page_count);
        info!(
            "Extracted {} fields across {} parts with {} warnings",
            document.field_count(),
            document.parts.len(),
            warnings.len()
        );

        ExtractionReport {
            document,
            parts: reports,
            warnings,
            cancelled,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn extract_parallel(
        &self,
        part_texts: &[PartText],
        full_text: &str,
        cancel: &CancellationToken,
    ) -> Vec<Option<PartOutcome>> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = part_texts
                .iter()
                .map(|part_text| {
                    scope.spawn(move || {
                        (!cancel.is_cancelled()).then(|| self.extract_part(part_text, full_text))
                    })
                })
                .collect();

            handles
                .into_iter()
                .zip(part_texts)
                .map(|(handle, part_text)| {
                    handle.join().unwrap_or_else(|_| {
                        warn!("Worker for part {} panicked", part_text.number);
                        Some(PartOutcome {
                            part: Part::new(part_text.number, part_text.title.clone()),
                            report: PartReport::new(part_text.number),
                            warnings: vec![ExtractionError::NoFieldsExtracted {
                                part: part_text.number,
                            }],
                        })
                    })
                })
                .collect()
        })
    }

    fn extract_part(&self, part_text: &PartText, full_text: &str) -> PartOutcome {
        let number = part_text.number;
        let mut report = PartReport::new(number);
        let mut warnings = Vec::new();

        let semantic_fields = match self.consult_semantic(&part_text.text, number) {
            Some(Ok(fields)) => {
                report.advance(PartStage::SemanticAttempted);
                fields
            }
            Some(Err(error)) => {
                report.advance(PartStage::SemanticAttempted);
                warn!("{}; continuing with patterns only", error);
                warnings.push(error);
                Vec::new()
            }
            None => Vec::new(),
        };

        let mut candidates = self.matcher.match_fields(&part_text.text, number);
        if candidates.is_empty()
            && semantic_fields.is_empty()
            && self.config.extraction.global_fallback
            && part_text.text.len() < full_text.len()
        {
            debug!("Part {} yielded no fields, retrying against document start", number);
            let global = char_prefix(full_text, self.config.extraction.global_fallback_chars);
            candidates = self.matcher.match_fields(global, number);
            report.used_global_fallback = true;
        }
        report.pattern_candidates = candidates.len();
        report.advance(PartStage::PatternExtracted);

        let semantic = into_candidates(
            semantic_fields,
            number,
            self.config.extraction.label_max_chars,
            candidates.len(),
        );
        report.semantic_candidates = semantic.len();
        candidates.extend(semantic);

        let hierarchy = build_hierarchy(candidates, number);
        report.duplicates_dropped = hierarchy.duplicates_dropped;
        report.parents_synthesized = hierarchy.parents_synthesized;
        report.advance(PartStage::HierarchyBuilt);

        let mut fields = hierarchy.fields;
        classify_fields(&mut fields);
        report.advance(PartStage::Classified);

        report.field_count = fields.len();
        if fields.is_empty() {
            warn!("No fields extracted for part {}", number);
            warnings.push(ExtractionError::NoFieldsExtracted { part: number });
        }
        report.advance(PartStage::Done);

        PartOutcome {
            part: Part {
                number,
                title: part_text.title.clone(),
                fields,
            },
            report,
            warnings,
        }
    }

    /// `None` when no extractor is attached or it is disabled.
    fn consult_semantic(
        &self,
        text: &str,
        part: u32,
    ) -> Option<Result<Vec<SemanticField>, ExtractionError>> {
        let extractor = self.semantic.as_ref().filter(|_| self.config.semantic.enabled)?;

        if !extractor.is_available() {
            return Some(Err(ExtractionError::SemanticExtractorUnavailable {
                part,
                reason: format!("{} is not reachable", extractor.name()),
            }));
        }

        let excerpt = char_prefix(text, self.config.semantic.excerpt_chars).to_string();
        let worker = Arc::clone(extractor);
        let timeout = self.config.semantic.timeout();

        debug!("Consulting {} for part {}", extractor.name(), part);
        let result = call_with_timeout(timeout, move || worker.extract_fields(&excerpt, part));

        Some(result.map_err(|error| match error {
            CollaboratorError::TimedOut => ExtractionError::SemanticExtractorTimeout {
                part,
                timeout_ms: self.config.semantic.timeout_ms,
            },
            CollaboratorError::Unavailable(reason) | CollaboratorError::Failed(reason) => {
                ExtractionError::SemanticExtractorUnavailable { part, reason }
            }
        }))
    }
}

impl Default for FormExtractor {
    fn default() -> Self {
        Self::new(FormxConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::{ExtractionSource, FieldKind};
    use std::time::Duration;

    struct FixedExtractor(Vec<SemanticField>);

    impl SemanticExtractor for FixedExtractor {
        fn extract_fields(&self, _excerpt: &str, _part: u32) -> Result<Vec<SemanticField>, CollaboratorError> {
            Ok(self.0.clone())
        }
    }

    struct FailingExtractor;

    impl SemanticExtractor for FailingExtractor {
        fn extract_fields(&self, _excerpt: &str, _part: u32) -> Result<Vec<SemanticField>, CollaboratorError> {
            Err(CollaboratorError::Failed("503".to_string()))
        }
    }

    struct SlowExtractor;

    impl SemanticExtractor for SlowExtractor {
        fn extract_fields(&self, _excerpt: &str, _part: u32) -> Result<Vec<SemanticField>, CollaboratorError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(Vec::new())
        }
    }

    struct OfflineExtractor;

    impl SemanticExtractor for OfflineExtractor {
        fn is_available(&self) -> bool {
            false
        }

        fn extract_fields(&self, _excerpt: &str, _part: u32) -> Result<Vec<SemanticField>, CollaboratorError> {
            unreachable!("availability is checked first")
        }
    }

    fn proposal(identifier: &str, label: &str) -> SemanticField {
        SemanticField {
            identifier: identifier.to_string(),
            label: label.to_string(),
            type_hint: None,
            parent: None,
        }
    }

    fn source(text: &str) -> SourceText {
        SourceText::new(text, 1)
    }

    #[test]
    fn test_pattern_wins_on_collision() {
        let extractor = FormExtractor::default().with_semantic_extractor(Arc::new(FixedExtractor(vec![
            proposal("1", "Surname per AI"),
            proposal("3", "Email Address"),
        ])));
        let report = extractor.extract(&source("Part 1. About You\n1. Family Name\n2. Given Name\n"));

        let part = report.document.part(1).unwrap();
        assert_eq!(part.fields.len(), 3);
        assert_eq!(part.field("1").unwrap().label, "Family Name");
        assert_eq!(part.field("1").unwrap().extraction_source, ExtractionSource::Pattern);
        assert_eq!(
            part.field("3").unwrap().extraction_source,
            ExtractionSource::SemanticExtractor
        );
        assert_eq!(report.parts[0].stage, PartStage::Done);
        assert_eq!(report.parts[0].duplicates_dropped, 1);
    }

    #[test]
    fn test_semantic_failure_is_not_fatal() {
        let extractor = FormExtractor::default().with_semantic_extractor(Arc::new(FailingExtractor));
        let report = extractor.extract(&source("1. Family Name\n"));
        assert_eq!(report.document.field_count(), 1);
        assert!(report.warnings.iter().any(|w| matches!(
            w,
            ExtractionError::SemanticExtractorUnavailable { part: 1, .. }
        )));
    }

    #[test]
    fn test_semantic_timeout() {
        let mut config = FormxConfig::default();
        config.semantic.timeout_ms = 20;
        let extractor = FormExtractor::new(config).with_semantic_extractor(Arc::new(SlowExtractor));
        let report = extractor.extract(&source("1. Family Name\n"));
        assert_eq!(report.document.field_count(), 1);
        assert!(report.warnings.contains(&ExtractionError::SemanticExtractorTimeout {
            part: 1,
            timeout_ms: 20
        }));
    }

    #[test]
    fn test_unavailable_extractor_is_skipped() {
        let extractor = FormExtractor::default().with_semantic_extractor(Arc::new(OfflineExtractor));
        let report = extractor.extract(&source("1. Family Name\n"));
        assert_eq!(report.document.field_count(), 1);
        assert!(matches!(
            report.warnings.last(),
            Some(ExtractionError::SemanticExtractorUnavailable { .. })
        ));
    }

    #[test]
    fn test_disabled_semantic_is_not_consulted() {
        let mut config = FormxConfig::default();
        config.semantic.enabled = false;
        let extractor = FormExtractor::new(config)
            .with_semantic_extractor(Arc::new(FixedExtractor(vec![proposal("9", "Extra")])));
        let report = extractor.extract(&source("1. Family Name\n"));
        assert_eq!(report.document.field_count(), 1);
        assert_eq!(report.parts[0].semantic_candidates, 0);
    }

    #[test]
    fn test_global_fallback() {
        let text = "1. Family Name\n2. Given Name\nPart 1. Instructions\nRead carefully.\n";
        let report = FormExtractor::default().extract(&source(text));
        let part = report.document.part(1).unwrap();
        assert!(report.parts[0].used_global_fallback);
        assert_eq!(part.fields.len(), 2);
    }

    #[test]
    fn test_empty_part_is_kept() {
        let mut config = FormxConfig::default();
        config.extraction.global_fallback = false;
        let text = "Part 1. Names\n1. Family Name\nPart 2. Notes\nNothing numbered here.\n";
        let report = FormExtractor::new(config).extract(&source(text));
        assert_eq!(report.document.parts.len(), 2);
        assert!(report.document.part(2).unwrap().fields.is_empty());
        assert!(report
            .warnings
            .contains(&ExtractionError::NoFieldsExtracted { part: 2 }));
    }

    #[test]
    fn test_no_headings_warns() {
        let report = FormExtractor::default().extract(&source("1. Family Name\n"));
        assert!(report.warnings.contains(&ExtractionError::SegmentationEmpty));
        assert_eq!(report.document.parts[0].number, 1);
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = FormExtractor::default()
            .extract_with_cancel(&source("Part 1. A\n1. X\nPart 2. B\n1. Y\n"), &cancel);
        assert!(report.cancelled);
        assert!(report.document.parts.is_empty());
        assert_eq!(report.warnings, vec![ExtractionError::Cancelled { part: 1 }]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let text = "Part 1. A\n1. Family Name\n1.a. Sub\nPart 2. B\n1. Are you married?\n☐ Yes\n☐ No\nPart 3. C\n2. Date of Birth\n";
        let sequential = FormExtractor::default().extract(&source(text));

        let mut config = FormxConfig::default();
        config.extraction.parallel_parts = true;
        let parallel = FormExtractor::new(config).extract(&source(text));

        let summarize = |doc: &Document| -> Vec<(u32, String, FieldKind)> {
            doc.parts
                .iter()
                .flat_map(|p| p.fields.iter().map(move |f| (p.number, f.identifier.clone(), f.kind)))
                .collect()
        };
        assert_eq!(summarize(&sequential.document), summarize(&parallel.document));
        assert_eq!(parallel.document.parts.len(), 3);
    }
}
