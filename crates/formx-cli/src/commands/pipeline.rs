//! Extraction and mapping shared by `process` and `batch`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use formx_core::export::{export, ExportBundle};
use formx_core::extract::PartReport;
use formx_core::{
    load_source, Document, FormExtractor, FormxConfig, MappingEngine, MappingReport, MappingRules,
    RecordedExtractor, TargetSchema,
};

/// Options shared by commands that run the pipeline.
#[derive(Args, Clone, Debug, Default)]
pub struct PipelineArgs {
    /// Target schema file (JSON)
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Mapping rule file (JSON)
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Replay semantic extractor responses from a JSON file
    #[arg(long)]
    pub semantic_replay: Option<PathBuf>,

    /// Do not retry empty parts against the start of the document
    #[arg(long)]
    pub strict_parts: bool,

    /// Extract parts on worker threads
    #[arg(long)]
    pub parallel: bool,
}

/// A configured extractor plus mapping engine.
pub struct Pipeline {
    extractor: FormExtractor,
    engine: MappingEngine,
}

/// Result of running one file through the pipeline.
#[derive(Debug, Serialize)]
pub struct ProcessedForm {
    pub source: PathBuf,
    pub document: Document,
    pub parts: Vec<PartReport>,
    pub warnings: Vec<String>,
    pub mapping: MappingReport,
    pub processing_time_ms: u64,
}

impl ProcessedForm {
    pub fn export(&self) -> ExportBundle {
        export(&self.document)
    }
}

impl Pipeline {
    pub fn new(mut config: FormxConfig, args: &PipelineArgs) -> anyhow::Result<Self> {
        if args.strict_parts {
            config.extraction.global_fallback = false;
        }
        if args.parallel {
            config.extraction.parallel_parts = true;
        }

        let schema = match args.schema.as_ref().or(config.mapping.schema_file.as_ref()) {
            Some(path) => TargetSchema::from_file(path)
                .with_context(|| format!("Failed to load schema from {}", path.display()))?,
            None => TargetSchema::default(),
        };
        let rules = match args.rules.as_ref().or(config.mapping.rules_file.as_ref()) {
            Some(path) => MappingRules::from_file(path)
                .with_context(|| format!("Failed to load mapping rules from {}", path.display()))?,
            None => MappingRules::default(),
        };

        let engine = MappingEngine::new(schema, rules, &config.mapping);
        for issue in engine.rule_issues() {
            warn!("Ignoring mapping rule: {}", issue);
        }

        let mut extractor = FormExtractor::new(config);
        if let Some(path) = &args.semantic_replay {
            let recorded = RecordedExtractor::from_file(path)
                .with_context(|| format!("Failed to load semantic responses from {}", path.display()))?;
            extractor = extractor.with_semantic_extractor(Arc::new(recorded));
        }

        Ok(Self { extractor, engine })
    }

    /// Load, extract and map one file.
    pub fn run(&self, path: &Path) -> anyhow::Result<ProcessedForm> {
        let source = load_source(path).with_context(|| format!("Failed to read {}", path.display()))?;
        if source.full_text.trim().is_empty() {
            anyhow::bail!("No text could be extracted from {}", path.display());
        }

        let extraction = self.extractor.extract(&source);
        let mut document = extraction.document;
        let mapping = self.engine.apply(&mut document);

        let warnings = extraction
            .warnings
            .iter()
            .map(ToString::to_string)
            .chain(mapping.warnings.iter().map(ToString::to_string))
            .collect();

        info!(
            "{}: {} parts, {} fields, {} queued for questionnaire",
            path.display(),
            document.parts.len(),
            document.field_count(),
            mapping.questionnaire
        );

        Ok(ProcessedForm {
            source: path.to_path_buf(),
            document,
            parts: extraction.parts,
            warnings,
            mapping,
            processing_time_ms: extraction.processing_time_ms,
        })
    }
}
