//! Configuration structures for the extraction and mapping pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the formx pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormxConfig {
    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Part segmentation configuration.
    pub segmentation: SegmentationConfig,

    /// Semantic extractor configuration.
    pub semantic: SemanticConfig,

    /// Schema mapping configuration.
    pub mapping: MappingConfig,
}

/// Pattern matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Characters of a part's text scanned by the pattern matcher.
    pub matcher_span_chars: usize,

    /// Maximum label length in characters.
    pub label_max_chars: usize,

    /// Characters after a field scanned for checkbox cues.
    pub checkbox_window_chars: usize,
    /// Maximum options kept per choice group, between 2 and 26.
    /// Maximum options kept per choice group.
    pub max_choices: usize,

    /// Retry against the start of the document when a part yields nothing.
    pub global_fallback: bool,

    /// Characters of the document used by the global fallback.
    pub global_fallback_chars: usize,

    /// Process parts on scoped worker threads.
    pub parallel_parts: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            matcher_span_chars: 10_000,
            label_max_chars: 150,
            checkbox_window_chars: 300,
            max_choices: 5,
            global_fallback: true,
            global_fallback_chars: 10_000,
            parallel_parts: false,
        }
    }
}

/// Part heading detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Maximum title length in characters.
    pub title_max_chars: usize,

    /// Maximum body span of a single heading, in characters.
    pub max_part_span_chars: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            title_max_chars: 100,
            max_part_span_chars: 15_000,
        }
    }
}

/// Semantic extractor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    /// Consult the semantic extractor when one is attached.
    pub enabled: bool,

    /// Deadline for a single call, in milliseconds.
    pub timeout_ms: u64,

    /// Characters of a part's text sent as the excerpt.
    pub excerpt_chars: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 30_000,
            excerpt_chars: 8_000,
        }
    }
}

impl SemanticConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Schema mapping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Fields per semantic classifier request.
    pub batch_size: usize,

    /// Deadline for a single classifier call, in milliseconds.
    pub classifier_timeout_ms: u64,

    /// Schema file; the built-in schema is used when unset.
    pub schema_file: Option<PathBuf>,

    /// Rule table file; the built-in rules are used when unset.
    pub rules_file: Option<PathBuf>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            classifier_timeout_ms: 30_000,
            schema_file: None,
            rules_file: None,
        }
    }
}

impl MappingConfig {
    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_millis(self.classifier_timeout_ms)
    }
}

impl FormxConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
