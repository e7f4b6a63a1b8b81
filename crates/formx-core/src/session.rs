//! Exclusive access to a document shared between extraction and user edits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use crate::extract::orchestrator::{ExtractionReport, FormExtractor};
use crate::mapping::engine::{MappingEngine, MappingReport};
use crate::models::document::Document;
use crate::source::SourceText;

/// Cooperative cancellation flag, checked between parts.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A document behind a lock. Extraction, mapping and edits all take it.
#[derive(Debug, Clone, Default)]
pub struct SharedDocument {
    inner: Arc<Mutex<Document>>,
}

impl SharedDocument {
    pub fn new(document: Document) -> Self {
        Self {
            inner: Arc::new(Mutex::new(document)),
        }
    }

    /// Lock the document. A poisoned lock is recovered; every edit leaves
    /// the document structurally valid.
    pub fn lock(&self) -> MutexGuard<'_, Document> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("Document lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Run extraction while holding the lock and replace the document with its result.
    pub fn extract_into(
        &self,
        extractor: &FormExtractor,
        source: &SourceText,
        cancel: &CancellationToken,
    ) -> ExtractionReport {
        let mut guard = self.lock();
        let report = extractor.extract_with_cancel(source, cancel);
        *guard = report.document.clone();
        report
    }

    /// Run the mapping engine while holding the lock.
    pub fn map_with(&self, engine: &MappingEngine) -> MappingReport {
        engine.apply(&mut self.lock())
    }

    /// Apply a user edit.
    pub fn edit<R>(&self, edit: impl FnOnce(&mut Document) -> R) -> R {
        edit(&mut self.lock())
    }

    /// Copy of the current document.
    pub fn snapshot(&self) -> Document {
        self.lock().clone()
    }
}
