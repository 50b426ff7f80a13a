//! Exporter that keeps spans in memory. Used by tests and local debugging.

use std::sync::{Arc, Mutex};

use crate::error::ExportError;
use crate::telemetry::exporter::SpanExporter;
use crate::telemetry::span::SpanData;

/// Collects exported spans; clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemorySpanExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
    batches: Arc<Mutex<Vec<usize>>>,
}

impl InMemorySpanExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All spans exported so far, in export order.
    pub fn finished_spans(&self) -> Vec<SpanData> {
        self.spans.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Sizes of the batches received so far.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn reset(&self) {
        if let Ok(mut spans) = self.spans.lock() {
            spans.clear();
        }
        if let Ok(mut batches) = self.batches.lock() {
            batches.clear();
        }
    }
}

impl SpanExporter for InMemorySpanExporter {
    async fn export(&self, batch: &[SpanData]) -> Result<(), ExportError> {
        let mut spans = self
            .spans
            .lock()
            .map_err(|e| ExportError::Other(e.to_string()))?;
        spans.extend_from_slice(batch);
        drop(spans);

        if let Ok(mut batches) = self.batches.lock() {
            batches.push(batch.len());
        }
        Ok(())
    }
}
