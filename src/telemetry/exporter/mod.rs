//! Span export subsystem.
//!
//! # Data Flow
//! ```text
//! Span::end()
//!     → batch.rs (bounded queue, drop when full)
//!     → background worker (size / interval flush, retry with backoff)
//!     → otlp.rs (protobuf over HTTP to the collector)
//! ```
//!
//! # Design Decisions
//! - The request path only ever does a non-blocking `try_send`
//! - One worker owns the batch; no locks around span buffers
//! - Export failures end in a log line and a counter, never in a request error

use std::future::Future;

use crate::error::ExportError;
use crate::telemetry::span::SpanData;

pub mod batch;
pub mod in_memory;
pub mod otlp;
pub mod proto;

pub use batch::{BatchConfig, BatchSpanProcessor};
pub use in_memory::InMemorySpanExporter;
pub use otlp::OtlpHttpExporter;

/// Ships a batch of closed spans somewhere.
pub trait SpanExporter: Send + Sync + 'static {
    fn export(&self, batch: &[SpanData]) -> impl Future<Output = Result<(), ExportError>> + Send;

    /// Release transport resources. Called once by the worker on shutdown.
    fn shutdown(&self) {}
}

/// Discards every batch. Used when the real exporter cannot be built.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExporter;

impl SpanExporter for NoopExporter {
    async fn export(&self, batch: &[SpanData]) -> Result<(), ExportError> {
        tracing::trace!(spans = batch.len(), "Discarding span batch, no exporter configured");
        Ok(())
    }
}
