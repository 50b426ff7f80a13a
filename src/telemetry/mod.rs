//! Request-scoped distributed tracing.
//!
//! # Data Flow
//! ```text
//! inbound headers
//!     → propagation.rs (traceparent → parent TraceContext)
//!     → tracer.rs (server span, child spans)
//!     → span.rs (attributes, events, status, end)
//!     → exporter/ (queue, batch, retry, OTLP/HTTP)
//! ```
//!
//! # Design Decisions
//! - One [`Telemetry`] value is built in `main` and passed down explicitly;
//!   nothing is registered globally
//! - Setup problems degrade export, never the service

use std::sync::Arc;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::error::ExportError;

pub mod attributes;
pub mod clock;
pub mod context;
pub mod exporter;
pub mod propagation;
pub mod resource;
pub mod span;
pub mod tracer;

pub use attributes::{AttributeValue, KeyValue};
pub use context::{SpanId, TraceContext, TraceFlags, TraceId};
pub use exporter::{BatchConfig, BatchSpanProcessor, NoopExporter, OtlpHttpExporter, SpanExporter};
pub use propagation::TraceContextPropagator;
pub use resource::Resource;
pub use span::{Span, SpanData, SpanKind, Status};
pub use tracer::Tracer;

/// The tracing context of the process: resource, propagator, tracer and
/// the export pipeline behind it.
#[derive(Clone)]
pub struct Telemetry {
    resource: Arc<Resource>,
    propagator: TraceContextPropagator,
    tracer: Tracer,
    processor: Arc<BatchSpanProcessor>,
}

impl Telemetry {
    /// Build the pipeline from configuration. Must run inside a tokio runtime.
    ///
    /// Resource warnings are logged. If the OTLP exporter cannot be built the
    /// pipeline still runs and discards every batch.
    pub fn init(config: &ServiceConfig) -> Self {
        let outcome = resource::build_resource(&config.service);
        for warning in &outcome.warnings {
            tracing::warn!(warning = %warning, "Resource built with warnings");
        }
        let resource = outcome.resource;
        let batch = BatchConfig::from(&config.exporter);

        match OtlpHttpExporter::new(&config.collector, resource.clone()) {
            Ok(exporter) => Self::with_exporter(resource, exporter, batch),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    endpoint = %config.collector.endpoint,
                    "Failed to build OTLP exporter, spans will be discarded"
                );
                Self::with_exporter(resource, NoopExporter, batch)
            }
        }
    }

    /// Build the pipeline around an arbitrary exporter.
    pub fn with_exporter<E: SpanExporter>(
        resource: Arc<Resource>,
        exporter: E,
        config: BatchConfig,
    ) -> Self {
        let processor = Arc::new(BatchSpanProcessor::new(exporter, config));
        let tracer = Tracer::new(processor.clone());
        Self {
            resource,
            propagator: TraceContextPropagator::new(),
            tracer,
            processor,
        }
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn propagator(&self) -> &TraceContextPropagator {
        &self.propagator
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn processor(&self) -> &BatchSpanProcessor {
        &self.processor
    }

    /// Export everything enqueued so far.
    pub async fn force_flush(&self) -> Result<(), ExportError> {
        self.processor.force_flush().await
    }

    /// Drain the export pipeline, waiting at most `deadline`.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), ExportError> {
        self.processor.shutdown(deadline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::exporter::InMemorySpanExporter;

    #[tokio::test]
    async fn test_spans_reach_exporter_through_handle() {
        let exporter = InMemorySpanExporter::new();
        let telemetry = Telemetry::with_exporter(
            Arc::new(Resource::empty()),
            exporter.clone(),
            BatchConfig::default(),
        );

        let mut span = telemetry.tracer().start_span(
            &TraceContext::empty(),
            "quote",
            SpanKind::Server,
            Vec::new(),
        );
        span.end().unwrap();

        telemetry.force_flush().await.unwrap();
        let spans = exporter.finished_spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "quote");

        telemetry.shutdown(Duration::from_secs(1)).await.unwrap();
        assert!(matches!(
            telemetry.shutdown(Duration::from_secs(1)).await,
            Err(ExportError::AlreadyShutdown)
        ));
    }

    #[tokio::test]
    async fn test_init_with_bad_endpoint_falls_back() {
        let mut config = ServiceConfig::default();
        config.collector.endpoint = "http://".to_string();

        let telemetry = Telemetry::init(&config);
        let mut span = telemetry.tracer().start_span(
            &TraceContext::empty(),
            "quote",
            SpanKind::Server,
            Vec::new(),
        );
        span.end().unwrap();

        assert!(telemetry.force_flush().await.is_ok());
        assert_eq!(telemetry.processor().dropped_spans(), 0);
    }
}
