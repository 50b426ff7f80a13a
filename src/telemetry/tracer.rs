//! Span creation.
//!
//! # Responsibilities
//! - Derive child contexts: new span id, inherited trace id
//! - Mint a new trace when the parent context is empty
//! - Hand every span the exporter sink it reports to on close
//!
//! # Design Decisions
//! - Always sample: every span is recorded and exported
//! - Cheap to clone; one tracer is shared by all requests

use std::sync::Arc;

use crate::telemetry::attributes::KeyValue;
use crate::telemetry::clock::Clock;
use crate::telemetry::context::{SpanId, TraceContext, TraceFlags, TraceId};
use crate::telemetry::span::{Span, SpanKind, SpanSink};

#[derive(Clone)]
pub struct Tracer {
    clock: Clock,
    sink: Arc<dyn SpanSink>,
}

impl Tracer {
    pub fn new(sink: Arc<dyn SpanSink>) -> Self {
        Self {
            clock: Clock::new(),
            sink,
        }
    }

    /// Start a span under `parent`.
    ///
    /// The new span's [`Span::context`] is the child context for any
    /// further spans in the same unit of work.
    pub fn start_span(
        &self,
        parent: &TraceContext,
        name: impl Into<String>,
        kind: SpanKind,
        attributes: Vec<KeyValue>,
    ) -> Span {
        let trace_id = if parent.is_empty() {
            TraceId::random()
        } else {
            parent.trace_id()
        };
        let parent_span_id = if parent.has_parent() {
            parent.span_id()
        } else {
            SpanId::INVALID
        };
        let context = TraceContext::new(trace_id, SpanId::random(), TraceFlags::SAMPLED, false);

        Span::new(
            context,
            parent_span_id,
            name.into(),
            kind,
            attributes,
            self.clock,
            self.sink.clone(),
        )
    }
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::span::SpanData;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<SpanData>>);

    impl SpanSink for Collect {
        fn enqueue(&self, span: SpanData) {
            self.0.lock().unwrap().push(span);
        }
    }

    #[test]
    fn test_empty_parent_starts_new_trace() {
        let tracer = Tracer::new(Arc::new(Collect::default()));
        let mut a = tracer.start_span(&TraceContext::empty(), "a", SpanKind::Server, vec![]);
        let mut b = tracer.start_span(&TraceContext::empty(), "b", SpanKind::Server, vec![]);

        assert!(a.context().is_valid());
        assert_ne!(a.context().trace_id(), b.context().trace_id());
        a.end().unwrap();
        b.end().unwrap();
    }

    #[test]
    fn test_fresh_root_keeps_trace_id_without_parent() {
        let sink = Arc::new(Collect::default());
        let tracer = Tracer::new(sink.clone());
        let root = TraceContext::new_root();

        let mut span = tracer.start_span(&root, "server", SpanKind::Server, vec![]);
        assert_eq!(span.context().trace_id(), root.trace_id());
        span.end().unwrap();

        assert_eq!(sink.0.lock().unwrap()[0].parent_span_id, SpanId::INVALID);
    }

    #[test]
    fn test_child_inherits_trace_and_parent() {
        let sink = Arc::new(Collect::default());
        let tracer = Tracer::new(sink.clone());

        let mut parent = tracer.start_span(&TraceContext::new_root(), "parent", SpanKind::Server, vec![]);
        let mut child = tracer.start_span(&parent.context(), "child", SpanKind::Internal, vec![]);
        child.end().unwrap();
        parent.end().unwrap();

        let spans = sink.0.lock().unwrap();
        let (child, parent) = (&spans[0], &spans[1]);
        assert_eq!(child.context.trace_id(), parent.context.trace_id());
        assert_eq!(child.parent_span_id, parent.context.span_id());
        assert_ne!(child.context.span_id(), parent.context.span_id());
        assert!(child.start_time >= parent.start_time);
    }
}
