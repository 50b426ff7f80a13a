//! Span lifecycle.
//!
//! # State Machine
//! ```text
//! Open ──end()──▶ Closed ──▶ SpanData handed to the exporter queue
//!   │
//!   └──drop while open──▶ Closed (marked cancelled) ──▶ exporter queue
//! ```
//!
//! # Design Decisions
//! - A [`Span`] is owned by the code path that started it; nothing else
//!   can mutate it
//! - Closing produces an immutable [`SpanData`] snapshot moved to the sink,
//!   so each span is enqueued at most once
//! - Status is monotonic: `Unset < Ok < Error`. A later error replaces an
//!   earlier error's message; `Ok` never replaces an error
//! - Dropping an open span closes it instead of leaking it

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::TraceError;
use crate::telemetry::attributes::{self, AttributeValue, KeyValue};
use crate::telemetry::clock::Clock;
use crate::telemetry::context::{SpanId, TraceContext};

pub const EXCEPTION_EVENT: &str = "exception";
pub const EXCEPTION_TYPE: &str = "exception.type";
pub const EXCEPTION_MESSAGE: &str = "exception.message";
pub const CANCELLED_ATTRIBUTE: &str = "span.cancelled";

const DROPPED_OPEN_MESSAGE: &str = "span dropped before end";

/// Receives closed spans. Must never block.
pub trait SpanSink: Send + Sync {
    fn enqueue(&self, span: SpanData);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Internal,
    Server,
}

/// Terminal status of a span.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Unset,
    Ok,
    Error { message: String },
}

impl Status {
    pub fn error(message: impl Into<String>) -> Self {
        Status::Error {
            message: message.into(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Status::Unset => 0,
            Status::Ok => 1,
            Status::Error { .. } => 2,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error { .. })
    }
}

/// A timestamped annotation on a span.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub timestamp: SystemTime,
    pub attributes: Vec<KeyValue>,
}

impl Event {
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        attributes::find(&self.attributes, key)
    }
}

/// Immutable record of a closed span.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanData {
    pub context: TraceContext,
    pub parent_span_id: SpanId,
    pub name: String,
    pub kind: SpanKind,
    pub start_time: SystemTime,
    pub end_time: SystemTime,
    pub attributes: Vec<KeyValue>,
    pub events: Vec<Event>,
    pub status: Status,
}

impl SpanData {
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        attributes::find(&self.attributes, key)
    }

    /// Events named `exception`, in recording order.
    pub fn exceptions(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(|e| e.name == EXCEPTION_EVENT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanState {
    Open,
    Closed,
}

/// An open span. Started by [`Tracer::start_span`](crate::telemetry::Tracer::start_span).
pub struct Span {
    context: TraceContext,
    parent_span_id: SpanId,
    name: String,
    kind: SpanKind,
    start_time: SystemTime,
    attributes: Vec<KeyValue>,
    events: Vec<Event>,
    status: Status,
    state: SpanState,
    clock: Clock,
    sink: Arc<dyn SpanSink>,
}

impl Span {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        context: TraceContext,
        parent_span_id: SpanId,
        name: String,
        kind: SpanKind,
        attributes: Vec<KeyValue>,
        clock: Clock,
        sink: Arc<dyn SpanSink>,
    ) -> Self {
        let mut deduped = Vec::with_capacity(attributes.len());
        for kv in attributes {
            attributes::upsert(&mut deduped, kv);
        }
        Self {
            context,
            parent_span_id,
            name,
            kind,
            start_time: clock.now(),
            attributes: deduped,
            events: Vec::new(),
            status: Status::Unset,
            state: SpanState::Open,
            clock,
            sink,
        }
    }

    /// Context of this span; use it as the parent of child spans.
    pub fn context(&self) -> TraceContext {
        self.context
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_open(&self) -> bool {
        self.state == SpanState::Open
    }

    pub fn set_attribute(&mut self, kv: KeyValue) {
        if self.reject_closed("set_attribute") {
            return;
        }
        attributes::upsert(&mut self.attributes, kv);
    }

    pub fn add_event(&mut self, name: impl Into<String>, attributes: Vec<KeyValue>) {
        if self.reject_closed("add_event") {
            return;
        }
        self.events.push(Event {
            name: name.into(),
            timestamp: self.clock.now(),
            attributes,
        });
    }

    /// Append an `exception` event with an explicit type and message.
    pub fn record_exception(&mut self, exception_type: &str, message: &str) {
        self.add_event(
            EXCEPTION_EVENT,
            vec![
                KeyValue::new(EXCEPTION_TYPE, exception_type),
                KeyValue::new(EXCEPTION_MESSAGE, message),
            ],
        );
    }

    /// Append an `exception` event describing `err`.
    ///
    /// The type is taken from the error's type name; callers with a more
    /// stable classification should use [`Span::record_exception`].
    pub fn record_error<E: StdError + ?Sized>(&mut self, err: &E) {
        let exception_type = std::any::type_name::<E>();
        self.record_exception(exception_type, &err.to_string());
    }

    /// Set the terminal status, never lowering its rank.
    pub fn set_status(&mut self, status: Status) {
        if self.reject_closed("set_status") {
            return;
        }
        if status.rank() >= self.status.rank() {
            self.status = status;
        }
    }

    /// Close the span and hand it to the exporter.
    pub fn end(&mut self) -> Result<(), TraceError> {
        if self.state == SpanState::Closed {
            return Err(TraceError::AlreadyClosed {
                name: self.name.clone(),
            });
        }
        self.state = SpanState::Closed;

        let end_time = self.clock.now().max(self.start_time);
        let data = SpanData {
            context: self.context,
            parent_span_id: self.parent_span_id,
            name: self.name.clone(),
            kind: self.kind,
            start_time: self.start_time,
            end_time,
            attributes: std::mem::take(&mut self.attributes),
            events: std::mem::take(&mut self.events),
            status: std::mem::take(&mut self.status),
        };
        self.sink.enqueue(data);
        Ok(())
    }

    fn reject_closed(&self, operation: &'static str) -> bool {
        if self.state == SpanState::Closed {
            tracing::debug!(span = %self.name, operation, "Ignoring mutation of closed span");
            return true;
        }
        false
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if self.state == SpanState::Open {
            self.set_attribute(KeyValue::new(CANCELLED_ATTRIBUTE, true));
            self.set_status(Status::error(DROPPED_OPEN_MESSAGE));
            tracing::debug!(span = %self.name, trace_id = %self.context.trace_id(), "Closing span dropped while open");
            let _ = self.end();
        }
    }
}

impl std::fmt::Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Span")
            .field("name", &self.name)
            .field("context", &self.context)
            .field("state", &self.state)
            .field("status", &self.status)
            .finish()
    }
}
