//! Running a kernel inside its own span.
//!
//! # Responsibilities
//! - Open an internal child span under the caller's context, tagged with `n`
//! - Mark known-bad inputs before the kernel runs
//! - Record kernel errors as exception events and error status
//! - Close the span on every exit path

use crate::error::KernelError;
use crate::kernel::Kernel;
use crate::telemetry::attributes::KeyValue;
use crate::telemetry::context::TraceContext;
use crate::telemetry::span::{SpanKind, Status};
use crate::telemetry::tracer::Tracer;

pub const LIMIT_EXCEPTION_TYPE: &str = "Processing exception";
pub const LIMIT_EXCEPTION_MESSAGE: &str = "You have hit the limit!";
pub const LIMIT_STATUS: &str = "Critical Error";

/// Flags inputs divisible by `every`. Zero flags nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitPolicy {
    pub every: u64,
}

impl LimitPolicy {
    pub fn new(every: u64) -> Self {
        Self { every }
    }

    pub fn is_limited(&self, input: u64) -> bool {
        self.every != 0 && input % self.every == 0
    }
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self { every: 5 }
    }
}

/// Run `kernel` on `input` in a child span of `parent`.
///
/// The kernel's result is returned unchanged; the span only observes it.
pub fn invoke(
    tracer: &Tracer,
    parent: &TraceContext,
    kernel: &dyn Kernel,
    policy: &LimitPolicy,
    input: u64,
) -> Result<u64, KernelError> {
    let n = i64::try_from(input).unwrap_or(i64::MAX);
    let mut span = tracer.start_span(
        parent,
        kernel.span_name(),
        SpanKind::Internal,
        vec![KeyValue::new("n", n)],
    );

    if policy.is_limited(input) {
        span.record_exception(LIMIT_EXCEPTION_TYPE, LIMIT_EXCEPTION_MESSAGE);
        span.set_status(Status::error(LIMIT_STATUS));
    }

    let result = kernel.run(input);
    if let Err(err) = &result {
        span.record_exception(err.kind(), &err.to_string());
        span.set_status(Status::error(err.to_string()));
        tracing::debug!(input, error = %err, "Kernel failed");
    }

    if let Err(e) = span.end() {
        tracing::warn!(error = %e, "Kernel span closed twice");
    }
    result
}
