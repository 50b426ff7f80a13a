//! W3C Trace Context propagation.
//!
//! # Responsibilities
//! - Extract a parent [`TraceContext`] from inbound `traceparent` headers
//! - Inject a context into outbound header maps
//!
//! # Header format
//! ```text
//! traceparent: 00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01
//!              ^^ ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^ ^^^^^^^^^^^^^^^^ ^^
//!         version          trace-id                   parent-id    flags
//! ```
//!
//! # Design Decisions
//! - Extraction never fails a request: absent or malformed headers yield a
//!   fresh root context with a new trace id
//! - Injection overwrites any previous `traceparent`
//! - Stateless; safe to share across requests

use axum::http::{HeaderMap, HeaderValue};

use crate::error::PropagationError;
use crate::telemetry::context::{SpanId, TraceContext, TraceFlags, TraceId};

pub const TRACEPARENT_HEADER: &str = "traceparent";

const SUPPORTED_VERSION: u8 = 0;
const MAX_VERSION: u8 = 254;

/// Propagates [`TraceContext`] in W3C `traceparent` format.
#[derive(Clone, Debug, Default)]
pub struct TraceContextPropagator {
    _private: (),
}

impl TraceContextPropagator {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Extract the parent context, falling back to a new root trace.
    pub fn extract(&self, headers: &HeaderMap) -> TraceContext {
        match self.extract_checked(headers) {
            Ok(ctx) => ctx,
            Err(PropagationError::Missing) => TraceContext::new_root(),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed traceparent, starting new trace");
                TraceContext::new_root()
            }
        }
    }

    /// Extract the parent context, reporting why extraction failed.
    pub fn extract_checked(&self, headers: &HeaderMap) -> Result<TraceContext, PropagationError> {
        let value = headers
            .get(TRACEPARENT_HEADER)
            .ok_or(PropagationError::Missing)?
            .to_str()
            .map_err(|_| PropagationError::NotAscii)?;
        parse_traceparent(value)
    }

    /// Write `traceparent` for `ctx`, replacing any previous value.
    ///
    /// Contexts without a valid span id have nothing to propagate and leave
    /// the map untouched.
    pub fn inject(&self, ctx: &TraceContext, headers: &mut HeaderMap) {
        if !ctx.is_valid() {
            return;
        }
        let value = format_traceparent(ctx);
        match HeaderValue::from_str(&value) {
            Ok(v) => {
                headers.insert(TRACEPARENT_HEADER, v);
            }
            Err(e) => tracing::debug!(error = %e, "Failed to encode traceparent"),
        }
    }
}

/// Encode a context as a version 00 `traceparent` value.
pub fn format_traceparent(ctx: &TraceContext) -> String {
    format!(
        "{:02x}-{}-{}-{:02x}",
        SUPPORTED_VERSION,
        ctx.trace_id(),
        ctx.span_id(),
        ctx.flags().to_u8()
    )
}

/// Decode a `traceparent` value into a remote context.
pub fn parse_traceparent(value: &str) -> Result<TraceContext, PropagationError> {
    let parts: Vec<&str> = value.trim().split_terminator('-').collect();
    if parts.len() < 4 {
        return Err(PropagationError::PartCount(parts.len()));
    }

    if parts[0].len() != 2 || parts[0].bytes().any(|b| b.is_ascii_uppercase()) {
        return Err(PropagationError::Version(parts[0].to_string()));
    }
    let version = u8::from_str_radix(parts[0], 16)
        .map_err(|_| PropagationError::Version(parts[0].to_string()))?;
    if version > MAX_VERSION || (version == SUPPORTED_VERSION && parts.len() != 4) {
        return Err(PropagationError::Version(parts[0].to_string()));
    }

    let trace_id = TraceId::from_hex(parts[1])
        .filter(TraceId::is_valid)
        .ok_or_else(|| PropagationError::TraceId(parts[1].to_string()))?;

    let span_id = SpanId::from_hex(parts[2])
        .filter(SpanId::is_valid)
        .ok_or_else(|| PropagationError::SpanId(parts[2].to_string()))?;

    if parts[3].len() != 2 || parts[3].bytes().any(|b| b.is_ascii_uppercase()) {
        return Err(PropagationError::Flags(parts[3].to_string()));
    }
    let flags = u8::from_str_radix(parts[3], 16)
        .map_err(|_| PropagationError::Flags(parts[3].to_string()))?;
    if version == SUPPORTED_VERSION && flags > 2 {
        return Err(PropagationError::Flags(parts[3].to_string()));
    }

    Ok(TraceContext::new(trace_id, span_id, TraceFlags::new(flags), true))
}
