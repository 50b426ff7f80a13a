//! Trace and span identifiers.
//!
//! # Responsibilities
//! - Represent trace-id (128-bit), span-id (64-bit) and trace flags
//! - Generate random non-zero ids
//! - Carry the immutable [`TraceContext`] across the request boundary
//!
//! # Design Decisions
//! - All-zero ids are invalid, matching W3C Trace Context
//! - `TraceContext` is `Copy`; spans derive children from it by value

use std::fmt;

use rand::Rng;

/// A 128-bit trace identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TraceId(u128);

impl TraceId {
    /// The invalid, all-zero trace id.
    pub const INVALID: TraceId = TraceId(0);

    pub const fn from_u128(value: u128) -> Self {
        TraceId(value)
    }

    /// Parse exactly 32 lowercase hex digits.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 32 || !is_lower_hex(hex) {
            return None;
        }
        u128::from_str_radix(hex, 16).ok().map(TraceId)
    }

    /// Generate a new random, valid trace id.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let value: u128 = rng.gen();
            if value != 0 {
                return TraceId(value);
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }

    pub fn to_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraceId({:032x})", self.0)
    }
}

/// A 64-bit span identifier, unique within a trace.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpanId(u64);

impl SpanId {
    /// The invalid, all-zero span id.
    pub const INVALID: SpanId = SpanId(0);

    pub const fn from_u64(value: u64) -> Self {
        SpanId(value)
    }

    /// Parse exactly 16 lowercase hex digits.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 16 || !is_lower_hex(hex) {
            return None;
        }
        u64::from_str_radix(hex, 16).ok().map(SpanId)
    }

    /// Generate a new random, valid span id.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let value: u64 = rng.gen();
            if value != 0 {
                return SpanId(value);
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }

    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpanId({:016x})", self.0)
    }
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Trace flags; only the sampled bit is meaningful.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TraceFlags(u8);

impl TraceFlags {
    pub const NOT_SAMPLED: TraceFlags = TraceFlags(0x00);
    pub const SAMPLED: TraceFlags = TraceFlags(0x01);

    /// Keep only the bits this service understands.
    pub const fn new(bits: u8) -> Self {
        TraceFlags(bits & Self::SAMPLED.0)
    }

    pub fn is_sampled(&self) -> bool {
        self.0 & Self::SAMPLED.0 != 0
    }

    pub fn to_u8(self) -> u8 {
        self.0
    }
}

/// Identity of a span as seen across a request boundary.
///
/// Three shapes matter:
/// - *empty*: invalid trace id; a span started under it mints a new trace
/// - *fresh root*: valid trace id, invalid span id; fixes the trace id but
///   has no parent span
/// - *span context*: both ids valid; spans started under it become children
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TraceContext {
    trace_id: TraceId,
    span_id: SpanId,
    flags: TraceFlags,
    is_remote: bool,
}

impl TraceContext {
    pub fn new(trace_id: TraceId, span_id: SpanId, flags: TraceFlags, is_remote: bool) -> Self {
        Self {
            trace_id,
            span_id,
            flags,
            is_remote,
        }
    }

    /// Context with no trace at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A new trace with no parent span. Always sampled.
    pub fn new_root() -> Self {
        Self {
            trace_id: TraceId::random(),
            span_id: SpanId::INVALID,
            flags: TraceFlags::SAMPLED,
            is_remote: false,
        }
    }

    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    pub fn flags(&self) -> TraceFlags {
        self.flags
    }

    pub fn is_remote(&self) -> bool {
        self.is_remote
    }

    /// Both ids valid: this context can be propagated and parented to.
    pub fn is_valid(&self) -> bool {
        self.trace_id.is_valid() && self.span_id.is_valid()
    }

    pub fn is_empty(&self) -> bool {
        !self.trace_id.is_valid()
    }

    /// Whether a span started under this context has a parent span.
    pub fn has_parent(&self) -> bool {
        self.is_valid()
    }
}
