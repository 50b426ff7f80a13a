//! Error types for the instrumentation pipeline.
//!
//! Only [`KernelError`] is meant to be observed by business code, and even
//! then only through span data. Everything else stays on the tracing path.

use std::time::Duration;

use thiserror::Error;

/// Why an inbound `traceparent` could not be used.
///
/// Always recovered by starting a new root trace.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropagationError {
    #[error("traceparent header missing")]
    Missing,

    #[error("traceparent header is not visible ASCII")]
    NotAscii,

    #[error("traceparent has {0} parts, expected at least 4")]
    PartCount(usize),

    #[error("unsupported traceparent version {0:?}")]
    Version(String),

    #[error("invalid trace id {0:?}")]
    TraceId(String),

    #[error("invalid span id {0:?}")]
    SpanId(String),

    #[error("invalid trace flags {0:?}")]
    Flags(String),
}

/// Span lifecycle contract violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    #[error("span {name:?} is already closed")]
    AlreadyClosed { name: String },
}

/// Failure of the wrapped unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("unsupported fibonacci number {input}: too large")]
    Unsupported { input: u64 },
}

impl KernelError {
    /// Stable type name recorded as `exception.type`.
    pub fn kind(&self) -> &'static str {
        match self {
            KernelError::Unsupported { .. } => "KernelError::Unsupported",
        }
    }
}

/// Failure to ship a batch to the collector.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("collector responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("export timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid collector endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("exporter already shut down")]
    AlreadyShutdown,

    #[error("export worker is gone")]
    ChannelClosed,

    #[error("{0}")]
    Other(String),
}

impl ExportError {
    /// Whether another attempt at the same batch could succeed.
    ///
    /// Transport failures, timeouts, throttling and server errors are
    /// transient; a rejected payload or bad configuration is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExportError::Transport(_) | ExportError::Timeout(_) | ExportError::Other(_) => true,
            ExportError::Status { status, .. } => *status == 429 || *status >= 500,
            ExportError::InvalidEndpoint(_)
            | ExportError::AlreadyShutdown
            | ExportError::ChannelClosed => false,
        }
    }
}

/// Non-fatal problems found while assembling the service resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceWarning {
    #[error("conflicting schema URLs {existing:?} and {incoming:?}; schema URL dropped")]
    SchemaUrlConflict { existing: String, incoming: String },

    #[error("ignoring malformed OTEL_RESOURCE_ATTRIBUTES entry {0:?}")]
    MalformedEnvEntry(String),
}
