//! Observability of the service itself.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and histograms, Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Diagnostics stay on the `tracing` facade; spans exported to the collector
//!   live in `crate::telemetry` and never go through the log pipeline
//! - Metric updates are cheap and safe to call with no recorder installed

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
