//! Resilience for outbound export calls.
//!
//! # Data Flow
//! ```text
//! Batch export attempt fails:
//!     → retries.rs (is the error transient? attempts left?)
//!     → backoff.rs (how long to wait before the next attempt)
//!     → retry, or drop the batch and count it
//! ```
//!
//! # Design Decisions
//! - Attempts are bounded; a batch is never retried forever
//! - Jittered backoff keeps many instances from hammering a recovering collector

pub mod backoff;
pub mod retries;

pub use backoff::Backoff;
pub use retries::RetryPolicy;
