//! Retry decisions for span export.
//!
//! # Design Decisions
//! - Only transient failures are retried (transport, timeout, 429, 5xx)
//! - `max_attempts` counts the first attempt, so 1 means "never retry"

use std::time::Duration;

use crate::error::ExportError;
use crate::resilience::backoff::Backoff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Delay before the next attempt, or `None` to give up.
    pub fn next_delay(&self, attempt: u32, error: &ExportError) -> Option<Duration> {
        if attempt >= self.max_attempts || !error.is_retryable() {
            return None;
        }
        Some(self.backoff.delay(attempt))
    }
}
