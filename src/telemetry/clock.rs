//! Span timestamps.
//!
//! Wall-clock time anchored once and advanced by a monotonic [`Instant`], so
//! timestamps taken later in the process are never earlier. A child span
//! started after its parent therefore never reports an earlier start time,
//! even if the system clock steps backwards.

use std::time::{Instant, SystemTime};

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    wall: SystemTime,
    mono: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            wall: SystemTime::now(),
            mono: Instant::now(),
        }
    }

    pub fn now(&self) -> SystemTime {
        self.wall + self.mono.elapsed()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
