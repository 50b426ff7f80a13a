//! Where kernel inputs come from.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

pub trait InputSource: Send + Sync {
    fn next_input(&self) -> u64;
}

/// Uniform in `0..upper`.
#[derive(Debug, Clone, Copy)]
pub struct RandomInput {
    upper: u64,
}

impl RandomInput {
    /// `upper` of zero is treated as one.
    pub fn new(upper: u64) -> Self {
        Self {
            upper: upper.max(1),
        }
    }
}

impl Default for RandomInput {
    fn default() -> Self {
        Self::new(20)
    }
}

impl InputSource for RandomInput {
    fn next_input(&self) -> u64 {
        rand::thread_rng().gen_range(0..self.upper)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedInput(pub u64);

impl InputSource for FixedInput {
    fn next_input(&self) -> u64 {
        self.0
    }
}

/// Cycles through a fixed list.
#[derive(Debug)]
pub struct SequenceInput {
    values: Vec<u64>,
    next: AtomicUsize,
}

impl SequenceInput {
    /// An empty list yields zeros.
    pub fn new(values: impl Into<Vec<u64>>) -> Self {
        Self {
            values: values.into(),
            next: AtomicUsize::new(0),
        }
    }
}

impl InputSource for SequenceInput {
    fn next_input(&self) -> u64 {
        if self.values.is_empty() {
            return 0;
        }
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        self.values[i % self.values.len()]
    }
}
