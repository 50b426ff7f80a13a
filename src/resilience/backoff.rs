//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Exponential delay schedule, capped, with up to 10% added jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_ms = self.base.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        let factor = 2u64.saturating_pow(attempt - 1);
        let capped_ms = base_ms.saturating_mul(factor).min(max_ms);

        let jitter_range = capped_ms / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };

        Duration::from_millis(capped_ms + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(1000));

        assert_eq!(backoff.delay(0), Duration::ZERO);

        let d1 = backoff.delay(1);
        assert!(d1 >= Duration::from_millis(100) && d1 < Duration::from_millis(110));

        let d2 = backoff.delay(2);
        assert!(d2 >= Duration::from_millis(200) && d2 < Duration::from_millis(220));

        let capped = backoff.delay(20);
        assert!(capped >= Duration::from_millis(1000) && capped < Duration::from_millis(1100));
    }

    #[test]
    fn test_zero_base_never_waits() {
        let backoff = Backoff::new(Duration::ZERO, Duration::from_millis(1000));
        assert_eq!(backoff.delay(5), Duration::ZERO);
    }
}
