//! Exponential backoff with jitter for the upstream poller.
//!
//! OpenSky answers 429 when anonymous clients poll too fast; doubling the
//! wait on every consecutive failure keeps the loop from hammering it.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: u32,
    jitter_ratio: f64,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        Self {
            base,
            max: max.max(base),
            failures: 0,
            jitter_ratio: 0.2,
        }
    }

    /// Consecutive failures since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Record a failure and return how long to wait before retrying.
    ///
    /// The first failure waits `base`, each further one doubles it, capped at
    /// `max`, plus up to 20% jitter.
    pub fn fail(&mut self) -> Duration {
        let exponent = self.failures.min(16);
        self.failures = self.failures.saturating_add(1);
        let delay = self.base.saturating_mul(1 << exponent).min(self.max);
        with_jitter(delay, self.jitter_ratio)
    }
}

fn with_jitter(delay: Duration, ratio: f64) -> Duration {
    let jitter_ms_max = (delay.as_millis() as f64 * ratio) as u64;
    if jitter_ms_max == 0 {
        return delay;
    }

    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    delay + Duration::from_millis(seed % (jitter_ms_max + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_failure_waits_base() {
        let mut backoff = Backoff::new(Duration::from_secs(10), Duration::from_secs(120));
        let delay = backoff.fail();
        assert!(delay >= Duration::from_secs(10));
        assert!(delay <= Duration::from_secs(12));
        assert_eq!(backoff.failures(), 1);
    }

    #[test]
    fn consecutive_failures_double_until_max() {
        let mut backoff = Backoff::new(Duration::from_secs(10), Duration::from_secs(30));
        backoff.fail();
        let second = backoff.fail();
        assert!(second >= Duration::from_secs(20) && second <= Duration::from_secs(24));
        let third = backoff.fail();
        assert!(third >= Duration::from_secs(30) && third <= Duration::from_secs(36));
        let fourth = backoff.fail();
        assert!(fourth <= Duration::from_secs(36));
    }

    #[test]
    fn reset_starts_over() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(5));
        backoff.fail();
        backoff.fail();
        backoff.reset();
        assert_eq!(backoff.failures(), 0);
        assert!(backoff.fail() <= Duration::from_millis(120));
    }
}
