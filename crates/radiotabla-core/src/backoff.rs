// ── Refresh backoff ──
//
// Pacing for the bulk refresh timer. A healthy service is polled at the
// configured interval; each consecutive failed refresh doubles the wait
// up to a ceiling, and a single success resets it.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff with additive jitter.
///
/// `delay = min(interval * 2^failures, max) + jitter`, with jitter drawn
/// uniformly from `[0, delay / 10]`.
#[derive(Debug, Clone)]
pub struct Backoff {
    interval: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(interval: Duration, max: Duration) -> Self {
        Self {
            interval,
            max,
            failures: 0,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
    }

    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    /// The capped delay before jitter.
    pub fn base_delay(&self) -> Duration {
        let factor = 2u32.saturating_pow(self.failures);
        self.interval.saturating_mul(factor).min(self.max)
    }

    /// The next delay with jitter applied.
    pub fn next_delay(&self, rng: &mut impl Rng) -> Duration {
        let base = self.base_delay();
        let spread = u64::try_from((base / 10).as_millis()).unwrap_or(u64::MAX);
        base + Duration::from_millis(rng.gen_range(0..=spread))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn backoff() -> Backoff {
        Backoff::new(Duration::from_secs(60), Duration::from_secs(600))
    }

    #[test]
    fn healthy_refreshes_use_the_interval() {
        let b = backoff();
        assert_eq!(b.base_delay(), Duration::from_secs(60));
    }

    #[test]
    fn failures_double_the_delay_up_to_the_cap() {
        let mut b = backoff();
        b.record_failure();
        assert_eq!(b.base_delay(), Duration::from_secs(120));
        b.record_failure();
        assert_eq!(b.base_delay(), Duration::from_secs(240));
        for _ in 0..40 {
            b.record_failure();
        }
        assert_eq!(b.base_delay(), Duration::from_secs(600));
    }

    #[test]
    fn success_resets() {
        let mut b = backoff();
        b.record_failure();
        b.record_failure();
        b.record_success();
        assert_eq!(b.failures(), 0);
        assert_eq!(b.base_delay(), Duration::from_secs(60));
    }

    #[test]
    fn jitter_stays_within_a_tenth() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut b = backoff();
        b.record_failure();
        for _ in 0..100 {
            let d = b.next_delay(&mut rng);
            assert!(d >= Duration::from_secs(120), "{d:?} below base");
            assert!(d <= Duration::from_secs(132), "{d:?} above base + 10%");
        }
    }
}
