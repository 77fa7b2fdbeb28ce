//! Exponential backoff schedule for retried calls

use std::time::Duration;

/// Capped exponential backoff: the wait after attempt `n` is
/// `base * 2^n`, never exceeding `cap`.
///
/// The policy is pure arithmetic; whether a failure is worth retrying at
/// all is the caller's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
}

impl BackoffPolicy {
    pub const fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Delay to wait after the failure of the zero-indexed `attempt`.
    ///
    /// Saturates instead of overflowing, so arbitrarily large attempt
    /// numbers settle at the cap.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = u64::try_from(self.base.as_millis()).unwrap_or(u64::MAX);
        let cap_ms = u64::try_from(self.cap.as_millis()).unwrap_or(u64::MAX);
        let doubled = base_ms.saturating_mul(1u64 << attempt.min(16));
        Duration::from_millis(doubled.min(cap_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_policy() -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_millis(1_000), Duration::from_millis(10_000))
    }

    #[test]
    fn doubles_until_the_cap() {
        let policy = default_policy();
        let expected = [1_000u64, 2_000, 4_000, 8_000, 10_000, 10_000];
        for (attempt, millis) in expected.into_iter().enumerate() {
            assert_eq!(
                policy.delay_for(attempt as u32),
                Duration::from_millis(millis),
                "attempt {attempt}",
            );
        }
    }

    #[test]
    fn delays_never_decrease() {
        let policy = default_policy();
        let mut previous = Duration::ZERO;
        for attempt in 0..20 {
            let delay = policy.delay_for(attempt);
            assert!(delay >= previous, "attempt {attempt} regressed");
            previous = delay;
        }
    }

    #[test]
    fn huge_attempt_numbers_saturate_at_the_cap() {
        let policy = default_policy();
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(10_000));
    }

    #[test]
    fn zero_base_never_waits() {
        let policy = BackoffPolicy::new(Duration::ZERO, Duration::from_secs(10));
        assert_eq!(policy.delay_for(5), Duration::ZERO);
    }

    #[test]
    fn custom_base_and_cap_are_respected() {
        let policy = BackoffPolicy::new(Duration::from_millis(250), Duration::from_millis(900));
        assert_eq!(policy.delay_for(0), Duration::from_millis(250));
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(900));
    }
}
