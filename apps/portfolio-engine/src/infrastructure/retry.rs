//! Backoff schedule for retry loops.

use std::time::Duration;

use rand::Rng;

/// Bounded retry schedule with full jitter.
///
/// The delay ceiling grows geometrically from `base` up to `cap`; each
/// actual delay is drawn uniformly below the ceiling, which spreads
/// contending retriers apart instead of re-colliding them in lockstep.
#[derive(Debug)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
    factor: f64,
    limit: u32,
    attempt: u32,
}

impl BackoffPolicy {
    /// A schedule starting at `base`, growing by `factor` per attempt,
    /// never exceeding `cap`, spent after `limit` attempts.
    #[must_use]
    pub const fn new(base: Duration, cap: Duration, factor: f64, limit: u32) -> Self {
        Self {
            base,
            cap,
            factor,
            limit,
            attempt: 0,
        }
    }

    /// Delay to wait before the next attempt, or `None` once the schedule
    /// is spent.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.attempt >= self.limit {
            return None;
        }

        let grown = (self.base.as_millis() as f64)
            * self
                .factor
                .powi(i32::try_from(self.attempt).unwrap_or(i32::MAX));
        let ceiling = grown.min(self.cap.as_millis() as f64);
        self.attempt += 1;

        let jittered = rand::rng().random_range(0.0..ceiling);
        Some(Duration::from_millis(jittered as u64))
    }

    /// Start the schedule over after a success.
    #[allow(clippy::missing_const_for_fn)]
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Attempts consumed since the last reset.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempt
    }
}

impl Default for BackoffPolicy {
    /// 100ms doubling to a 5s cap over ten attempts.
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(5), 2.0, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubling(limit: u32) -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_millis(100), Duration::from_secs(5), 2.0, limit)
    }

    #[test]
    fn delays_stay_under_the_growing_ceiling() {
        let mut policy = doubling(4);
        for ceiling_ms in [100, 200, 400, 800] {
            let delay = policy.next_backoff().unwrap();
            assert!(delay <= Duration::from_millis(ceiling_ms));
        }
        assert_eq!(policy.attempts(), 4);
    }

    #[test]
    fn cap_bounds_every_delay() {
        let mut policy =
            BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(2), 10.0, 8);
        while let Some(delay) = policy.next_backoff() {
            assert!(delay <= Duration::from_secs(2));
        }
        assert_eq!(policy.attempts(), 8);
    }

    #[test]
    fn schedule_is_spent_after_the_limit() {
        let mut policy = doubling(2);
        assert!(policy.next_backoff().is_some());
        assert!(policy.next_backoff().is_some());
        assert!(policy.next_backoff().is_none());
        assert!(policy.next_backoff().is_none());
    }

    #[test]
    fn reset_starts_the_schedule_over() {
        let mut policy = doubling(2);
        while policy.next_backoff().is_some() {}

        policy.reset();
        assert_eq!(policy.attempts(), 0);
        assert!(policy.next_backoff().is_some());
    }
}
