//! Ready-made retry policies.

use std::time::Duration;

use rand::Rng;

use super::policy::RetryPolicy;
use super::status::RetryStatus;

/// Factory for the common [`RetryPolicy`] shapes.
///
/// This is a zero-sized namespace, like [`IO`](crate::IO) for effects.
///
/// Unbounded policies (`constant_delay`, the backoffs and jitters) retry
/// forever on their own. Bound them with [`RetryPolicies::limit_retries`]
/// through [`RetryPolicy::append`], or with one of the `limit_*` combinators.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicies;

impl RetryPolicies {
    /// Retry immediately, at most `max_attempts` times.
    ///
    /// This counts retries, not invocations: an effect retried under
    /// `limit_retries(n)` runs at most `n + 1` times.
    ///
    /// ```rust
    /// use eddy::retry::RetryPolicies;
    ///
    /// assert_eq!(RetryPolicies::limit_retries(3).simulate(10).len(), 3);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `max_attempts` is zero.
    pub fn limit_retries(max_attempts: u32) -> RetryPolicy {
        assert!(max_attempts > 0, "limit_retries requires max_attempts > 0");
        RetryPolicy::new(move |status| {
            (status.attempt_count < max_attempts).then_some(Duration::ZERO)
        })
    }

    /// Always wait `delay`.
    pub fn constant_delay(delay: Duration) -> RetryPolicy {
        RetryPolicy::new(move |_| Some(delay))
    }

    /// Wait `base * (attempt + 1)`: 1x, 2x, 3x, ...
    ///
    /// ```rust
    /// use eddy::retry::{RetryPolicies, RetryStatus};
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicies::incremental_delay(Duration::from_millis(100));
    /// let third = RetryStatus::new(2, Duration::from_millis(300), Duration::from_millis(200));
    /// assert_eq!(policy.delay_for(&third), Some(Duration::from_millis(300)));
    /// ```
    pub fn incremental_delay(base: Duration) -> RetryPolicy {
        RetryPolicy::new(move |status| {
            Some(base.saturating_mul(status.attempt_count.saturating_add(1)))
        })
    }

    /// Wait `base` the first time, then `base * 2^attempt`.
    ///
    /// ```rust
    /// use eddy::retry::RetryPolicies;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicies::exponential_backoff_delay(Duration::from_millis(10));
    /// let delays: Vec<_> = policy
    ///     .simulate(4)
    ///     .iter()
    ///     .map(|s| policy.delay_for(s).unwrap())
    ///     .collect();
    ///
    /// assert_eq!(
    ///     delays,
    ///     [10, 20, 40, 80].map(Duration::from_millis).to_vec()
    /// );
    /// ```
    pub fn exponential_backoff_delay(base: Duration) -> RetryPolicy {
        RetryPolicy::new(move |status| Some(exponential(base, status)))
    }

    /// Random delay in `[0, min(exponential backoff, cap)]` (AWS "full jitter").
    pub fn full_jitter(base: Duration, cap: Duration) -> RetryPolicy {
        RetryPolicy::new(move |status| {
            let ceiling = exponential(base, status).min(cap);
            Some(random_between(Duration::ZERO, ceiling))
        })
    }

    /// Half the capped exponential backoff plus a random share of the other
    /// half (AWS "equal jitter").
    pub fn equal_jitter(base: Duration, cap: Duration) -> RetryPolicy {
        RetryPolicy::new(move |status| {
            let half = exponential(base, status).min(cap) / 2;
            Some(half.saturating_add(random_between(Duration::ZERO, half)))
        })
    }

    /// `base` the first time, then a random delay between `base` and three
    /// times the previous delay, capped at `cap` (AWS "decorrelated jitter").
    pub fn decorrelated_jitter(base: Duration, cap: Duration) -> RetryPolicy {
        RetryPolicy::new(move |status| {
            if status.previous_delay.is_zero() {
                Some(base)
            } else {
                let upper = status.previous_delay.saturating_mul(3);
                Some(cap.min(random_between(base, upper)))
            }
        })
    }
}

fn exponential(base: Duration, status: &RetryStatus) -> Duration {
    if status.cumulative_delay.is_zero() {
        base
    } else {
        base.saturating_mul(2u32.saturating_pow(status.attempt_count))
    }
}

/// Uniform random duration in `[low, high]`, or `low` if the range is empty.
fn random_between(low: Duration, high: Duration) -> Duration {
    if high <= low {
        return low;
    }
    let low_nanos = u64::try_from(low.as_nanos()).unwrap_or(u64::MAX);
    let high_nanos = u64::try_from(high.as_nanos()).unwrap_or(u64::MAX);
    Duration::from_nanos(rand::rng().random_range(low_nanos..=high_nanos))
}

#[cfg(test)]
mod policies_tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn delays(policy: &RetryPolicy, n: usize) -> Vec<Duration> {
        policy
            .simulate(n)
            .iter()
            .map(|s| policy.delay_for(s).unwrap())
            .collect()
    }

    #[test]
    fn test_limit_retries() {
        let policy = RetryPolicies::limit_retries(2);
        assert_eq!(policy.delay_for(&RetryStatus::ZERO), Some(Duration::ZERO));
        assert_eq!(
            policy.delay_for(&RetryStatus::new(1, Duration::ZERO, Duration::ZERO)),
            Some(Duration::ZERO)
        );
        assert_eq!(
            policy.delay_for(&RetryStatus::new(2, Duration::ZERO, Duration::ZERO)),
            None
        );
    }

    #[test]
    #[should_panic(expected = "max_attempts > 0")]
    fn test_limit_retries_rejects_zero() {
        RetryPolicies::limit_retries(0);
    }

    #[test]
    fn test_constant_delay() {
        let policy = RetryPolicies::constant_delay(ms(25));
        assert_eq!(delays(&policy, 3), vec![ms(25); 3]);
    }

    #[test]
    fn test_incremental_delay() {
        let policy = RetryPolicies::incremental_delay(ms(10));
        assert_eq!(delays(&policy, 4), vec![ms(10), ms(20), ms(30), ms(40)]);
    }

    #[test]
    fn test_incremental_with_cumulative_limit_regression() {
        let statuses = RetryPolicies::incremental_delay(ms(10))
            .limit_retries_by_cumulative_delay(ms(120))
            .simulate(20);

        assert_eq!(statuses.len(), 5);
        assert_eq!(statuses[4], RetryStatus::new(4, ms(100), ms(40)));
    }

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicies::exponential_backoff_delay(ms(100));
        assert_eq!(
            delays(&policy, 5),
            vec![ms(100), ms(200), ms(400), ms(800), ms(1600)]
        );
    }

    #[test]
    fn test_exponential_backoff_saturates() {
        let policy = RetryPolicies::exponential_backoff_delay(Duration::from_secs(1));
        let late = RetryStatus::new(200, Duration::from_secs(5), Duration::from_secs(1));
        assert!(policy.delay_for(&late).is_some());
    }

    #[test]
    fn test_full_jitter_bounds() {
        let policy = RetryPolicies::full_jitter(ms(100), ms(250));
        let mut status = RetryStatus::ZERO;
        for _ in 0..50 {
            let ceiling = exponential(ms(100), &status).min(ms(250));
            let delay = policy.delay_for(&status).unwrap();
            assert!(delay <= ceiling, "{:?} > {:?}", delay, ceiling);
            status = status.advance(ceiling);
        }
    }

    #[test]
    fn test_equal_jitter_bounds() {
        let policy = RetryPolicies::equal_jitter(ms(100), ms(1000));
        let status = RetryStatus::new(2, ms(300), ms(200));
        for _ in 0..50 {
            let delay = policy.delay_for(&status).unwrap();
            assert!(delay >= ms(200) && delay <= ms(400), "{:?}", delay);
        }
    }

    #[test]
    fn test_decorrelated_jitter_first_is_base() {
        let policy = RetryPolicies::decorrelated_jitter(ms(50), ms(1000));
        assert_eq!(policy.delay_for(&RetryStatus::ZERO), Some(ms(50)));
    }

    #[test]
    fn test_decorrelated_jitter_bounds() {
        let policy = RetryPolicies::decorrelated_jitter(ms(50), ms(400));
        let status = RetryStatus::new(3, ms(500), ms(200));
        for _ in 0..50 {
            let delay = policy.delay_for(&status).unwrap();
            assert!(delay >= ms(50) && delay <= ms(400), "{:?}", delay);
        }
    }

    #[test]
    fn test_random_between_empty_range() {
        assert_eq!(random_between(ms(5), ms(5)), ms(5));
        assert_eq!(random_between(ms(9), ms(5)), ms(9));
    }
}
