//! Retry policies as composable functions.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::status::RetryStatus;

type PolicyFn = dyn Fn(&RetryStatus) -> Option<Duration> + Send + Sync;

/// A function from the current [`RetryStatus`] to the delay before the next
/// attempt.
///
/// `None` stops retrying and lets the last failure propagate.
/// `Some(Duration::ZERO)` retries immediately, anything longer retries after
/// sleeping that long.
///
/// Policies are plain values. Every combinator returns a new policy and
/// leaves the original untouched, so a policy can be shared freely between
/// effects and threads.
///
/// # Examples
///
/// ```rust
/// use eddy::retry::{RetryPolicies, RetryStatus};
/// use std::time::Duration;
///
/// let policy = RetryPolicies::exponential_backoff_delay(Duration::from_millis(100))
///     .cap_delay(Duration::from_millis(300))
///     .append(RetryPolicies::limit_retries(4));
///
/// let delays: Vec<Duration> = policy
///     .simulate(10)
///     .windows(2)
///     .map(|w| w[1].previous_delay)
///     .collect();
///
/// assert_eq!(
///     delays,
///     vec![
///         Duration::from_millis(100),
///         Duration::from_millis(200),
///         Duration::from_millis(300),
///     ]
/// );
/// ```
#[derive(Clone)]
pub struct RetryPolicy {
    f: Arc<PolicyFn>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("f", &"<function>")
            .finish()
    }
}

impl RetryPolicy {
    /// Build a policy from a function.
    ///
    /// ```rust
    /// use eddy::retry::{RetryPolicy, RetryStatus};
    /// use std::time::Duration;
    ///
    /// // Retry twice, waiting 5ms each time.
    /// let policy = RetryPolicy::new(|status: &RetryStatus| {
    ///     (status.attempt_count < 2).then_some(Duration::from_millis(5))
    /// });
    ///
    /// assert_eq!(policy.simulate(10).len(), 2);
    /// ```
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&RetryStatus) -> Option<Duration> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Ask the policy for the delay before the next attempt.
    pub fn delay_for(&self, status: &RetryStatus) -> Option<Duration> {
        (self.f)(status)
    }

    /// Combine two policies: retry only while both want to, waiting the longer
    /// of the two delays.
    #[must_use]
    pub fn append(self, other: RetryPolicy) -> RetryPolicy {
        RetryPolicy::new(move |status| {
            let mine = self.delay_for(status)?;
            let theirs = other.delay_for(status)?;
            Some(mine.max(theirs))
        })
    }

    /// Use this policy while it yields a delay, then fall back to `other`.
    ///
    /// ```rust
    /// use eddy::retry::RetryPolicies;
    /// use std::time::Duration;
    ///
    /// // Three quick retries, then one per second (capped at 5 in total).
    /// let policy = RetryPolicies::limit_retries(3)
    ///     .followed_by(RetryPolicies::constant_delay(Duration::from_secs(1)))
    ///     .append(RetryPolicies::limit_retries(5));
    ///
    /// let delays: Vec<Duration> = policy
    ///     .simulate(10)
    ///     .iter()
    ///     .map(|s| policy.delay_for(s).unwrap())
    ///     .collect();
    /// assert_eq!(delays[..3], [Duration::ZERO; 3]);
    /// assert_eq!(delays[3..], [Duration::from_secs(1); 2]);
    /// ```
    #[must_use]
    pub fn followed_by(self, other: RetryPolicy) -> RetryPolicy {
        RetryPolicy::new(move |status| {
            self.delay_for(status)
                .or_else(|| other.delay_for(status))
        })
    }

    /// Never wait longer than `max`.
    #[must_use]
    pub fn cap_delay(self, max: Duration) -> RetryPolicy {
        RetryPolicy::new(move |status| self.delay_for(status).map(|d| d.min(max)))
    }

    /// Stop retrying once the delay this policy asks for reaches `max`.
    #[must_use]
    pub fn limit_retries_by_delay(self, max: Duration) -> RetryPolicy {
        RetryPolicy::new(move |status| self.delay_for(status).filter(|d| *d < max))
    }

    /// Stop retrying once the delays already waited exceed `max`.
    ///
    /// The check uses the cumulative delay before this attempt's delay is
    /// added.
    #[must_use]
    pub fn limit_retries_by_cumulative_delay(self, max: Duration) -> RetryPolicy {
        RetryPolicy::new(move |status| {
            if status.cumulative_delay > max {
                None
            } else {
                self.delay_for(status)
            }
        })
    }

    /// Dry-run the policy without sleeping.
    ///
    /// Starting at [`RetryStatus::ZERO`], asks the policy for a delay up to
    /// `iterations` times. Every status the policy grants a retry for is
    /// recorded, then advanced by the granted delay. Stops early as soon as
    /// the policy returns `None`.
    ///
    /// ```rust
    /// use eddy::retry::{RetryPolicies, RetryStatus};
    /// use std::time::Duration;
    ///
    /// let statuses = RetryPolicies::incremental_delay(Duration::from_millis(10))
    ///     .limit_retries_by_cumulative_delay(Duration::from_millis(120))
    ///     .simulate(20);
    ///
    /// assert_eq!(statuses.len(), 5);
    /// assert_eq!(
    ///     statuses.last(),
    ///     Some(&RetryStatus::new(
    ///         4,
    ///         Duration::from_millis(100),
    ///         Duration::from_millis(40)
    ///     ))
    /// );
    /// ```
    pub fn simulate(&self, iterations: usize) -> Vec<RetryStatus> {
        let mut statuses = Vec::new();
        let mut status = RetryStatus::ZERO;
        for _ in 0..iterations {
            let Some(delay) = self.delay_for(&status) else {
                break;
            };
            statuses.push(status);
            status = status.advance(delay);
        }
        statuses
    }
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn fixed(delay: Option<Duration>) -> RetryPolicy {
        RetryPolicy::new(move |_| delay)
    }

    #[test]
    fn test_append_takes_max_delay() {
        let policy = fixed(Some(ms(10))).append(fixed(Some(ms(30))));
        assert_eq!(policy.delay_for(&RetryStatus::ZERO), Some(ms(30)));
    }

    #[test]
    fn test_append_stops_when_either_stops() {
        let left = fixed(None).append(fixed(Some(ms(30))));
        let right = fixed(Some(ms(10))).append(fixed(None));
        assert_eq!(left.delay_for(&RetryStatus::ZERO), None);
        assert_eq!(right.delay_for(&RetryStatus::ZERO), None);
    }

    #[test]
    fn test_followed_by_falls_through() {
        let policy = fixed(None).followed_by(fixed(Some(ms(7))));
        assert_eq!(policy.delay_for(&RetryStatus::ZERO), Some(ms(7)));

        let policy = fixed(Some(ms(1))).followed_by(fixed(Some(ms(7))));
        assert_eq!(policy.delay_for(&RetryStatus::ZERO), Some(ms(1)));
    }

    #[test]
    fn test_cap_delay() {
        let policy = fixed(Some(ms(500))).cap_delay(ms(100));
        assert_eq!(policy.delay_for(&RetryStatus::ZERO), Some(ms(100)));

        let policy = fixed(Some(ms(50))).cap_delay(ms(100));
        assert_eq!(policy.delay_for(&RetryStatus::ZERO), Some(ms(50)));

        assert_eq!(fixed(None).cap_delay(ms(100)).delay_for(&RetryStatus::ZERO), None);
    }

    #[test]
    fn test_limit_retries_by_delay() {
        let policy = RetryPolicy::new(|s| Some(ms(10 * u64::from(s.attempt_count + 1))))
            .limit_retries_by_delay(ms(30));

        assert_eq!(policy.simulate(10).len(), 2);
        assert_eq!(policy.delay_for(&RetryStatus::new(2, ms(30), ms(20))), None);
    }

    #[test]
    fn test_limit_by_cumulative_delay_checks_before_applying() {
        let policy = fixed(Some(ms(50))).limit_retries_by_cumulative_delay(ms(100));

        assert_eq!(policy.delay_for(&RetryStatus::new(2, ms(100), ms(50))), Some(ms(50)));
        assert_eq!(policy.delay_for(&RetryStatus::new(3, ms(150), ms(50))), None);
    }

    #[test]
    fn test_simulate_respects_iteration_count() {
        let statuses = fixed(Some(ms(1))).simulate(3);
        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses[0], RetryStatus::ZERO);
        assert_eq!(statuses[2], RetryStatus::new(2, ms(2), ms(1)));
    }

    #[test]
    fn test_simulate_zero_iterations() {
        assert!(fixed(Some(ms(1))).simulate(0).is_empty());
    }

    #[test]
    fn test_simulate_is_deterministic() {
        let policy = RetryPolicy::new(|s| (s.attempt_count < 4).then(|| ms(3)));
        assert_eq!(policy.simulate(10), policy.simulate(10));
        assert_eq!(policy.simulate(10).len(), 4);
    }

    #[test]
    fn test_combinators_leave_original_untouched() {
        let base = fixed(Some(ms(500)));
        let capped = base.clone().cap_delay(ms(1));
        assert_eq!(base.delay_for(&RetryStatus::ZERO), Some(ms(500)));
        assert_eq!(capped.delay_for(&RetryStatus::ZERO), Some(ms(1)));
    }

    #[test]
    fn test_policy_is_debug() {
        let debug = format!("{:?}", fixed(None));
        assert!(debug.contains("RetryPolicy"));
    }
}
