//! Retry bookkeeping threaded through policy evaluations.

use std::fmt;
use std::time::Duration;

/// Where a retry sequence currently stands.
///
/// A status is never updated in place. Each granted retry produces the next
/// status with [`RetryStatus::advance`].
///
/// # Examples
///
/// ```rust
/// use eddy::retry::RetryStatus;
/// use std::time::Duration;
///
/// let first = RetryStatus::ZERO;
/// let second = first.advance(Duration::from_millis(10));
///
/// assert_eq!(second.attempt_count, 1);
/// assert_eq!(second.cumulative_delay, Duration::from_millis(10));
/// assert_eq!(second.previous_delay, Duration::from_millis(10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryStatus {
    /// Retries granted so far (0-based).
    pub attempt_count: u32,
    /// Sum of every delay granted so far.
    pub cumulative_delay: Duration,
    /// The delay granted by the last retry, zero before the first one.
    pub previous_delay: Duration,
}

impl RetryStatus {
    /// Status before any retry has happened.
    pub const ZERO: RetryStatus = RetryStatus {
        attempt_count: 0,
        cumulative_delay: Duration::ZERO,
        previous_delay: Duration::ZERO,
    };

    /// Create a status from its parts.
    pub fn new(attempt_count: u32, cumulative_delay: Duration, previous_delay: Duration) -> Self {
        Self {
            attempt_count,
            cumulative_delay,
            previous_delay,
        }
    }

    /// The status after one more retry that waited `delay`.
    #[must_use]
    pub fn advance(&self, delay: Duration) -> Self {
        Self {
            attempt_count: self.attempt_count.saturating_add(1),
            cumulative_delay: self.cumulative_delay.saturating_add(delay),
            previous_delay: delay,
        }
    }

    /// True when no retry has been granted yet.
    pub fn is_first(&self) -> bool {
        self.attempt_count == 0
    }
}

impl fmt::Display for RetryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempt {} (cumulative delay {:?}, previous delay {:?})",
            self.attempt_count, self.cumulative_delay, self.previous_delay
        )
    }
}

#[cfg(test)]
mod status_tests {
    use super::*;

    #[test]
    fn test_zero_is_default() {
        assert_eq!(RetryStatus::ZERO, RetryStatus::default());
        assert!(RetryStatus::ZERO.is_first());
    }

    #[test]
    fn test_advance_accumulates() {
        let status = RetryStatus::ZERO
            .advance(Duration::from_millis(10))
            .advance(Duration::from_millis(20));

        assert_eq!(
            status,
            RetryStatus::new(2, Duration::from_millis(30), Duration::from_millis(20))
        );
        assert!(!status.is_first());
    }

    #[test]
    fn test_advance_saturates() {
        let status = RetryStatus::new(u32::MAX, Duration::MAX, Duration::ZERO)
            .advance(Duration::from_secs(1));
        assert_eq!(status.attempt_count, u32::MAX);
        assert_eq!(status.cumulative_delay, Duration::MAX);
    }

    #[test]
    fn test_display() {
        let display = RetryStatus::ZERO.to_string();
        assert!(display.contains("attempt 0"));
    }
}
