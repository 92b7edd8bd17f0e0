//! Retry and repeat driven by a [`RetryPolicy`].

use std::sync::Arc;

use futures::future::FutureExt;

use super::IO;
use crate::error::Error;
use crate::retry::{RetryPolicy, RetryStatus};

impl<T: Send + 'static> IO<T> {
    /// Re-run the effect on every failure for as long as `policy` grants a
    /// delay.
    ///
    /// A zero delay retries straight away on the current task. A positive
    /// delay sleeps first, and the retry may resume on any worker thread.
    /// When the policy gives up, the last failure is returned unchanged.
    ///
    /// ```
    /// use eddy::retry::RetryPolicies;
    /// use eddy::IO;
    /// use std::sync::atomic::{AtomicU32, Ordering};
    /// use std::sync::Arc;
    ///
    /// # tokio_test::block_on(async {
    /// let calls = Arc::new(AtomicU32::new(0));
    /// let counter = calls.clone();
    /// let flaky = IO::lazy(move || {
    ///     if counter.fetch_add(1, Ordering::SeqCst) < 2 {
    ///         Err("not yet".into())
    ///     } else {
    ///         Ok("done")
    ///     }
    /// });
    ///
    /// let effect = flaky.retry(RetryPolicies::limit_retries(5));
    /// assert_eq!(effect.run().await.unwrap(), "done");
    /// assert_eq!(calls.load(Ordering::SeqCst), 3);
    /// # });
    /// ```
    pub fn retry(self, policy: RetryPolicy) -> IO<T> {
        self.retry_if(|_| true, policy)
    }

    /// Like [`retry`](IO::retry), but only failures matching `predicate` are
    /// retried. Any other failure is returned at once.
    ///
    /// See [`crate::causes`] for ready-made predicates.
    pub fn retry_if<P>(self, predicate: P, policy: RetryPolicy) -> IO<T>
    where
        P: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        IO::from_boxed(move || {
            let this = self.clone();
            let predicate = Arc::clone(&predicate);
            let policy = policy.clone();
            async move {
                let mut status = RetryStatus::ZERO;
                loop {
                    let error = match this.run().await {
                        Ok(value) => return Ok(value),
                        Err(error) => error,
                    };
                    if !predicate(&error) {
                        return Err(error);
                    }
                    let Some(delay) = policy.delay_for(&status) else {
                        tracing::debug!(
                            attempts = status.attempt_count.saturating_add(1),
                            error = %error,
                            "retry policy exhausted"
                        );
                        return Err(error);
                    };
                    tracing::debug!(
                        attempt = status.attempt_count.saturating_add(1),
                        delay = ?delay,
                        error = %error,
                        "retrying failed effect"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    status = status.advance(delay);
                }
            }
            .boxed()
        })
    }

    /// Re-run the effect while its successful value satisfies `predicate` and
    /// `policy` grants a delay. Returns the last value produced.
    ///
    /// A failure stops repeating and is returned as is.
    ///
    /// ```
    /// use eddy::retry::RetryPolicies;
    /// use eddy::IO;
    /// use std::sync::atomic::{AtomicU32, Ordering};
    /// use std::sync::Arc;
    ///
    /// # tokio_test::block_on(async {
    /// let counter = Arc::new(AtomicU32::new(0));
    /// let next = counter.clone();
    /// let poll = IO::lazy(move || Ok(next.fetch_add(1, Ordering::SeqCst)));
    ///
    /// // Keep polling while the value is below 3.
    /// let effect = poll.repeat(|v| *v < 3, RetryPolicies::limit_retries(10));
    /// assert_eq!(effect.run().await.unwrap(), 3);
    /// # });
    /// ```
    pub fn repeat<P>(self, predicate: P, policy: RetryPolicy) -> IO<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        IO::from_boxed(move || {
            let this = self.clone();
            let predicate = Arc::clone(&predicate);
            let policy = policy.clone();
            async move {
                let mut status = RetryStatus::ZERO;
                loop {
                    let value = this.run().await?;
                    if !predicate(&value) {
                        return Ok(value);
                    }
                    let Some(delay) = policy.delay_for(&status) else {
                        return Ok(value);
                    };
                    tracing::debug!(
                        attempt = status.attempt_count.saturating_add(1),
                        delay = ?delay,
                        "repeating effect"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    status = status.advance(delay);
                }
            }
            .boxed()
        })
    }
}
