//! Scoped task groups for parallel reductions.
//!
//! A [`TaskGroup`] spawns one task per effect and is consumed by one of its
//! join methods. Whatever the outcome, every task it spawned has finished or
//! been aborted before the join returns, and dropping a group aborts its
//! tasks, so no task outlives the reduction that created it.

use tokio::task::JoinSet;

use crate::error::{Error, Result};
use crate::io::IO;

/// A fail-fast group of concurrently running effects.
///
/// # Example
///
/// ```rust
/// use eddy::{TaskGroup, IO};
///
/// # tokio_test::block_on(async {
/// let mut group = TaskGroup::new();
/// group.spawn(IO::succeed(1));
/// group.spawn(IO::succeed(2));
///
/// // Results come back in spawn order, whatever order the tasks finish in.
/// assert_eq!(group.join_all().await.unwrap(), vec![1, 2]);
/// # });
/// ```
#[derive(Debug)]
pub struct TaskGroup<T> {
    tasks: JoinSet<(usize, Result<T>)>,
    spawned: usize,
}

impl<T: Send + 'static> Default for TaskGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> TaskGroup<T> {
    /// Create an empty group.
    pub fn new() -> Self {
        Self {
            tasks: JoinSet::new(),
            spawned: 0,
        }
    }

    /// Start evaluating `effect` on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn spawn(&mut self, effect: IO<T>) {
        let index = self.spawned;
        self.spawned += 1;
        self.tasks
            .spawn(async move { (index, effect.run().await) });
    }

    /// Number of tasks spawned into this group.
    pub fn len(&self) -> usize {
        self.spawned
    }

    /// True if nothing was spawned.
    pub fn is_empty(&self) -> bool {
        self.spawned == 0
    }

    /// Wait for every task and return their values in spawn order.
    ///
    /// The first failure aborts the remaining tasks, waits for them to wind
    /// down, and is returned as is. Errors caused by that abort are never
    /// reported in its place.
    pub async fn join_all(mut self) -> Result<Vec<T>> {
        let mut slots: Vec<Option<T>> = (0..self.spawned).map(|_| None).collect();

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((index, Ok(value))) => slots[index] = Some(value),
                Ok((_, Err(error))) => {
                    self.cancel_remaining().await;
                    return Err(error);
                }
                Err(join_error) => {
                    let error = Error::from_join_error(join_error);
                    self.cancel_remaining().await;
                    return Err(error);
                }
            }
        }

        slots
            .into_iter()
            .map(|slot| slot.ok_or_else(|| Error::cancelled("task ended without a result")))
            .collect()
    }

    /// Return the first value any task succeeds with, aborting the rest.
    ///
    /// If every task fails, the failure that completed first is returned.
    pub async fn first_success(mut self) -> Result<T> {
        let mut first_failure: Option<Error> = None;

        while let Some(joined) = self.tasks.join_next().await {
            let outcome = match joined {
                Ok((_, outcome)) => outcome,
                Err(join_error) => Err(Error::from_join_error(join_error)),
            };
            match outcome {
                Ok(value) => {
                    self.cancel_remaining().await;
                    return Ok(value);
                }
                Err(error) => {
                    first_failure.get_or_insert(error);
                }
            }
        }

        Err(first_failure
            .unwrap_or_else(|| Error::illegal_argument("no effects were spawned into the group")))
    }

    async fn cancel_remaining(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        tracing::debug!(
            remaining = self.tasks.len(),
            "aborting sibling tasks after the group settled"
        );
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn delayed<T: Clone + Send + Sync + 'static>(value: T, delay: Duration) -> IO<T> {
        IO::from_future(move || {
            let value = value.clone();
            async move {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
        })
    }

    fn delayed_failure<T: Send + 'static>(message: &'static str, delay: Duration) -> IO<T> {
        IO::from_future(move || async move {
            tokio::time::sleep(delay).await;
            Err(Error::msg(message))
        })
    }

    #[tokio::test]
    async fn test_join_all_preserves_spawn_order() {
        let mut group = TaskGroup::new();
        group.spawn(delayed(1, Duration::from_millis(30)));
        group.spawn(delayed(2, Duration::from_millis(1)));
        group.spawn(delayed(3, Duration::from_millis(15)));

        assert_eq!(group.join_all().await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_join_all_empty() {
        let group: TaskGroup<i32> = TaskGroup::new();
        assert!(group.is_empty());
        assert_eq!(group.join_all().await.unwrap(), Vec::<i32>::new());
    }

    #[tokio::test]
    async fn test_join_all_fails_fast_and_aborts_siblings() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mut group = TaskGroup::new();

        for _ in 0..3 {
            let finished = finished.clone();
            group.spawn(IO::from_future(move || {
                let finished = finished.clone();
                async move {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }));
        }
        group.spawn(delayed_failure("boom", Duration::from_millis(5)));

        let error = group.join_all().await.unwrap_err();
        assert_eq!(error.message(), "boom");
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_join_all_reports_panics() {
        let mut group = TaskGroup::new();
        group.spawn(IO::<i32>::lazy(|| panic!("kaboom")));
        let error = group.join_all().await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Panicked);
    }

    #[tokio::test]
    async fn test_first_success_skips_failures() {
        let mut group = TaskGroup::new();
        group.spawn(delayed_failure("fast failure", Duration::from_millis(1)));
        group.spawn(delayed("slow", Duration::from_millis(40)));
        group.spawn(delayed("fast", Duration::from_millis(10)));

        assert_eq!(group.first_success().await.unwrap(), "fast");
    }

    #[tokio::test]
    async fn test_first_success_all_fail_returns_first_completed() {
        let mut group: TaskGroup<()> = TaskGroup::new();
        group.spawn(delayed_failure("slow", Duration::from_millis(40)));
        group.spawn(delayed_failure("fast", Duration::from_millis(1)));

        assert_eq!(group.first_success().await.unwrap_err().message(), "fast");
    }
}
