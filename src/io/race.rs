//! First-success racing.

use futures::future::FutureExt;

use super::IO;
use crate::scope::TaskGroup;

impl<T: Send + 'static> IO<T> {
    /// Run every effect concurrently and return the first one to *succeed*.
    ///
    /// Failures do not end the race: a fast failure loses to a slower
    /// success. Once a winner is known, the remaining effects are aborted.
    /// If every effect fails, the failure that completed first is returned.
    ///
    /// # Panics
    ///
    /// Panics if `effects` is empty.
    ///
    /// # Example
    ///
    /// ```
    /// use eddy::IO;
    /// use std::time::Duration;
    ///
    /// fn after(ms: u64, value: &'static str) -> IO<&'static str> {
    ///     IO::from_future(move || async move {
    ///         tokio::time::sleep(Duration::from_millis(ms)).await;
    ///         Ok(value)
    ///     })
    /// }
    ///
    /// # tokio_test::block_on(async {
    /// let winner = IO::race([
    ///     after(200, "slow"),
    ///     IO::fail("broken"),
    ///     after(10, "fast"),
    /// ]);
    ///
    /// assert_eq!(winner.run().await.unwrap(), "fast");
    /// # });
    /// ```
    pub fn race(effects: impl IntoIterator<Item = IO<T>>) -> IO<T> {
        let effects: Vec<IO<T>> = effects.into_iter().collect();
        assert!(!effects.is_empty(), "race requires at least one effect");

        IO::from_boxed(move || {
            let effects = effects.clone();
            async move {
                let mut group = TaskGroup::new();
                for effect in effects {
                    group.spawn(effect);
                }
                group.first_success().await
            }
            .boxed()
        })
    }
}
