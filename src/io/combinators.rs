//! Instance combinators on [`IO`].
//!
//! Every combinator consumes `self` and returns a new recipe. User functions
//! are shared behind an `Arc` so the resulting effect stays re-invocable, and
//! a panic inside one of them fails the effect instead of unwinding.

use std::sync::Arc;
use std::time::Duration;

use futures::future::FutureExt;

use super::{catch_sync, IO};
use crate::debug::{self, EventBuilder};
use crate::error::Error;
use crate::executor::Executor;

impl<T: Send + 'static> IO<T> {
    /// Transform the success value.
    ///
    /// ```
    /// use eddy::IO;
    ///
    /// # tokio_test::block_on(async {
    /// let effect = IO::succeed(5).map(|x| x * 2);
    /// assert_eq!(effect.run().await.unwrap(), 10);
    /// # });
    /// ```
    pub fn map<U, F>(self, f: F) -> IO<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        IO::from_boxed(move || {
            let this = self.clone();
            let f = Arc::clone(&f);
            async move { this.run().await.map(|value| f(value)) }.boxed()
        })
    }

    /// Chain a dependent effect (flat map).
    ///
    /// ```
    /// use eddy::IO;
    ///
    /// # tokio_test::block_on(async {
    /// let effect = IO::succeed(5).then(|x| IO::succeed(x * 2));
    /// assert_eq!(effect.run().await.unwrap(), 10);
    ///
    /// // Error propagation
    /// let effect = IO::<i32>::fail("error").then(|x| IO::succeed(x * 2));
    /// assert_eq!(effect.run().await.unwrap_err().message(), "error");
    /// # });
    /// ```
    pub fn then<U, F>(self, f: F) -> IO<U>
    where
        U: Send + 'static,
        F: Fn(T) -> IO<U> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        IO::from_boxed(move || {
            let this = self.clone();
            let f = Arc::clone(&f);
            async move {
                let value = this.run().await?;
                f(value).run().await
            }
            .boxed()
        })
    }

    /// Continue with `on_success` or `on_failure` depending on the outcome.
    ///
    /// ```
    /// use eddy::IO;
    ///
    /// # tokio_test::block_on(async {
    /// let describe = |effect: IO<i32>| {
    ///     effect.then_either(
    ///         |v| IO::succeed(format!("got {}", v)),
    ///         |e| IO::succeed(format!("failed: {}", e)),
    ///     )
    /// };
    ///
    /// assert_eq!(describe(IO::succeed(1)).run().await.unwrap(), "got 1");
    /// assert_eq!(describe(IO::fail("nope")).run().await.unwrap(), "failed: nope");
    /// # });
    /// ```
    pub fn then_either<U, S, F>(self, on_success: S, on_failure: F) -> IO<U>
    where
        U: Send + 'static,
        S: Fn(T) -> IO<U> + Send + Sync + 'static,
        F: Fn(Error) -> IO<U> + Send + Sync + 'static,
    {
        let on_success = Arc::new(on_success);
        let on_failure = Arc::new(on_failure);
        IO::from_boxed(move || {
            let this = self.clone();
            let on_success = Arc::clone(&on_success);
            let on_failure = Arc::clone(&on_failure);
            async move {
                match this.run().await {
                    Ok(value) => on_success(value).run().await,
                    Err(error) => on_failure(error).run().await,
                }
            }
            .boxed()
        })
    }

    /// Replace a failure with a value computed from the error.
    pub fn recover<F>(self, f: F) -> IO<T>
    where
        F: Fn(Error) -> T + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        IO::from_boxed(move || {
            let this = self.clone();
            let f = Arc::clone(&f);
            async move { Ok(this.run().await.unwrap_or_else(|error| f(error))) }.boxed()
        })
    }

    /// Replace a failure with the outcome of another effect.
    ///
    /// ```
    /// use eddy::IO;
    ///
    /// # tokio_test::block_on(async {
    /// let effect = IO::<i32>::fail("error").recover_with(|_| IO::succeed(42));
    /// assert_eq!(effect.run().await.unwrap(), 42);
    /// # });
    /// ```
    pub fn recover_with<F>(self, f: F) -> IO<T>
    where
        F: Fn(Error) -> IO<T> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        IO::from_boxed(move || {
            let this = self.clone();
            let f = Arc::clone(&f);
            async move {
                match this.run().await {
                    Ok(value) => Ok(value),
                    Err(error) => f(error).run().await,
                }
            }
            .boxed()
        })
    }

    /// On failure, try an alternative effect.
    ///
    /// Unlike [`recover_with`](IO::recover_with), if the alternative fails too
    /// the *original* failure is returned.
    ///
    /// ```
    /// use eddy::IO;
    ///
    /// # tokio_test::block_on(async {
    /// let effect = IO::<i32>::fail("primary").fallback_to(|_| IO::fail("secondary"));
    /// assert_eq!(effect.run().await.unwrap_err().message(), "primary");
    /// # });
    /// ```
    pub fn fallback_to<F>(self, f: F) -> IO<T>
    where
        F: Fn(Error) -> IO<T> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        IO::from_boxed(move || {
            let this = self.clone();
            let f = Arc::clone(&f);
            async move {
                match this.run().await {
                    Ok(value) => Ok(value),
                    Err(error) => match f(error.clone()).run().await {
                        Ok(value) => Ok(value),
                        Err(alternative) => {
                            tracing::debug!(
                                error = %alternative,
                                "fallback failed, keeping the original failure"
                            );
                            Err(error)
                        }
                    },
                }
            }
            .boxed()
        })
    }

    /// Transform the failure.
    pub fn map_failure<F>(self, f: F) -> IO<T>
    where
        F: Fn(Error) -> Error + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        IO::from_boxed(move || {
            let this = self.clone();
            let f = Arc::clone(&f);
            async move { this.run().await.map_err(|error| f(error)) }.boxed()
        })
    }

    /// Observe the outcome without changing it.
    ///
    /// A panicking observer is logged and otherwise ignored.
    ///
    /// ```
    /// use eddy::IO;
    /// use std::sync::atomic::{AtomicI32, Ordering};
    /// use std::sync::Arc;
    ///
    /// # tokio_test::block_on(async {
    /// let seen = Arc::new(AtomicI32::new(0));
    /// let sink = seen.clone();
    /// let effect = IO::succeed(7).peek(
    ///     move |v| sink.store(*v, Ordering::SeqCst),
    ///     |_| {},
    /// );
    ///
    /// assert_eq!(effect.run().await.unwrap(), 7);
    /// assert_eq!(seen.load(Ordering::SeqCst), 7);
    /// # });
    /// ```
    pub fn peek<S, F>(self, on_success: S, on_failure: F) -> IO<T>
    where
        S: Fn(&T) + Send + Sync + 'static,
        F: Fn(&Error) + Send + Sync + 'static,
    {
        let on_success = Arc::new(on_success);
        let on_failure = Arc::new(on_failure);
        IO::from_boxed(move || {
            let this = self.clone();
            let on_success = Arc::clone(&on_success);
            let on_failure = Arc::clone(&on_failure);
            async move {
                let result = this.run().await;
                let observed = match &result {
                    Ok(value) => catch_sync(|| on_success(value)),
                    Err(error) => catch_sync(|| on_failure(error)),
                };
                if let Err(panic) = observed {
                    tracing::warn!(error = %panic, "peek observer panicked");
                }
                result
            }
            .boxed()
        })
    }

    /// Observe successful values only.
    pub fn peek_success<S>(self, on_success: S) -> IO<T>
    where
        S: Fn(&T) + Send + Sync + 'static,
    {
        self.peek(on_success, |_| {})
    }

    /// Observe failures only.
    pub fn peek_failure<F>(self, on_failure: F) -> IO<T>
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.peek(|_| {}, on_failure)
    }

    /// Fail with [`ErrorKind::Timeout`](crate::ErrorKind::Timeout) if the
    /// effect does not complete within `duration`.
    ///
    /// ```
    /// use eddy::{ErrorKind, IO};
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let slow = IO::from_future(|| async {
    ///     tokio::time::sleep(Duration::from_secs(10)).await;
    ///     Ok(42)
    /// });
    ///
    /// let error = slow.timeout(Duration::from_millis(10)).run().await.unwrap_err();
    /// assert_eq!(error.kind(), ErrorKind::Timeout);
    /// # });
    /// ```
    pub fn timeout(self, duration: Duration) -> IO<T> {
        IO::from_boxed(move || {
            let this = self.clone();
            async move {
                match tokio::time::timeout(duration, this.run()).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::timeout(duration)),
                }
            }
            .boxed()
        })
    }

    /// Dispatch the effect to `executor` without waiting for it.
    ///
    /// The returned effect completes with `()` as soon as the work is queued.
    /// Failures of the dispatched effect are logged.
    pub fn fire_and_forget(self, executor: &Executor) -> IO<()> {
        let executor = executor.clone();
        IO::from_boxed(move || {
            executor.spawn_detached(self.clone());
            futures::future::ready(Ok(())).boxed()
        })
    }

    /// Report every evaluation of this effect to the builder's sink.
    ///
    /// The result is returned unchanged.
    pub fn debug(self, builder: EventBuilder<T>) -> IO<T> {
        debug::instrument(self, builder)
    }
}
