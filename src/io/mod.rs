//! Deferred, re-invocable effects.
//!
//! An [`IO<T>`] is a recipe for a computation that, each time it is run,
//! produces one [`Result<T>`]. Building an `IO` never runs anything, and
//! running it twice runs the computation twice: nothing is memoized.
//!
//! # Core Concepts
//!
//! - **Leaves** wrap user code: [`IO::succeed`], [`IO::fail`], [`IO::lazy`],
//!   [`IO::from_future`], [`IO::from_blocking_task`], [`IO::from_resource`].
//! - **Combinators** build new recipes from old ones: `map`, `then`,
//!   `recover`, `retry`, `debug` and friends. They take `self` and return a
//!   new `IO`; the original can be cloned beforehand and reused.
//! - **Expressions** (see [`crate::exp`]) are recipes with several children
//!   and a reduction algorithm.
//!
//! Nothing inside an effect escapes its boundary: a returned error, a panic in
//! user code or an aborted task all surface as `Err` from [`IO::run`].
//!
//! # Examples
//!
//! ```
//! use eddy::IO;
//!
//! # tokio_test::block_on(async {
//! let effect = IO::succeed(5)
//!     .map(|x| x * 2)
//!     .then(|x| IO::succeed(x + 10));
//!
//! assert_eq!(effect.run().await.unwrap(), 20);
//! # });
//! ```
//!
//! ## Async leaves
//!
//! ```
//! use eddy::IO;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let effect = IO::from_future(|| async {
//!     tokio::time::sleep(Duration::from_millis(1)).await;
//!     Ok(42)
//! });
//!
//! assert_eq!(effect.run().await.unwrap(), 42);
//! # });
//! ```

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};

use crate::error::{Error, Result};
use crate::exp::Exp;

mod combinators;
mod race;
mod resource;
mod retry;

pub use resource::Close;


/// Function type for IO internals
type RunFn<T> = dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync;

/// A deferred computation producing a `Result<T>` every time it is run.
///
/// `IO` is cheap to clone: clones share the same recipe.
///
/// # Examples
///
/// ```
/// use eddy::{ErrorKind, IO};
///
/// # tokio_test::block_on(async {
/// let ok = IO::succeed("value");
/// assert_eq!(ok.run().await.unwrap(), "value");
///
/// let failed = IO::<i32>::fail("boom");
/// assert_eq!(failed.run().await.unwrap_err().kind(), ErrorKind::Failed);
/// # });
/// ```
pub struct IO<T> {
    run_fn: Arc<RunFn<T>>,
}

impl<T> Clone for IO<T> {
    fn clone(&self) -> Self {
        IO {
            run_fn: Arc::clone(&self.run_fn),
        }
    }
}

// Manual Debug implementation since Fn is not Debug
impl<T> fmt::Debug for IO<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IO")
            .field("run_fn", &"<function>")
            .finish()
    }
}

impl<T: Send + 'static> IO<T> {
    pub(crate) fn from_boxed<F>(f: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<T>> + Send + Sync + 'static,
    {
        IO { run_fn: Arc::new(f) }
    }

    /// An effect that always succeeds with a clone of `value`.
    pub fn succeed(value: T) -> Self
    where
        T: Clone + Sync,
    {
        IO::from_boxed(move || future::ready(Ok(value.clone())).boxed())
    }

    /// An effect that always fails with `error`.
    ///
    /// Every run hands back the same error, so [`Error::ptr_eq`] holds between
    /// the failures of two runs.
    pub fn fail(error: impl Into<Error>) -> Self {
        let error = error.into();
        IO::from_boxed(move || future::ready(Err(error.clone())).boxed())
    }

    /// Lift an already computed result.
    pub fn from_result(result: Result<T>) -> Self
    where
        T: Clone + Sync,
    {
        match result {
            Ok(value) => IO::succeed(value),
            Err(error) => IO::fail(error),
        }
    }

    /// Defer a synchronous computation. It runs on every evaluation, on the
    /// task that evaluates the effect.
    ///
    /// ```
    /// use eddy::IO;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// # tokio_test::block_on(async {
    /// let calls = Arc::new(AtomicUsize::new(0));
    /// let counter = calls.clone();
    /// let effect = IO::lazy(move || Ok(counter.fetch_add(1, Ordering::SeqCst)));
    ///
    /// assert_eq!(calls.load(Ordering::SeqCst), 0);
    /// effect.run().await.unwrap();
    /// effect.run().await.unwrap();
    /// assert_eq!(calls.load(Ordering::SeqCst), 2);
    /// # });
    /// ```
    pub fn lazy<F>(f: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        IO::from_boxed(move || future::ready(f()).boxed())
    }

    /// Defer an asynchronous computation. `factory` is called once per run to
    /// create a fresh future.
    pub fn from_future<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        IO::from_boxed(move || factory().boxed())
    }

    /// Defer a blocking computation to tokio's blocking thread pool.
    ///
    /// Use this for code that blocks on I/O or burns CPU, so it does not stall
    /// the async workers.
    pub fn from_blocking_task<F>(f: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        IO::from_future(move || {
            let f = Arc::clone(&f);
            async move {
                match tokio::task::spawn_blocking(move || f()).await {
                    Ok(result) => result,
                    Err(join_error) => Err(Error::from_join_error(join_error)),
                }
            }
        })
    }

    /// Turn an expression into an effect.
    pub fn from_exp<E>(exp: E) -> Self
    where
        E: Exp<Output = T>,
    {
        exp.into_io()
    }

    /// Evaluate the effect.
    ///
    /// Panics raised while building or polling the computation are caught and
    /// returned as [`ErrorKind::Panicked`](crate::ErrorKind::Panicked).
    pub async fn run(&self) -> Result<T> {
        let future = match std::panic::catch_unwind(AssertUnwindSafe(|| (self.run_fn)())) {
            Ok(future) => future,
            Err(payload) => return Err(Error::panicked(payload)),
        };
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(Error::panicked(payload)),
        }
    }

    /// An owned future evaluating this effect once.
    pub(crate) fn into_future(self) -> BoxFuture<'static, Result<T>> {
        async move { self.run().await }.boxed()
    }
}

impl IO<()> {
    /// An effect that succeeds with `()`.
    pub fn unit() -> Self {
        IO::succeed(())
    }
}

/// Run a synchronous observer or renderer, turning a panic into an error.
pub(crate) fn catch_sync<R>(f: impl FnOnce() -> R) -> Result<R> {
    std::panic::catch_unwind(AssertUnwindSafe(f)).map_err(Error::panicked)
}
