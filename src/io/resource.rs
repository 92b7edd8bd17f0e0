//! Resource management: acquire, use, release.
//!
//! The release step runs exactly once after every successful acquire,
//! whatever happens while the resource is in use, including the running
//! effect being dropped by an abort or a timeout. When both the use and the
//! release fail, the use failure wins and the release failure is logged.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use tokio::runtime::Handle;

use super::{catch_sync, IO};
use crate::error::{Error, Result};

type Release<R> = Arc<dyn Fn(R) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Owns an acquired resource until it has been handed to its release step.
///
/// If the guard is dropped first (the running effect was aborted or timed
/// out), the release starts from `drop`: it finishes inline when it is
/// already complete after one poll, as a `Close` release is, and otherwise
/// continues on the current tokio runtime.
struct ReleaseGuard<R> {
    resource: Option<R>,
    release: Release<R>,
}

impl<R> ReleaseGuard<R> {
    fn new(resource: R, release: Release<R>) -> Self {
        Self {
            resource: Some(resource),
            release,
        }
    }

    async fn release(mut self) -> Result<()> {
        match self.resource.take() {
            Some(resource) => start_release(&self.release, resource).await,
            None => Ok(()),
        }
    }
}

impl<R> Drop for ReleaseGuard<R> {
    fn drop(&mut self) {
        let Some(resource) = self.resource.take() else {
            return;
        };
        let mut release = start_release(&self.release, resource);
        if let Some(released) = (&mut release).now_or_never() {
            report_interrupted(released);
            return;
        }
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { report_interrupted(release.await) });
            }
            Err(_) => tracing::warn!("resource release abandoned: no tokio runtime to finish it on"),
        }
    }
}

/// Call `release`, turning a panic while building or polling it into a
/// failure.
fn start_release<R>(release: &Release<R>, resource: R) -> BoxFuture<'static, Result<()>> {
    match catch_sync(|| release(resource)) {
        Ok(pending) => AssertUnwindSafe(pending)
            .catch_unwind()
            .map(|outcome| outcome.unwrap_or_else(|payload| Err(Error::panicked(payload))))
            .boxed(),
        Err(panic) => future::ready(Err(panic)).boxed(),
    }
}

fn report_interrupted(released: Result<()>) {
    match released {
        Ok(()) => tracing::debug!("released resource of an interrupted effect"),
        Err(error) => tracing::warn!(
            error = %error,
            "resource release failed after the effect was interrupted"
        ),
    }
}

/// A resource that can be released synchronously.
///
/// This is the contract [`IO::from_resource`] relies on: `close` is called
/// exactly once per successful acquire.
///
/// # Example
///
/// ```
/// use eddy::io::Close;
///
/// struct Connection {
///     id: u32,
/// }
///
/// impl Close for Connection {
///     fn close(self) -> eddy::Result<()> {
///         println!("closing connection {}", self.id);
///         Ok(())
///     }
/// }
/// ```
pub trait Close: Send + Sync + 'static {
    /// Release the resource.
    fn close(self) -> Result<()>;
}

impl<T: Send + 'static> IO<T> {
    /// Acquire a resource, use it, and always release it.
    ///
    /// - `acquire` failing means nothing was acquired: its error is returned
    ///   and neither `use_fn` nor `release` run.
    /// - `release` runs once after `use_fn`, whether it succeeded, failed or
    ///   panicked.
    /// - A release failure after a successful use becomes the result.
    /// - A release failure after a failed use is logged and the use failure
    ///   is returned.
    /// - If the running effect is dropped while the resource is in use (a
    ///   sibling failed in a parallel expression, a `timeout` fired), the
    ///   release still runs once. Its outcome is only logged.
    ///
    /// # Example
    ///
    /// ```
    /// use eddy::IO;
    /// use std::sync::atomic::{AtomicBool, Ordering};
    /// use std::sync::Arc;
    ///
    /// # tokio_test::block_on(async {
    /// let released = Arc::new(AtomicBool::new(false));
    /// let flag = released.clone();
    ///
    /// let effect = IO::bracket(
    ///     IO::succeed(String::from("handle")),
    ///     |handle: &String| IO::succeed(handle.len()),
    ///     move |_handle| {
    ///         let flag = flag.clone();
    ///         async move {
    ///             flag.store(true, Ordering::SeqCst);
    ///             Ok::<_, eddy::Error>(())
    ///         }
    ///     },
    /// );
    ///
    /// assert_eq!(effect.run().await.unwrap(), 6);
    /// assert!(released.load(Ordering::SeqCst));
    /// # });
    /// ```
    pub fn bracket<R, U, Rel, RelFut>(acquire: IO<R>, use_fn: U, release: Rel) -> IO<T>
    where
        R: Send + Sync + 'static,
        U: Fn(&R) -> IO<T> + Send + Sync + 'static,
        Rel: Fn(R) -> RelFut + Send + Sync + 'static,
        RelFut: Future<Output = Result<()>> + Send + 'static,
    {
        let use_fn = Arc::new(use_fn);
        let release: Release<R> = Arc::new(move |resource| release(resource).boxed());
        IO::from_boxed(move || {
            let acquire = acquire.clone();
            let use_fn = Arc::clone(&use_fn);
            let release = Arc::clone(&release);
            async move {
                let resource = acquire.run().await?;
                let effect = catch_sync(|| use_fn(&resource));
                let guard = ReleaseGuard::new(resource, release);

                let used = match effect {
                    Ok(effect) => effect.run().await,
                    Err(panic) => Err(panic),
                };

                let released = guard.release().await;
                combine(used, released)
            }
            .boxed()
        })
    }

    /// Acquire a [`Close`] resource, use it, and always close it.
    ///
    /// ```
    /// use eddy::io::Close;
    /// use eddy::IO;
    ///
    /// struct Lease(u32);
    ///
    /// impl Close for Lease {
    ///     fn close(self) -> eddy::Result<()> {
    ///         Ok(())
    ///     }
    /// }
    ///
    /// # tokio_test::block_on(async {
    /// let effect = IO::from_resource(IO::lazy(|| Ok(Lease(7))), |lease| IO::succeed(lease.0 * 6));
    /// assert_eq!(effect.run().await.unwrap(), 42);
    /// # });
    /// ```
    pub fn from_resource<R, U>(acquire: IO<R>, use_fn: U) -> IO<T>
    where
        R: Close,
        U: Fn(&R) -> IO<T> + Send + Sync + 'static,
    {
        IO::bracket(acquire, use_fn, |resource: R| {
            futures::future::ready(resource.close())
        })
    }
}

fn combine<T>(used: Result<T>, released: Result<()>) -> Result<T> {
    match (used, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(release_error)) => Err(release_error),
        (Err(use_error), Ok(())) => Err(use_error),
        (Err(use_error), Err(release_error)) => {
            tracing::warn!(
                error = %release_error,
                cause = %use_error,
                "resource release failed after use had already failed"
            );
            Err(use_error)
        }
    }
}

#[cfg(test)]
mod resource_tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::exp::{Exp, ListExp};
    use crate::testing::{fail_after, succeed_after};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Tracked {
        closes: Arc<AtomicUsize>,
        fail_close: bool,
    }

    impl Close for Tracked {
        fn close(self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                Err(Error::msg("close failed"))
            } else {
                Ok(())
            }
        }
    }

    fn acquire(closes: &Arc<AtomicUsize>, fail_close: bool) -> IO<Tracked> {
        let closes = closes.clone();
        IO::lazy(move || {
            Ok(Tracked {
                closes: closes.clone(),
                fail_close,
            })
        })
    }

    #[tokio::test]
    async fn test_use_panic_still_closes() {
        let closes = Arc::new(AtomicUsize::new(0));
        let effect: IO<i32> = IO::from_resource(acquire(&closes, false), |_| panic!("in use"));

        let error = effect.run().await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Panicked);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_acquire_skips_release() {
        let closes = Arc::new(AtomicUsize::new(0));
        let effect: IO<i32> = IO::from_resource(IO::<Tracked>::fail("no resource"), |_| {
            IO::succeed(1)
        });

        assert_eq!(effect.run().await.unwrap_err().message(), "no resource");
        assert_eq!(closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_release_panic_is_a_failure() {
        let effect = IO::bracket(
            IO::succeed(1),
            |r: &i32| IO::succeed(*r),
            |_: i32| -> futures::future::Ready<Result<()>> { panic!("release exploded") },
        );

        let error = effect.run().await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Panicked);
    }

    #[tokio::test]
    async fn test_aborted_by_failing_sibling_still_closes() {
        let closes = Arc::new(AtomicUsize::new(0));
        let lease: IO<i32> = IO::from_resource(acquire(&closes, false), |_| {
            succeed_after(Duration::from_secs(5), 1)
        });
        let exp = ListExp::par([lease, fail_after(Duration::from_millis(50), "sibling failed")]);

        let error = exp.into_io().run().await.unwrap_err();
        assert_eq!(error.message(), "sibling failed");
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_mid_use_still_closes() {
        let closes = Arc::new(AtomicUsize::new(0));
        let effect: IO<i32> = IO::from_resource(acquire(&closes, false), |_| {
            succeed_after(Duration::from_secs(5), 1)
        })
        .timeout(Duration::from_millis(20));

        assert_eq!(effect.run().await.unwrap_err().kind(), ErrorKind::Timeout);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_async_release_finishes_after_timeout() {
        let released = Arc::new(AtomicUsize::new(0));
        let effect = {
            let released = released.clone();
            IO::bracket(
                IO::succeed(7),
                |_: &i32| succeed_after(Duration::from_secs(5), ()),
                move |_: i32| {
                    let released = released.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        released.fetch_add(1, Ordering::SeqCst);
                        Ok::<(), Error>(())
                    }
                },
            )
        }
        .timeout(Duration::from_millis(20));

        assert_eq!(effect.run().await.unwrap_err().kind(), ErrorKind::Timeout);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_completed_use_releases_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let effect = IO::from_resource(acquire(&closes, false), |_| IO::succeed(3));

        assert_eq!(effect.run().await.unwrap(), 3);
        assert_eq!(effect.run().await.unwrap(), 3);
        assert_eq!(closes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_combine_prefers_use_failure() {
        let use_error = Error::msg("use");
        let combined = combine::<()>(Err(use_error.clone()), Err(Error::msg("release")));
        assert!(Error::ptr_eq(&combined.unwrap_err(), &use_error));
    }
}
