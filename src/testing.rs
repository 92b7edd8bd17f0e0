//! Testing utilities for code built on effects and expressions.
//!
//! This module provides assertion macros over [`Result`](crate::Result) and a
//! few effect builders that make short-circuiting, retries and cancellation
//! observable in tests.
//!
//! # Examples
//!
//! ## Assertion Macros
//!
//! ```rust
//! use eddy::{assert_failure, assert_failure_kind, assert_success, Error, ErrorKind};
//!
//! let ok: eddy::Result<i32> = Ok(42);
//! assert_success!(ok);
//!
//! let failed: eddy::Result<i32> = Err(Error::no_match("nothing matched"));
//! assert_failure!(failed.clone());
//! assert_failure_kind!(failed, ErrorKind::NoMatch);
//! ```
//!
//! ## Counting evaluations
//!
//! ```rust
//! use eddy::exp::{AnyExp, Exp};
//! use eddy::testing::CallCounter;
//! use eddy::IO;
//!
//! # tokio_test::block_on(async {
//! let counter = CallCounter::new();
//! let exp = AnyExp::seq([
//!     counter.count(IO::succeed(true)),
//!     counter.count(IO::succeed(true)),
//! ]);
//!
//! assert!(exp.into_io().run().await.unwrap());
//! assert_eq!(counter.get(), 1);
//! # });
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::io::IO;

/// Counts how many times the effects it wraps are evaluated.
///
/// Clones share the same count.
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    calls: Arc<AtomicUsize>,
}

impl CallCounter {
    /// A counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluations counted so far.
    pub fn get(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wrap `effect` so that each evaluation bumps the counter before it
    /// starts.
    pub fn count<T: Send + 'static>(&self, effect: IO<T>) -> IO<T> {
        let calls = Arc::clone(&self.calls);
        IO::from_future(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let effect = effect.clone();
            async move { effect.run().await }
        })
    }

    /// Wrap `effect` so that the counter is bumped only when an evaluation
    /// runs to completion.
    pub fn count_completions<T: Send + 'static>(&self, effect: IO<T>) -> IO<T> {
        let calls = Arc::clone(&self.calls);
        IO::from_future(move || {
            let calls = Arc::clone(&calls);
            let effect = effect.clone();
            async move {
                let result = effect.run().await;
                calls.fetch_add(1, Ordering::SeqCst);
                result
            }
        })
    }
}

/// An effect that succeeds with `value` after sleeping for `delay`.
pub fn succeed_after<T>(delay: Duration, value: T) -> IO<T>
where
    T: Clone + Send + Sync + 'static,
{
    IO::from_future(move || {
        let value = value.clone();
        async move {
            tokio::time::sleep(delay).await;
            Ok(value)
        }
    })
}

/// An effect that fails with `message` after sleeping for `delay`.
pub fn fail_after<T: Send + 'static>(delay: Duration, message: &'static str) -> IO<T> {
    IO::from_future(move || async move {
        tokio::time::sleep(delay).await;
        Err(Error::msg(message))
    })
}

/// An effect that fails its first `failures` evaluations, then succeeds with
/// `value` from then on.
///
/// ```rust
/// use eddy::retry::RetryPolicies;
/// use eddy::testing::flaky;
///
/// # tokio_test::block_on(async {
/// let effect = flaky(2, "finally").retry(RetryPolicies::limit_retries(2));
/// assert_eq!(effect.run().await.unwrap(), "finally");
/// # });
/// ```
pub fn flaky<T>(failures: usize, value: T) -> IO<T>
where
    T: Clone + Send + Sync + 'static,
{
    let calls = AtomicUsize::new(0);
    IO::lazy(move || {
        let call = calls.fetch_add(1, Ordering::SeqCst);
        if call < failures {
            Err(Error::msg(format!("flaky failure {}", call + 1)))
        } else {
            Ok(value.clone())
        }
    })
}

/// Assert that a result is a success.
///
/// # Example
///
/// ```rust
/// use eddy::assert_success;
///
/// let result: eddy::Result<i32> = Ok(42);
/// assert_success!(result);
/// ```
#[macro_export]
macro_rules! assert_success {
    ($result:expr) => {
        match $result {
            ::std::result::Result::Ok(_) => {}
            ::std::result::Result::Err(e) => {
                panic!("Expected Success, got Failure: {:?}", e);
            }
        }
    };
}

/// Assert that a result is a failure.
///
/// # Example
///
/// ```rust
/// use eddy::{assert_failure, Error};
///
/// let result: eddy::Result<i32> = Err(Error::msg("boom"));
/// assert_failure!(result);
/// ```
#[macro_export]
macro_rules! assert_failure {
    ($result:expr) => {
        match $result {
            ::std::result::Result::Err(_) => {}
            ::std::result::Result::Ok(v) => {
                panic!("Expected Failure, got Success: {:?}", v);
            }
        }
    };
}

/// Assert that a result is a failure of the given [`ErrorKind`](crate::ErrorKind).
///
/// # Example
///
/// ```rust
/// use eddy::{assert_failure_kind, Error, ErrorKind};
/// use std::time::Duration;
///
/// let result: eddy::Result<()> = Err(Error::timeout(Duration::from_secs(1)));
/// assert_failure_kind!(result, ErrorKind::Timeout);
/// ```
#[macro_export]
macro_rules! assert_failure_kind {
    ($result:expr, $kind:expr) => {
        match $result {
            ::std::result::Result::Err(e) => {
                assert_eq!(e.kind(), $kind, "unexpected failure kind: {:?}", e);
            }
            ::std::result::Result::Ok(v) => {
                panic!("Expected Failure of kind {:?}, got Success: {:?}", $kind, v);
            }
        }
    };
}
