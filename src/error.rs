//! The error carried by every failed effect.
//!
//! Effects never unwind past their own boundary. Whatever goes wrong inside
//! one (a returned error, a panic in user code, a timeout, an aborted task)
//! ends up as an [`Error`] inside the effect's [`Result`].
//!
//! `Error` is a cheap handle: cloning it shares the same allocation, so an
//! error that travels up an expression tree keeps its identity.
//!
//! # Examples
//!
//! ```
//! use eddy::{Error, ErrorKind};
//!
//! let err = Error::msg("connection refused");
//! assert_eq!(err.kind(), ErrorKind::Failed);
//! assert_eq!(err.to_string(), "connection refused");
//!
//! let copy = err.clone();
//! assert!(Error::ptr_eq(&err, &copy));
//! ```

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of evaluating an effect: `Ok` on success, `Err` on failure.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A computation reported a failure.
    Failed,
    /// User code panicked while the effect was being evaluated.
    Panicked,
    /// The effect did not complete before its deadline.
    Timeout,
    /// The task evaluating the effect was cancelled.
    Cancelled,
    /// A combinator rejected one of its arguments.
    IllegalArgument,
    /// No branch of a conditional expression matched and no default was set.
    NoMatch,
    /// An I/O operation failed.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Failed => "failed",
            ErrorKind::Panicked => "panicked",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::IllegalArgument => "illegal argument",
            ErrorKind::NoMatch => "no match",
            ErrorKind::Io => "i/o",
        };
        f.write_str(name)
    }
}

/// A shared, clonable failure value.
#[derive(Clone)]
pub struct Error {
    inner: Arc<Inner>,
}

struct Inner {
    kind: ErrorKind,
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    /// Create an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            inner: Arc::new(Inner {
                kind,
                message: message.into(),
                source: None,
            }),
        }
    }

    /// Create an error of the given kind that was caused by `source`.
    pub fn with_source<E>(kind: ErrorKind, message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Error {
            inner: Arc::new(Inner {
                kind,
                message: message.into(),
                source: Some(Box::new(source)),
            }),
        }
    }

    /// Create a plain [`ErrorKind::Failed`] error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Failed, message)
    }

    /// Wrap any standard error. The wrapped error becomes the `source`.
    ///
    /// ```
    /// use eddy::Error;
    ///
    /// let parse = "x".parse::<u8>().unwrap_err();
    /// let err = Error::wrap(parse);
    /// assert!(err.downcast_ref::<std::num::ParseIntError>().is_some());
    /// ```
    pub fn wrap<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let message = error.to_string();
        Error::with_source(ErrorKind::Failed, message, error)
    }

    /// Error reported when an effect exceeds its deadline.
    pub fn timeout(after: Duration) -> Self {
        Error::new(
            ErrorKind::Timeout,
            format!("effect timed out after {:?}", after),
        )
    }

    /// Error reported for a task that was cancelled before finishing.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Cancelled, message)
    }

    /// Error reported for a rejected argument.
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::IllegalArgument, message)
    }

    /// Error reported when no branch of a conditional matched.
    pub fn no_match(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::NoMatch, message)
    }

    /// Convert a panic payload into an [`ErrorKind::Panicked`] error.
    pub fn panicked(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with a non-string payload".to_string()
        };
        Error::new(ErrorKind::Panicked, message)
    }

    pub(crate) fn from_join_error(error: tokio::task::JoinError) -> Self {
        if error.is_panic() {
            Error::panicked(error.into_panic())
        } else {
            Error::cancelled("task was aborted before completing")
        }
    }

    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    /// The message this error was created with.
    pub fn message(&self) -> &str {
        &self.inner.message
    }

    /// Returns true if both handles point at the same error.
    pub fn ptr_eq(a: &Error, b: &Error) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Look at the direct source as a concrete error type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.source.as_deref()?.downcast_ref::<E>()
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Error");
        s.field("kind", &self.inner.kind)
            .field("message", &self.inner.message);
        if let Some(source) = &self.inner.source {
            s.field("source", source);
        }
        s.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        let message = error.to_string();
        Error::with_source(ErrorKind::Io, message, error)
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::msg(message)
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::msg(message)
    }
}

/// Helpers for inspecting an effect's [`Result`].
///
/// ```
/// use eddy::{Error, ResultExt};
///
/// let ok: eddy::Result<i32> = Ok(1);
/// assert!(ok.is_success());
///
/// let failed: eddy::Result<i32> = Err(Error::msg("boom"));
/// assert!(failed.is_failure());
/// ```
pub trait ResultExt<T> {
    /// Returns true for `Ok`.
    fn is_success(&self) -> bool;

    /// Returns true for `Err`.
    fn is_failure(&self) -> bool;

    /// Hand the stored error to the caller's error type so `?` propagates it.
    fn unwrap_or_throw<E: From<Error>>(self) -> std::result::Result<T, E>;

    /// Return the value, panicking if this is a failure.
    ///
    /// Only for call sites that already proved the result succeeded.
    ///
    /// # Panics
    ///
    /// Panics with the stored error's message if this is a failure.
    fn unwrap_or_panic(self) -> T;
}

impl<T> ResultExt<T> for Result<T> {
    fn is_success(&self) -> bool {
        self.is_ok()
    }

    fn is_failure(&self) -> bool {
        self.is_err()
    }

    fn unwrap_or_throw<E: From<Error>>(self) -> std::result::Result<T, E> {
        self.map_err(E::from)
    }

    fn unwrap_or_panic(self) -> T {
        match self {
            Ok(value) => value,
            Err(error) => panic!("unexpected failure ({}): {}", error.kind(), error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Root;

    impl fmt::Display for Root {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("root")
        }
    }

    impl StdError for Root {}

    #[test]
    fn test_clone_preserves_identity() {
        let err = Error::msg("boom");
        let other = Error::msg("boom");
        assert!(Error::ptr_eq(&err, &err.clone()));
        assert!(!Error::ptr_eq(&err, &other));
    }

    #[test]
    fn test_wrap_keeps_source() {
        let err = Error::wrap(Root);
        assert_eq!(err.kind(), ErrorKind::Failed);
        assert_eq!(err.to_string(), "root");
        assert!(err.downcast_ref::<Root>().is_some());
        assert!(err.source().is_some());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.message(), "missing");
    }

    #[test]
    fn test_panicked_payloads() {
        let err = Error::panicked(Box::new("static str"));
        assert_eq!(err.kind(), ErrorKind::Panicked);
        assert_eq!(err.message(), "static str");

        let err = Error::panicked(Box::new(String::from("owned")));
        assert_eq!(err.message(), "owned");

        let err = Error::panicked(Box::new(42));
        assert_eq!(err.message(), "panic with a non-string payload");
    }

    #[test]
    fn test_result_ext() {
        let ok: Result<i32> = Ok(1);
        assert!(ok.is_success());
        assert!(!ok.is_failure());
        assert_eq!(ok.unwrap_or_panic(), 1);

        let failed: Result<i32> = Err(Error::msg("nope"));
        let thrown: std::result::Result<i32, Error> = failed.unwrap_or_throw();
        assert_eq!(thrown.unwrap_err().message(), "nope");
    }

    #[test]
    #[should_panic(expected = "unexpected failure")]
    fn test_unwrap_or_panic_on_failure() {
        let failed: Result<i32> = Err(Error::msg("nope"));
        failed.unwrap_or_panic();
    }

    #[test]
    fn test_display_of_kinds() {
        assert_eq!(ErrorKind::Timeout.to_string(), "timeout");
        assert_eq!(ErrorKind::NoMatch.to_string(), "no match");
    }
}
