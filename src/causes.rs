//! Walking an error's cause chain.
//!
//! Retry predicates usually want to know *why* something failed, and the
//! interesting error is often a few `source()` hops below the one an effect
//! returned. These helpers make that cheap to express.
//!
//! # Examples
//!
//! ```
//! use eddy::{causes, Error, ErrorKind};
//!
//! let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out");
//! let err = Error::with_source(ErrorKind::Failed, "fetching profile", io);
//!
//! assert_eq!(causes::chain(&err).count(), 2);
//! assert_eq!(causes::root_cause(&err).to_string(), "read timed out");
//! assert!(causes::find_cause::<std::io::Error>(&err).is_some());
//! ```

use std::error::Error as StdError;

use crate::error::{Error, ErrorKind};

/// Iterator over an error and every error in its `source()` chain.
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    next: Option<&'a (dyn StdError + 'static)>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a (dyn StdError + 'static);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.source();
        Some(current)
    }
}

/// The error itself followed by its causes, outermost first.
pub fn chain<'a>(error: &'a (dyn StdError + 'static)) -> Chain<'a> {
    Chain { next: Some(error) }
}

/// The innermost cause. An error without a source is its own root.
pub fn root_cause<'a>(error: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
    let mut current = error;
    while let Some(source) = current.source() {
        current = source;
    }
    current
}

/// The first error in the chain of concrete type `E`, if any.
pub fn find_cause<'a, E: StdError + 'static>(error: &'a (dyn StdError + 'static)) -> Option<&'a E> {
    chain(error).find_map(|e| e.downcast_ref::<E>())
}

/// Returns true if any error in the chain satisfies `predicate`.
pub fn any_cause<P>(error: &(dyn StdError + 'static), predicate: P) -> bool
where
    P: Fn(&(dyn StdError + 'static)) -> bool,
{
    chain(error).any(predicate)
}

/// Render the whole chain as `outer: inner: root`.
///
/// A link whose text repeats the previous one, as a wrapped error's does, is
/// written once.
pub fn describe(error: &(dyn StdError + 'static)) -> String {
    let mut links: Vec<String> = chain(error).map(|e| e.to_string()).collect();
    links.dedup();
    links.join(": ")
}

/// Retry predicate matching errors of the given kind.
pub fn is_kind(kind: ErrorKind) -> impl Fn(&Error) -> bool + Send + Sync + Clone + 'static {
    move |error: &Error| error.kind() == kind
}

/// Retry predicate matching when any message in the chain contains `text`.
pub fn message_contains(
    text: impl Into<String>,
) -> impl Fn(&Error) -> bool + Send + Sync + Clone + 'static {
    let text = text.into();
    move |error: &Error| any_cause(error, |e| e.to_string().contains(&text))
}

/// Retry predicate matching when the chain contains an error of type `E`.
pub fn caused_by<E: StdError + 'static>() -> impl Fn(&Error) -> bool + Send + Sync + Clone + 'static
{
    |error: &Error| find_cause::<E>(error).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn layered() -> Error {
        let root = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        let middle = Error::with_source(ErrorKind::Io, "reading response", root);
        Error::with_source(ErrorKind::Failed, "loading user", middle)
    }

    #[test]
    fn test_chain_walks_outermost_first() {
        let err = layered();
        let messages: Vec<String> = chain(&err).map(|e| e.to_string()).collect();
        assert_eq!(
            messages,
            vec!["loading user", "reading response", "reset by peer"]
        );
    }

    #[test]
    fn test_root_cause_without_source_is_self() {
        let err = Error::msg("alone");
        assert_eq!(root_cause(&err).to_string(), "alone");
    }

    #[test]
    fn test_find_cause_by_type() {
        let err = layered();
        let io = find_cause::<io::Error>(&err).unwrap();
        assert_eq!(io.kind(), io::ErrorKind::ConnectionReset);
        assert!(find_cause::<std::fmt::Error>(&err).is_none());
    }

    #[test]
    fn test_describe_joins_messages() {
        assert_eq!(
            describe(&layered()),
            "loading user: reading response: reset by peer"
        );
    }

    #[test]
    fn test_describe_writes_wrapped_message_once() {
        let err = Error::from(io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert_eq!(describe(&err), "missing");

        let wrapped = Error::with_source(ErrorKind::Failed, "loading config", err);
        assert_eq!(describe(&wrapped), "loading config: missing");
    }

    #[test]
    fn test_predicates() {
        let err = layered();
        assert!(is_kind(ErrorKind::Failed)(&err));
        assert!(!is_kind(ErrorKind::Timeout)(&err));
        assert!(message_contains("peer")(&err));
        assert!(!message_contains("disk")(&err));
        assert!(caused_by::<io::Error>()(&err));
    }
}
