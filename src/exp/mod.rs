//! Expressions: effects built from several operands and a reduction.
//!
//! Every expression comes in up to two flavours that hold the same data and
//! differ only in how they reduce it:
//!
//! - [`Strategy::Sequential`] evaluates operands one at a time, in declaration
//!   order, on the calling task, and stops as soon as the outcome is known.
//! - [`Strategy::Parallel`] spawns one task per operand into a fail-fast
//!   [`TaskGroup`](crate::TaskGroup). The first failure aborts the siblings and
//!   becomes the expression's failure. Otherwise every operand is awaited,
//!   even when an early value already decides the result, and the aggregate is
//!   assembled in declaration order.
//!
//! | expression | output | sequential | parallel |
//! |---|---|---|---|
//! | [`AllExp`] | `bool` | yes | yes |
//! | [`AnyExp`] | `bool` | yes | yes |
//! | [`CondExp`] | `T` | yes | tests only |
//! | [`IfElseExp`] | `T` | yes | no |
//! | [`SwitchExp`] | `O` | yes | no |
//! | [`ListExp`] | `Vec<T>` | yes | yes |
//! | [`JsArrayExp`] | JSON array | yes | yes |
//! | [`JsObjExp`] | JSON object | yes | yes |
//! | [`PairExp`] / [`TripleExp`] | tuple | yes | yes |
//!
//! Expressions are values. `retry_each`, `debug_each` and the builder methods
//! consume the expression and return a new one.
//!
//! # Example
//!
//! ```
//! use eddy::exp::{AllExp, Exp, JsObjExp};
//! use eddy::IO;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let checks = AllExp::par([IO::succeed(true), IO::succeed(true)]);
//! assert!(checks.into_io().run().await.unwrap());
//!
//! let profile = JsObjExp::seq()
//!     .set("name", IO::succeed(json!("Ada")))
//!     .set("age", IO::succeed(json!(36)));
//! assert_eq!(
//!     profile.into_io().run().await.unwrap(),
//!     json!({"name": "Ada", "age": 36})
//! );
//! # });
//! ```

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt};

use crate::debug::EventBuilder;
use crate::error::{Error, Result};
use crate::io::IO;
use crate::retry::RetryPolicy;
use crate::scope::TaskGroup;

mod all;
mod any;
mod cond;
mod if_else;
mod json;
mod list;
mod switch;
mod tuple;

pub use all::AllExp;
pub use any::AnyExp;
pub use cond::CondExp;
pub use if_else::IfElseExp;
pub use json::{JsArrayExp, JsObjExp};
pub use list::ListExp;
pub use switch::SwitchExp;
pub use tuple::{PairExp, TripleExp};


/// How an expression evaluates its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// One operand at a time, in declaration order, short-circuiting.
    Sequential,
    /// All operands at once in a fail-fast task group.
    Parallel,
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::AllExp {}
    impl Sealed for super::AnyExp {}
    impl<T> Sealed for super::CondExp<T> {}
    impl<T> Sealed for super::IfElseExp<T> {}
    impl Sealed for super::JsArrayExp {}
    impl Sealed for super::JsObjExp {}
    impl<T> Sealed for super::ListExp<T> {}
    impl<A, B> Sealed for super::PairExp<A, B> {}
    impl<I, O> Sealed for super::SwitchExp<I, O> {}
    impl<A, B, C> Sealed for super::TripleExp<A, B, C> {}
}

/// An effect with several operands and a reduction algorithm.
///
/// The set of expressions is closed: this trait is sealed and implemented
/// only by the variants in this module.
pub trait Exp: sealed::Sealed + Send + Sync + Sized + 'static {
    /// What the reduction produces.
    type Output: Send + 'static;

    /// Evaluate the operands and reduce their outcomes to one result.
    fn reduce(&self) -> BoxFuture<'static, Result<Self::Output>>;

    /// Turn the expression into an ordinary effect.
    fn into_io(self) -> IO<Self::Output> {
        let exp = Arc::new(self);
        IO::from_boxed(move || exp.reduce())
    }
}

/// A factory for an effect that is only built when its branch is chosen.
pub(crate) type Thunk<T> = Arc<dyn Fn() -> IO<T> + Send + Sync>;

/// A retry applied to every operand of an expression.
#[derive(Clone)]
pub(crate) struct OperandRetry {
    predicate: Arc<dyn Fn(&Error) -> bool + Send + Sync>,
    policy: RetryPolicy,
}

impl OperandRetry {
    pub(crate) fn always(policy: RetryPolicy) -> Self {
        Self::when(|_| true, policy)
    }

    pub(crate) fn when<P>(predicate: P, policy: RetryPolicy) -> Self
    where
        P: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            policy,
        }
    }

    pub(crate) fn apply<T: Send + 'static>(&self, io: IO<T>) -> IO<T> {
        let predicate = Arc::clone(&self.predicate);
        io.retry_if(move |error| predicate(error), self.policy.clone())
    }

    pub(crate) fn apply_thunk<T: Send + 'static>(&self, thunk: Thunk<T>) -> Thunk<T> {
        let retry = self.clone();
        Arc::new(move || retry.apply(thunk()))
    }
}

impl fmt::Debug for OperandRetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperandRetry")
            .field("policy", &self.policy)
            .finish()
    }
}

/// Instrument the effect a thunk builds, without building it early.
pub(crate) fn debug_thunk<T: Send + 'static>(thunk: Thunk<T>, builder: EventBuilder<T>) -> Thunk<T> {
    Arc::new(move || thunk().debug(builder.clone()))
}

/// Generates `retry_each` and `retry_each_if` for an expression that has a
/// `with_retry(self, OperandRetry) -> Self` method.
macro_rules! operand_retries {
    () => {
        /// Retry every operand with `policy` when it fails.
        ///
        /// The expression itself is not retried: a retried operand that still
        /// fails makes the expression fail.
        pub fn retry_each(self, policy: $crate::retry::RetryPolicy) -> Self {
            self.with_retry($crate::exp::OperandRetry::always(policy))
        }

        /// Retry every operand with `policy` when it fails with an error
        /// matching `predicate`.
        pub fn retry_each_if<P>(self, predicate: P, policy: $crate::retry::RetryPolicy) -> Self
        where
            P: Fn(&$crate::Error) -> bool + Send + Sync + 'static,
        {
            self.with_retry($crate::exp::OperandRetry::when(predicate, policy))
        }
    };
}

pub(crate) use operand_retries;

/// Evaluate `operands` under `strategy` and collect their values in
/// declaration order.
pub(crate) async fn evaluate<T: Send + 'static>(
    strategy: Strategy,
    operands: Vec<IO<T>>,
) -> Result<Vec<T>> {
    match strategy {
        Strategy::Sequential => {
            let mut values = Vec::with_capacity(operands.len());
            for operand in operands {
                values.push(operand.run().await?);
            }
            Ok(values)
        }
        Strategy::Parallel => {
            let mut group = TaskGroup::new();
            for operand in operands {
                group.spawn(operand);
            }
            group.join_all().await
        }
    }
}

/// Box a reduction, reporting it through `builder` when the expression is
/// instrumented.
pub(crate) fn observe<T, F>(builder: Option<EventBuilder<T>>, reduction: F) -> BoxFuture<'static, Result<T>>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    match builder {
        None => reduction.boxed(),
        Some(builder) => async move {
            let started = Instant::now();
            let result = match AssertUnwindSafe(reduction).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(Error::panicked(payload)),
            };
            builder.report(&result, started);
            result
        }
        .boxed(),
    }
}
