//! Fixed-arity expressions over effects of different types.

use std::fmt;

use futures::future::{BoxFuture, FutureExt};

use super::{evaluate, observe, operand_retries, Exp, OperandRetry, Strategy};
use crate::debug::EventBuilder;
use crate::error::{Error, Result};
use crate::io::IO;

/// One tuple element on its way through a homogeneous task group.
enum Slot<A, B, C> {
    First(A),
    Second(B),
    Third(C),
}

fn misplaced() -> Error {
    Error::msg("tuple operand completed into the wrong position")
}

/// Combines two effects into a pair.
///
/// ```
/// use eddy::exp::{Exp, PairExp};
/// use eddy::IO;
///
/// # tokio_test::block_on(async {
/// let exp = PairExp::par(IO::succeed(1), IO::succeed("one"));
/// assert_eq!(exp.into_io().run().await.unwrap(), (1, "one"));
/// # });
/// ```
pub struct PairExp<A, B> {
    strategy: Strategy,
    first: IO<A>,
    second: IO<B>,
    debugger: Option<EventBuilder<(A, B)>>,
}

impl<A, B> Clone for PairExp<A, B> {
    fn clone(&self) -> Self {
        Self {
            strategy: self.strategy,
            first: self.first.clone(),
            second: self.second.clone(),
            debugger: self.debugger.clone(),
        }
    }
}

impl<A, B> fmt::Debug for PairExp<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairExp")
            .field("strategy", &self.strategy)
            .field("debugger", &self.debugger)
            .finish()
    }
}

impl<A: Send + 'static, B: Send + 'static> PairExp<A, B> {
    /// Name used in instrumentation events.
    pub const NAME: &'static str = "PairExp";

    /// Evaluate `first`, then `second`.
    pub fn seq(first: IO<A>, second: IO<B>) -> Self {
        Self::new(Strategy::Sequential, first, second)
    }

    /// Evaluate both concurrently.
    pub fn par(first: IO<A>, second: IO<B>) -> Self {
        Self::new(Strategy::Parallel, first, second)
    }

    fn new(strategy: Strategy, first: IO<A>, second: IO<B>) -> Self {
        Self {
            strategy,
            first,
            second,
            debugger: None,
        }
    }

    /// The reduction strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    operand_retries!();

    fn with_retry(self, retry: OperandRetry) -> Self {
        Self {
            first: retry.apply(self.first),
            second: retry.apply(self.second),
            ..self
        }
    }
}

impl<A, B> PairExp<A, B>
where
    A: fmt::Debug + Send + 'static,
    B: fmt::Debug + Send + 'static,
{
    /// Report this expression through `builder`, and the elements under
    /// `name[0]` and `name[1]`.
    pub fn debug_each(self, builder: EventBuilder<(A, B)>) -> Self {
        let name = builder.name().to_string();
        Self {
            first: self.first.debug(builder.derive(format!("{}[0]", name))),
            second: self.second.debug(builder.derive(format!("{}[1]", name))),
            debugger: Some(builder),
            ..self
        }
    }

    /// [`debug_each`](Self::debug_each) with the default builder named
    /// `PairExp`.
    pub fn debug_each_with_context(self, context: impl Into<String>) -> Self {
        self.debug_each(EventBuilder::new(Self::NAME, context))
    }
}

impl<A: Send + 'static, B: Send + 'static> Exp for PairExp<A, B> {
    type Output = (A, B);

    fn reduce(&self) -> BoxFuture<'static, Result<(A, B)>> {
        let first = self.first.clone();
        let second = self.second.clone();
        let reduction = match self.strategy {
            Strategy::Sequential => async move {
                let a = first.run().await?;
                let b = second.run().await?;
                Ok((a, b))
            }
            .boxed(),
            Strategy::Parallel => async move {
                let slots = evaluate(
                    Strategy::Parallel,
                    vec![first.map(Slot::<A, B, ()>::First), second.map(Slot::Second)],
                )
                .await?;
                match <[Slot<A, B, ()>; 2]>::try_from(slots) {
                    Ok([Slot::First(a), Slot::Second(b)]) => Ok((a, b)),
                    _ => Err(misplaced()),
                }
            }
            .boxed(),
        };
        observe(self.debugger.clone(), reduction)
    }
}

/// Combines three effects into a triple.
pub struct TripleExp<A, B, C> {
    strategy: Strategy,
    first: IO<A>,
    second: IO<B>,
    third: IO<C>,
    debugger: Option<EventBuilder<(A, B, C)>>,
}

impl<A, B, C> Clone for TripleExp<A, B, C> {
    fn clone(&self) -> Self {
        Self {
            strategy: self.strategy,
            first: self.first.clone(),
            second: self.second.clone(),
            third: self.third.clone(),
            debugger: self.debugger.clone(),
        }
    }
}

impl<A, B, C> fmt::Debug for TripleExp<A, B, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TripleExp")
            .field("strategy", &self.strategy)
            .field("debugger", &self.debugger)
            .finish()
    }
}

impl<A: Send + 'static, B: Send + 'static, C: Send + 'static> TripleExp<A, B, C> {
    /// Name used in instrumentation events.
    pub const NAME: &'static str = "TripleExp";

    /// Evaluate `first`, `second` and `third` in order.
    pub fn seq(first: IO<A>, second: IO<B>, third: IO<C>) -> Self {
        Self::new(Strategy::Sequential, first, second, third)
    }

    /// Evaluate all three concurrently.
    pub fn par(first: IO<A>, second: IO<B>, third: IO<C>) -> Self {
        Self::new(Strategy::Parallel, first, second, third)
    }

    fn new(strategy: Strategy, first: IO<A>, second: IO<B>, third: IO<C>) -> Self {
        Self {
            strategy,
            first,
            second,
            third,
            debugger: None,
        }
    }

    /// The reduction strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    operand_retries!();

    fn with_retry(self, retry: OperandRetry) -> Self {
        Self {
            first: retry.apply(self.first),
            second: retry.apply(self.second),
            third: retry.apply(self.third),
            ..self
        }
    }
}

impl<A, B, C> TripleExp<A, B, C>
where
    A: fmt::Debug + Send + 'static,
    B: fmt::Debug + Send + 'static,
    C: fmt::Debug + Send + 'static,
{
    /// Report this expression through `builder`, and the elements under
    /// `name[0]`, `name[1]` and `name[2]`.
    pub fn debug_each(self, builder: EventBuilder<(A, B, C)>) -> Self {
        let name = builder.name().to_string();
        Self {
            first: self.first.debug(builder.derive(format!("{}[0]", name))),
            second: self.second.debug(builder.derive(format!("{}[1]", name))),
            third: self.third.debug(builder.derive(format!("{}[2]", name))),
            debugger: Some(builder),
            ..self
        }
    }

    /// [`debug_each`](Self::debug_each) with the default builder named
    /// `TripleExp`.
    pub fn debug_each_with_context(self, context: impl Into<String>) -> Self {
        self.debug_each(EventBuilder::new(Self::NAME, context))
    }
}

impl<A: Send + 'static, B: Send + 'static, C: Send + 'static> Exp for TripleExp<A, B, C> {
    type Output = (A, B, C);

    fn reduce(&self) -> BoxFuture<'static, Result<(A, B, C)>> {
        let first = self.first.clone();
        let second = self.second.clone();
        let third = self.third.clone();
        let reduction = match self.strategy {
            Strategy::Sequential => async move {
                let a = first.run().await?;
                let b = second.run().await?;
                let c = third.run().await?;
                Ok((a, b, c))
            }
            .boxed(),
            Strategy::Parallel => async move {
                let slots = evaluate(
                    Strategy::Parallel,
                    vec![
                        first.map(Slot::<A, B, C>::First),
                        second.map(Slot::Second),
                        third.map(Slot::Third),
                    ],
                )
                .await?;
                match <[Slot<A, B, C>; 3]>::try_from(slots) {
                    Ok([Slot::First(a), Slot::Second(b), Slot::Third(c)]) => Ok((a, b, c)),
                    _ => Err(misplaced()),
                }
            }
            .boxed(),
        };
        observe(self.debugger.clone(), reduction)
    }
}
