use std::fmt;

use futures::future::{BoxFuture, FutureExt};

use super::{evaluate, observe, operand_retries, Exp, OperandRetry, Strategy};
use crate::debug::EventBuilder;
use crate::error::Result;
use crate::io::IO;

/// Collects the values of N effects of the same type into a `Vec`, in
/// declaration order.
///
/// ```
/// use eddy::exp::{Exp, ListExp};
/// use eddy::IO;
///
/// # tokio_test::block_on(async {
/// let exp = ListExp::par([IO::succeed(1), IO::succeed(2)]).append(IO::succeed(3));
/// assert_eq!(exp.into_io().run().await.unwrap(), vec![1, 2, 3]);
/// # });
/// ```
pub struct ListExp<T> {
    strategy: Strategy,
    operands: Vec<IO<T>>,
    debugger: Option<EventBuilder<Vec<T>>>,
}

impl<T> Clone for ListExp<T> {
    fn clone(&self) -> Self {
        Self {
            strategy: self.strategy,
            operands: self.operands.clone(),
            debugger: self.debugger.clone(),
        }
    }
}

impl<T> fmt::Debug for ListExp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListExp")
            .field("strategy", &self.strategy)
            .field("operands", &self.operands.len())
            .field("debugger", &self.debugger)
            .finish()
    }
}

impl<T: Send + 'static> ListExp<T> {
    /// Name used in instrumentation events.
    pub const NAME: &'static str = "ListExp";

    /// Evaluate operands one by one, stopping at the first failure.
    pub fn seq(operands: impl IntoIterator<Item = IO<T>>) -> Self {
        Self::new(Strategy::Sequential, operands)
    }

    /// Evaluate operands concurrently.
    pub fn par(operands: impl IntoIterator<Item = IO<T>>) -> Self {
        Self::new(Strategy::Parallel, operands)
    }

    fn new(strategy: Strategy, operands: impl IntoIterator<Item = IO<T>>) -> Self {
        Self {
            strategy,
            operands: operands.into_iter().collect(),
            debugger: None,
        }
    }

    /// A new list with `operand` added at the end.
    pub fn append(mut self, operand: IO<T>) -> Self {
        self.operands.push(operand);
        self
    }

    /// Number of operands.
    pub fn len(&self) -> usize {
        self.operands.len()
    }

    /// True if there are no operands.
    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    /// The reduction strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    operand_retries!();

    fn with_retry(self, retry: OperandRetry) -> Self {
        Self {
            operands: self.operands.into_iter().map(|op| retry.apply(op)).collect(),
            ..self
        }
    }
}

impl<T: fmt::Debug + Send + 'static> ListExp<T> {
    /// Report this expression through `builder`, and each operand under
    /// `name[index]`.
    pub fn debug_each(self, builder: EventBuilder<Vec<T>>) -> Self {
        let operands = self
            .operands
            .into_iter()
            .enumerate()
            .map(|(i, op)| op.debug(builder.derive(format!("{}[{}]", builder.name(), i))))
            .collect();
        Self {
            operands,
            debugger: Some(builder),
            ..self
        }
    }

    /// [`debug_each`](Self::debug_each) with the default builder named
    /// `ListExp`.
    pub fn debug_each_with_context(self, context: impl Into<String>) -> Self {
        self.debug_each(EventBuilder::new(Self::NAME, context))
    }
}

impl<T: Send + 'static> Exp for ListExp<T> {
    type Output = Vec<T>;

    fn reduce(&self) -> BoxFuture<'static, Result<Vec<T>>> {
        let reduction = evaluate(self.strategy, self.operands.clone()).boxed();
        observe(self.debugger.clone(), reduction)
    }
}
