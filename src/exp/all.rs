use futures::future::{BoxFuture, FutureExt};

use super::{evaluate, observe, operand_retries, Exp, OperandRetry, Strategy};
use crate::debug::EventBuilder;
use crate::error::Result;
use crate::io::IO;

/// Logical AND over boolean effects.
///
/// The sequential form stops at the first `false` or the first failure, so
/// later operands never run. The parallel form runs every operand and fails
/// fast only on failures. An empty `AllExp` is `true`.
///
/// ```
/// use eddy::exp::{AllExp, Exp};
/// use eddy::IO;
///
/// # tokio_test::block_on(async {
/// let exp = AllExp::seq([IO::succeed(true), IO::succeed(false), IO::fail("never run")]);
/// assert!(!exp.into_io().run().await.unwrap());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct AllExp {
    strategy: Strategy,
    operands: Vec<IO<bool>>,
    debugger: Option<EventBuilder<bool>>,
}

impl AllExp {
    /// Name used in instrumentation events.
    pub const NAME: &'static str = "AllExp";

    /// Sequential, short-circuiting AND.
    pub fn seq(operands: impl IntoIterator<Item = IO<bool>>) -> Self {
        Self::new(Strategy::Sequential, operands)
    }

    /// Parallel AND.
    pub fn par(operands: impl IntoIterator<Item = IO<bool>>) -> Self {
        Self::new(Strategy::Parallel, operands)
    }

    fn new(strategy: Strategy, operands: impl IntoIterator<Item = IO<bool>>) -> Self {
        Self {
            strategy,
            operands: operands.into_iter().collect(),
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
            operands: self.operands.into_iter().map(|op| retry.apply(op)).collect(),
            ..self
        }
    }

    /// Report this expression through `builder`, and each operand under
    /// `name[index]`.
    pub fn debug_each(self, builder: EventBuilder<bool>) -> Self {
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
    /// `AllExp`.
    pub fn debug_each_with_context(self, context: impl Into<String>) -> Self {
        self.debug_each(EventBuilder::new(Self::NAME, context))
    }
}

impl Exp for AllExp {
    type Output = bool;

    fn reduce(&self) -> BoxFuture<'static, Result<bool>> {
        let operands = self.operands.clone();
        let reduction = match self.strategy {
            Strategy::Sequential => async move {
                for operand in operands {
                    if !operand.run().await? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            .boxed(),
            Strategy::Parallel => async move {
                let values = evaluate(Strategy::Parallel, operands).await?;
                Ok(values.into_iter().all(|value| value))
            }
            .boxed(),
        };
        observe(self.debugger.clone(), reduction)
    }
}
