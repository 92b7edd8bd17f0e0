use futures::future::{BoxFuture, FutureExt};

use super::{evaluate, observe, operand_retries, Exp, OperandRetry, Strategy};
use crate::debug::EventBuilder;
use crate::error::Result;
use crate::io::IO;

/// Logical OR over boolean effects, the dual of [`AllExp`](super::AllExp).
///
/// The sequential form stops at the first `true` or the first failure. An
/// empty `AnyExp` is `false`.
#[derive(Debug, Clone)]
pub struct AnyExp {
    strategy: Strategy,
    operands: Vec<IO<bool>>,
    debugger: Option<EventBuilder<bool>>,
}

impl AnyExp {
    /// Name used in instrumentation events.
    pub const NAME: &'static str = "AnyExp";

    /// Sequential, short-circuiting OR.
    pub fn seq(operands: impl IntoIterator<Item = IO<bool>>) -> Self {
        Self::new(Strategy::Sequential, operands)
    }

    /// Parallel OR.
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
    /// `AnyExp`.
    pub fn debug_each_with_context(self, context: impl Into<String>) -> Self {
        self.debug_each(EventBuilder::new(Self::NAME, context))
    }
}

impl Exp for AnyExp {
    type Output = bool;

    fn reduce(&self) -> BoxFuture<'static, Result<bool>> {
        let operands = self.operands.clone();
        let reduction = match self.strategy {
            Strategy::Sequential => async move {
                for operand in operands {
                    if operand.run().await? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            .boxed(),
            Strategy::Parallel => async move {
                let values = evaluate(Strategy::Parallel, operands).await?;
                Ok(values.into_iter().any(|value| value))
            }
            .boxed(),
        };
        observe(self.debugger.clone(), reduction)
    }
}
