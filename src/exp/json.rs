//! Expressions that assemble JSON values.
//!
//! Objects keep their keys in declaration order (`serde_json` is built with
//! `preserve_order`), whichever strategy evaluated them.

use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};

use super::{evaluate, observe, operand_retries, Exp, OperandRetry, Strategy};
use crate::debug::EventBuilder;
use crate::error::Result;
use crate::io::IO;

fn render_json(value: &Value) -> String {
    value.to_string()
}

/// Builds a JSON object from one effect per key.
///
/// Setting a key that is already present replaces its effect and keeps its
/// position.
///
/// ```
/// use eddy::exp::{Exp, JsObjExp};
/// use eddy::IO;
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let exp = JsObjExp::par()
///     .set("id", IO::succeed(json!(7)))
///     .set("tags", IO::succeed(json!(["a", "b"])));
///
/// assert_eq!(exp.into_io().run().await.unwrap(), json!({"id": 7, "tags": ["a", "b"]}));
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct JsObjExp {
    strategy: Strategy,
    bindings: Vec<(String, IO<Value>)>,
    debugger: Option<EventBuilder<Value>>,
}

impl JsObjExp {
    /// Name used in instrumentation events.
    pub const NAME: &'static str = "JsObjExp";

    /// An empty object evaluated key by key.
    pub fn seq() -> Self {
        Self::new(Strategy::Sequential)
    }

    /// An empty object whose values are evaluated concurrently.
    pub fn par() -> Self {
        Self::new(Strategy::Parallel)
    }

    fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            bindings: Vec::new(),
            debugger: None,
        }
    }

    /// A new object with `key` bound to `value`.
    pub fn set(mut self, key: impl Into<String>, value: IO<Value>) -> Self {
        let key = key.into();
        match self.bindings.iter_mut().find(|(existing, _)| *existing == key) {
            Some(binding) => binding.1 = value,
            None => self.bindings.push((key, value)),
        }
        self
    }

    /// The keys, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(key, _)| key.as_str())
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True if no key is set.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The reduction strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    operand_retries!();

    fn with_retry(self, retry: OperandRetry) -> Self {
        Self {
            bindings: self
                .bindings
                .into_iter()
                .map(|(key, io)| (key, retry.apply(io)))
                .collect(),
            ..self
        }
    }

    /// Report this expression through `builder`, and each value under
    /// `name[key]`.
    pub fn debug_each(self, builder: EventBuilder<Value>) -> Self {
        let bindings = self
            .bindings
            .into_iter()
            .map(|(key, io)| {
                let child = builder
                    .derive::<Value>(format!("{}[{}]", builder.name(), key))
                    .with_success_output(render_json);
                (key, io.debug(child))
            })
            .collect();
        Self {
            bindings,
            debugger: Some(builder),
            ..self
        }
    }

    /// [`debug_each`](Self::debug_each) with the default builder named
    /// `JsObjExp`.
    pub fn debug_each_with_context(self, context: impl Into<String>) -> Self {
        self.debug_each(EventBuilder::with_renderer(Self::NAME, context, render_json))
    }
}

impl Exp for JsObjExp {
    type Output = Value;

    fn reduce(&self) -> BoxFuture<'static, Result<Value>> {
        let (keys, values): (Vec<String>, Vec<IO<Value>>) = self.bindings.iter().cloned().unzip();
        let strategy = self.strategy;
        let reduction = async move {
            let values = evaluate(strategy, values).await?;
            let object: Map<String, Value> = keys.into_iter().zip(values).collect();
            Ok(Value::Object(object))
        };
        observe(self.debugger.clone(), reduction)
    }
}

/// Builds a JSON array from one effect per element.
#[derive(Debug, Clone)]
pub struct JsArrayExp {
    strategy: Strategy,
    operands: Vec<IO<Value>>,
    debugger: Option<EventBuilder<Value>>,
}

impl JsArrayExp {
    /// Name used in instrumentation events.
    pub const NAME: &'static str = "JsArrayExp";

    /// Evaluate elements one by one, stopping at the first failure.
    pub fn seq(operands: impl IntoIterator<Item = IO<Value>>) -> Self {
        Self::new(Strategy::Sequential, operands)
    }

    /// Evaluate elements concurrently.
    pub fn par(operands: impl IntoIterator<Item = IO<Value>>) -> Self {
        Self::new(Strategy::Parallel, operands)
    }

    fn new(strategy: Strategy, operands: impl IntoIterator<Item = IO<Value>>) -> Self {
        Self {
            strategy,
            operands: operands.into_iter().collect(),
            debugger: None,
        }
    }

    /// A new array with `operand` added at the end.
    pub fn append(mut self, operand: IO<Value>) -> Self {
        self.operands.push(operand);
        self
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

    /// Report this expression through `builder`, and each element under
    /// `name[index]`.
    pub fn debug_each(self, builder: EventBuilder<Value>) -> Self {
        let operands = self
            .operands
            .into_iter()
            .enumerate()
            .map(|(i, op)| {
                let child = builder
                    .derive::<Value>(format!("{}[{}]", builder.name(), i))
                    .with_success_output(render_json);
                op.debug(child)
            })
            .collect();
        Self {
            operands,
            debugger: Some(builder),
            ..self
        }
    }

    /// [`debug_each`](Self::debug_each) with the default builder named
    /// `JsArrayExp`.
    pub fn debug_each_with_context(self, context: impl Into<String>) -> Self {
        self.debug_each(EventBuilder::with_renderer(Self::NAME, context, render_json))
    }
}

impl Exp for JsArrayExp {
    type Output = Value;

    fn reduce(&self) -> BoxFuture<'static, Result<Value>> {
        let reduction = evaluate(self.strategy, self.operands.clone()).map(|values| values.map(Value::Array));
        observe(self.debugger.clone(), reduction)
    }
}
