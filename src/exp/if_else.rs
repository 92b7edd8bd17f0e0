use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use super::{debug_thunk, observe, operand_retries, Exp, OperandRetry, Thunk};
use crate::debug::EventBuilder;
use crate::error::{Error, Result};
use crate::io::IO;

/// Binary choice on a boolean effect.
///
/// The predicate runs once. Only the selected branch factory is ever called,
/// so the other branch is never built, let alone evaluated. A missing branch
/// fails with [`ErrorKind::NoMatch`](crate::ErrorKind::NoMatch) when selected.
///
/// ```
/// use eddy::exp::{Exp, IfElseExp};
/// use eddy::IO;
///
/// # tokio_test::block_on(async {
/// let exp = IfElseExp::predicate(IO::succeed(false))
///     .consequence(|| unreachable!("never built"))
///     .alternative(|| IO::succeed(10));
///
/// assert_eq!(exp.into_io().run().await.unwrap(), 10);
/// # });
/// ```
pub struct IfElseExp<T> {
    predicate: IO<bool>,
    consequence: Option<Thunk<T>>,
    alternative: Option<Thunk<T>>,
    debugger: Option<EventBuilder<T>>,
}

impl<T> Clone for IfElseExp<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            consequence: self.consequence.clone(),
            alternative: self.alternative.clone(),
            debugger: self.debugger.clone(),
        }
    }
}

impl<T> fmt::Debug for IfElseExp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IfElseExp")
            .field("predicate", &self.predicate)
            .field("consequence", &self.consequence.is_some())
            .field("alternative", &self.alternative.is_some())
            .field("debugger", &self.debugger)
            .finish()
    }
}

impl<T: Send + 'static> IfElseExp<T> {
    /// Name used in instrumentation events.
    pub const NAME: &'static str = "IfElseExp";

    /// Start an if/else on `predicate`.
    pub fn predicate(predicate: IO<bool>) -> Self {
        Self {
            predicate,
            consequence: None,
            alternative: None,
            debugger: None,
        }
    }

    /// The branch taken when the predicate is `true`.
    pub fn consequence<F>(self, consequence: F) -> Self
    where
        F: Fn() -> IO<T> + Send + Sync + 'static,
    {
        Self {
            consequence: Some(Arc::new(consequence)),
            ..self
        }
    }

    /// The branch taken when the predicate is `false`.
    pub fn alternative<F>(self, alternative: F) -> Self
    where
        F: Fn() -> IO<T> + Send + Sync + 'static,
    {
        Self {
            alternative: Some(Arc::new(alternative)),
            ..self
        }
    }

    operand_retries!();

    fn with_retry(self, retry: OperandRetry) -> Self {
        Self {
            predicate: retry.apply(self.predicate),
            consequence: self.consequence.map(|branch| retry.apply_thunk(branch)),
            alternative: self.alternative.map(|branch| retry.apply_thunk(branch)),
            ..self
        }
    }
}

impl<T: fmt::Debug + Send + 'static> IfElseExp<T> {
    /// Report this expression through `builder`, and its parts under
    /// `name-predicate`, `name-consequence` and `name-alternative`.
    pub fn debug_each(self, builder: EventBuilder<T>) -> Self {
        let name = builder.name().to_string();
        Self {
            predicate: self
                .predicate
                .debug(builder.derive(format!("{}-predicate", name))),
            consequence: self.consequence.map(|branch| {
                debug_thunk(branch, builder.derive(format!("{}-consequence", name)))
            }),
            alternative: self.alternative.map(|branch| {
                debug_thunk(branch, builder.derive(format!("{}-alternative", name)))
            }),
            debugger: Some(builder),
        }
    }

    /// [`debug_each`](Self::debug_each) with the default builder named
    /// `IfElseExp`.
    pub fn debug_each_with_context(self, context: impl Into<String>) -> Self {
        self.debug_each(EventBuilder::new(Self::NAME, context))
    }
}

impl<T: Send + 'static> Exp for IfElseExp<T> {
    type Output = T;

    fn reduce(&self) -> BoxFuture<'static, Result<T>> {
        let predicate = self.predicate.clone();
        let consequence = self.consequence.clone();
        let alternative = self.alternative.clone();

        let reduction = async move {
            let (branch, label) = if predicate.run().await? {
                (consequence, "consequence")
            } else {
                (alternative, "alternative")
            };
            match branch {
                Some(branch) => branch().run().await,
                None => Err(Error::no_match(format!(
                    "IfElseExp has no {} branch",
                    label
                ))),
            }
        };
        observe(self.debugger.clone(), reduction)
    }
}
