use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use super::{observe, operand_retries, Exp, OperandRetry};
use crate::debug::EventBuilder;
use crate::error::{Error, Result};
use crate::io::IO;

type Guard<I> = Arc<dyn Fn(&I) -> bool + Send + Sync>;
type Branch<I, O> = Arc<dyn Fn(I) -> IO<O> + Send + Sync>;

/// Multi-way branch on the value of a subject effect.
///
/// The subject is evaluated once. Cases are tested in declaration order and
/// the first match's branch receives the value. With no match the
/// `otherwise` branch runs; without one the expression fails with
/// [`ErrorKind::NoMatch`](crate::ErrorKind::NoMatch).
///
/// There is no parallel form: the cases need the subject's value.
///
/// ```
/// use eddy::exp::{Exp, SwitchExp};
/// use eddy::IO;
///
/// # tokio_test::block_on(async {
/// let exp = SwitchExp::eval(IO::succeed(404))
///     .match_value(200, |_| IO::succeed("ok"))
///     .match_when(|code: &i32| *code >= 500, |_| IO::succeed("server error"))
///     .match_any([401, 403, 404], |_| IO::succeed("client error"))
///     .otherwise(|_| IO::succeed("unknown"));
///
/// assert_eq!(exp.into_io().run().await.unwrap(), "client error");
/// # });
/// ```
pub struct SwitchExp<I, O> {
    subject: IO<I>,
    cases: Vec<(Guard<I>, Branch<I, O>)>,
    otherwise: Option<Branch<I, O>>,
    debugger: Option<EventBuilder<O>>,
}

impl<I, O> Clone for SwitchExp<I, O> {
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
            cases: self.cases.clone(),
            otherwise: self.otherwise.clone(),
            debugger: self.debugger.clone(),
        }
    }
}

impl<I, O> fmt::Debug for SwitchExp<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchExp")
            .field("subject", &self.subject)
            .field("cases", &self.cases.len())
            .field("otherwise", &self.otherwise.is_some())
            .field("debugger", &self.debugger)
            .finish()
    }
}

impl<I, O> SwitchExp<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Name used in instrumentation events.
    pub const NAME: &'static str = "SwitchExp";

    /// Start a switch on the value of `subject`.
    pub fn eval(subject: IO<I>) -> Self {
        Self {
            subject,
            cases: Vec::new(),
            otherwise: None,
            debugger: None,
        }
    }

    /// Add a case matching values for which `guard` holds.
    pub fn match_when<G, F>(mut self, guard: G, branch: F) -> Self
    where
        G: Fn(&I) -> bool + Send + Sync + 'static,
        F: Fn(I) -> IO<O> + Send + Sync + 'static,
    {
        self.cases.push((Arc::new(guard), Arc::new(branch)));
        self
    }

    /// Add a case matching values equal to `value`.
    pub fn match_value<F>(self, value: I, branch: F) -> Self
    where
        I: PartialEq + Sync,
        F: Fn(I) -> IO<O> + Send + Sync + 'static,
    {
        self.match_when(move |subject: &I| *subject == value, branch)
    }

    /// Add a case matching any of `values`.
    pub fn match_any<F>(self, values: impl IntoIterator<Item = I>, branch: F) -> Self
    where
        I: PartialEq + Sync,
        F: Fn(I) -> IO<O> + Send + Sync + 'static,
    {
        let values: Vec<I> = values.into_iter().collect();
        self.match_when(move |subject: &I| values.contains(subject), branch)
    }

    /// The branch taken when no case matches.
    pub fn otherwise<F>(self, branch: F) -> Self
    where
        F: Fn(I) -> IO<O> + Send + Sync + 'static,
    {
        Self {
            otherwise: Some(Arc::new(branch)),
            ..self
        }
    }

    operand_retries!();

    fn with_retry(self, retry: OperandRetry) -> Self {
        let wrap = |branch: Branch<I, O>| -> Branch<I, O> {
            let retry = retry.clone();
            Arc::new(move |value: I| retry.apply(branch(value)))
        };
        Self {
            subject: retry.apply(self.subject),
            cases: self
                .cases
                .into_iter()
                .map(|(guard, branch)| (guard, wrap(branch)))
                .collect(),
            otherwise: self.otherwise.map(wrap),
            ..self
        }
    }
}

impl<I, O> SwitchExp<I, O>
where
    I: fmt::Debug + Send + 'static,
    O: fmt::Debug + Send + 'static,
{
    /// Report this expression through `builder`, the subject under
    /// `name-eval`, each case's branch under `name-branch[i]` and the default
    /// under `name-otherwise`.
    pub fn debug_each(self, builder: EventBuilder<O>) -> Self {
        let name = builder.name().to_string();
        let instrument = |branch: Branch<I, O>, child: EventBuilder<O>| -> Branch<I, O> {
            Arc::new(move |value: I| branch(value).debug(child.clone()))
        };
        let cases = self
            .cases
            .into_iter()
            .enumerate()
            .map(|(i, (guard, branch))| {
                let child = builder.derive(format!("{}-branch[{}]", name, i));
                (guard, instrument(branch, child))
            })
            .collect();
        let otherwise = self
            .otherwise
            .map(|branch| instrument(branch, builder.derive(format!("{}-otherwise", name))));
        Self {
            subject: self.subject.debug(builder.derive(format!("{}-eval", name))),
            cases,
            otherwise,
            debugger: Some(builder),
        }
    }

    /// [`debug_each`](Self::debug_each) with the default builder named
    /// `SwitchExp`.
    pub fn debug_each_with_context(self, context: impl Into<String>) -> Self {
        self.debug_each(EventBuilder::new(Self::NAME, context))
    }
}

impl<I, O> Exp for SwitchExp<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    type Output = O;

    fn reduce(&self) -> BoxFuture<'static, Result<O>> {
        let subject = self.subject.clone();
        let cases = self.cases.clone();
        let otherwise = self.otherwise.clone();

        let reduction = async move {
            let value = subject.run().await?;
            let branch = cases
                .iter()
                .find(|(guard, _)| guard(&value))
                .map(|(_, branch)| Arc::clone(branch))
                .or(otherwise);
            match branch {
                Some(branch) => branch(value).run().await,
                None => Err(Error::no_match("no SwitchExp case matched and no otherwise branch was set")),
            }
        };
        observe(self.debugger.clone(), reduction)
    }
}
