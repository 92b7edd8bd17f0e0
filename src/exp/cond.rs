use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use super::{debug_thunk, evaluate, observe, operand_retries, Exp, OperandRetry, Strategy, Thunk};
use crate::debug::EventBuilder;
use crate::error::{Error, Result};
use crate::io::IO;

/// A chain of `(test, consequence)` clauses with a default.
///
/// The first clause whose test is `true` wins and only its consequence is
/// built and evaluated. If no test is `true` the `otherwise` branch runs; when
/// none was given the expression fails with
/// [`ErrorKind::NoMatch`](crate::ErrorKind::NoMatch).
///
/// The sequential form evaluates tests one by one and stops at the first
/// `true`. The parallel form evaluates every test concurrently, then picks
/// the first `true` in declaration order and runs that consequence alone.
///
/// ```
/// use eddy::exp::{CondExp, Exp};
/// use eddy::IO;
///
/// # tokio_test::block_on(async {
/// let tier = CondExp::seq()
///     .when(IO::succeed(false), || IO::succeed("gold"))
///     .when(IO::succeed(true), || IO::succeed("silver"))
///     .otherwise(|| IO::succeed("bronze"));
///
/// assert_eq!(tier.into_io().run().await.unwrap(), "silver");
/// # });
/// ```
pub struct CondExp<T> {
    strategy: Strategy,
    clauses: Vec<(IO<bool>, Thunk<T>)>,
    otherwise: Option<Thunk<T>>,
    debugger: Option<EventBuilder<T>>,
}

impl<T> Clone for CondExp<T> {
    fn clone(&self) -> Self {
        Self {
            strategy: self.strategy,
            clauses: self.clauses.clone(),
            otherwise: self.otherwise.clone(),
            debugger: self.debugger.clone(),
        }
    }
}

impl<T> fmt::Debug for CondExp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CondExp")
            .field("strategy", &self.strategy)
            .field("clauses", &self.clauses.len())
            .field("otherwise", &self.otherwise.is_some())
            .field("debugger", &self.debugger)
            .finish()
    }
}

impl<T: Send + 'static> CondExp<T> {
    /// Name used in instrumentation events.
    pub const NAME: &'static str = "CondExp";

    /// Clauses tested one at a time.
    pub fn seq() -> Self {
        Self::new(Strategy::Sequential)
    }

    /// Clauses whose tests run concurrently.
    pub fn par() -> Self {
        Self::new(Strategy::Parallel)
    }

    fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            clauses: Vec::new(),
            otherwise: None,
            debugger: None,
        }
    }

    /// Add a clause. `consequence` is only called if this clause wins.
    pub fn when<F>(mut self, test: IO<bool>, consequence: F) -> Self
    where
        F: Fn() -> IO<T> + Send + Sync + 'static,
    {
        self.clauses.push((test, Arc::new(consequence)));
        self
    }

    /// The branch taken when no test is `true`.
    pub fn otherwise<F>(self, default: F) -> Self
    where
        F: Fn() -> IO<T> + Send + Sync + 'static,
    {
        Self {
            otherwise: Some(Arc::new(default)),
            ..self
        }
    }

    /// The reduction strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    operand_retries!();

    fn with_retry(self, retry: OperandRetry) -> Self {
        Self {
            clauses: self
                .clauses
                .into_iter()
                .map(|(test, consequence)| (retry.apply(test), retry.apply_thunk(consequence)))
                .collect(),
            otherwise: self.otherwise.map(|default| retry.apply_thunk(default)),
            ..self
        }
    }
}

impl<T: fmt::Debug + Send + 'static> CondExp<T> {
    /// Report this expression through `builder`, each test under
    /// `name-test[i]`, each consequence under `name-consequence[i]` and the
    /// default under `name-otherwise`.
    pub fn debug_each(self, builder: EventBuilder<T>) -> Self {
        let name = builder.name().to_string();
        let clauses = self
            .clauses
            .into_iter()
            .enumerate()
            .map(|(i, (test, consequence))| {
                (
                    test.debug(builder.derive(format!("{}-test[{}]", name, i))),
                    debug_thunk(consequence, builder.derive(format!("{}-consequence[{}]", name, i))),
                )
            })
            .collect();
        let otherwise = self
            .otherwise
            .map(|default| debug_thunk(default, builder.derive(format!("{}-otherwise", name))));
        Self {
            clauses,
            otherwise,
            debugger: Some(builder),
            ..self
        }
    }

    /// [`debug_each`](Self::debug_each) with the default builder named
    /// `CondExp`.
    pub fn debug_each_with_context(self, context: impl Into<String>) -> Self {
        self.debug_each(EventBuilder::new(Self::NAME, context))
    }
}

fn no_clause_matched() -> Error {
    Error::no_match("no CondExp clause matched and no otherwise branch was set")
}

impl<T: Send + 'static> Exp for CondExp<T> {
    type Output = T;

    fn reduce(&self) -> BoxFuture<'static, Result<T>> {
        let (tests, consequences): (Vec<IO<bool>>, Vec<Thunk<T>>) =
            self.clauses.iter().cloned().unzip();
        let otherwise = self.otherwise.clone();
        let strategy = self.strategy;

        let reduction = async move {
            let chosen = match strategy {
                Strategy::Sequential => {
                    let mut chosen = None;
                    for (i, test) in tests.into_iter().enumerate() {
                        if test.run().await? {
                            chosen = Some(i);
                            break;
                        }
                    }
                    chosen
                }
                Strategy::Parallel => evaluate(Strategy::Parallel, tests)
                    .await?
                    .into_iter()
                    .position(|passed| passed),
            };

            match (chosen, otherwise) {
                (Some(i), _) => consequences[i]().run().await,
                (None, Some(default)) => default().run().await,
                (None, None) => Err(no_clause_matched()),
            }
        };
        observe(self.debugger.clone(), reduction)
    }
}
