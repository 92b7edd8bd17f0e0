//! Instrumentation: report every evaluation of an effect as an [`Event`].
//!
//! [`IO::debug`] wraps a single effect. Expressions also offer `debug_each`,
//! which instruments the expression and every one of its operands under a
//! derived name (`ListExp[0]`, `JsObjExp[user]`, `CondExp-test[1]`, ...).
//! Instrumentation never changes what is evaluated, in which order, or the
//! result.
//!
//! Events go to an [`EventSink`]. The default, [`TracingSink`], turns them
//! into `tracing` events; [`RecordingSink`] collects them for tests.
//!
//! # Example
//!
//! ```
//! use eddy::debug::{EventBuilder, Outcome, RecordingSink};
//! use eddy::IO;
//!
//! # tokio_test::block_on(async {
//! let sink = RecordingSink::new();
//! let builder = EventBuilder::<i32>::new("quota", "tenant acme")
//!     .with_success_output(|v| format!("{} left", v))
//!     .with_sink(sink.clone());
//!
//! let result = IO::succeed(12).debug(builder).run().await;
//! assert_eq!(result.unwrap(), 12);
//!
//! let event = &sink.events()[0];
//! assert_eq!(event.outcome, Outcome::Success);
//! assert_eq!(event.rendered, "12 left");
//! assert_eq!(event.context, "tenant acme");
//! # });
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use futures::future::FutureExt;

use crate::causes;
use crate::error::{Error, Result};
use crate::io::{catch_sync, IO};

mod event;
mod sink;

pub use event::{Event, Outcome};
pub use sink::{EventSink, RecordingSink, TracingSink};

type Render<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Describes how to report evaluations of one effect.
///
/// Builders are values: every `with_*` method returns a new builder.
pub struct EventBuilder<T> {
    name: String,
    context: String,
    success_output: Render<T>,
    failure_output: Render<Error>,
    sink: Arc<dyn EventSink>,
}

impl<T> Clone for EventBuilder<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            context: self.context.clone(),
            success_output: Arc::clone(&self.success_output),
            failure_output: Arc::clone(&self.failure_output),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<T> fmt::Debug for EventBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBuilder")
            .field("name", &self.name)
            .field("context", &self.context)
            .field("success_output", &"<function>")
            .field("failure_output", &"<function>")
            .field("sink", &"<sink>")
            .finish()
    }
}

impl<T: fmt::Debug> EventBuilder<T> {
    /// A builder that renders values with `Debug`, failures with their cause
    /// chain, and reports to [`TracingSink`].
    pub fn new(name: impl Into<String>, context: impl Into<String>) -> Self {
        Self::with_renderer(name, context, |value: &T| format!("{:?}", value))
    }
}

impl<T> EventBuilder<T> {
    /// A builder for a value type without `Debug`, rendered by `render`.
    pub fn with_renderer<F>(name: impl Into<String>, context: impl Into<String>, render: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            context: context.into(),
            success_output: Arc::new(render),
            failure_output: Arc::new(|error: &Error| causes::describe(error)),
            sink: Arc::new(TracingSink),
        }
    }

    /// Render successful values with `render`.
    pub fn with_success_output<F>(self, render: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            success_output: Arc::new(render),
            ..self
        }
    }

    /// Render failures with `render`.
    pub fn with_failure_output<F>(self, render: F) -> Self
    where
        F: Fn(&Error) -> String + Send + Sync + 'static,
    {
        Self {
            failure_output: Arc::new(render),
            ..self
        }
    }

    /// Send events to `sink` instead of the tracing sink.
    pub fn with_sink(self, sink: impl EventSink + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
            ..self
        }
    }

    /// The name reported in events.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The context reported in events.
    pub fn context(&self) -> &str {
        &self.context
    }

    /// A builder for an operand of this expression: same context, sink and
    /// failure renderer, its own name and a `Debug` value renderer.
    pub(crate) fn derive<U: fmt::Debug>(&self, name: impl Into<String>) -> EventBuilder<U> {
        EventBuilder {
            name: name.into(),
            context: self.context.clone(),
            success_output: Arc::new(|value: &U| format!("{:?}", value)),
            failure_output: Arc::clone(&self.failure_output),
            sink: Arc::clone(&self.sink),
        }
    }

    /// Render `result` and hand the event to the sink. Renderer and sink
    /// panics are logged and dropped.
    pub(crate) fn report(&self, result: &Result<T>, started: Instant) {
        let duration = started.elapsed();
        let (outcome, rendered) = match result {
            Ok(value) => (Outcome::Success, catch_sync(|| (self.success_output)(value))),
            Err(error) => (Outcome::Failure, catch_sync(|| (self.failure_output)(error))),
        };
        let rendered = rendered.unwrap_or_else(|panic| {
            tracing::warn!(name = %self.name, error = %panic, "event renderer panicked");
            String::from("<render failed>")
        });

        let event = Event {
            name: self.name.clone(),
            context: self.context.clone(),
            outcome,
            rendered,
            duration,
            timestamp: SystemTime::now(),
        };
        if let Err(panic) = catch_sync(|| self.sink.emit(&event)) {
            tracing::warn!(name = %self.name, error = %panic, "event sink panicked");
        }
    }
}

/// Wrap `io` so that every run is timed and reported through `builder`.
pub(crate) fn instrument<T: Send + 'static>(io: IO<T>, builder: EventBuilder<T>) -> IO<T> {
    let builder = Arc::new(builder);
    IO::from_boxed(move || {
        let io = io.clone();
        let builder = Arc::clone(&builder);
        async move {
            let started = Instant::now();
            let result = io.run().await;
            builder.report(&result, started);
            result
        }
        .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_failure_is_reported_with_cause() {
        let sink = RecordingSink::new();
        let builder = EventBuilder::<i32>::new("fetch", "").with_sink(sink.clone());

        let result = IO::<i32>::fail("connection refused").debug(builder).run().await;
        assert_eq!(result.unwrap_err().message(), "connection refused");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, Outcome::Failure);
        assert_eq!(events[0].rendered, "connection refused");
    }

    #[tokio::test]
    async fn test_one_event_per_run() {
        let sink = RecordingSink::new();
        let effect = IO::succeed(1).debug(EventBuilder::new("tick", "").with_sink(sink.clone()));

        effect.run().await.unwrap();
        effect.run().await.unwrap();
        assert_eq!(sink.names(), vec!["tick", "tick"]);
    }

    #[tokio::test]
    async fn test_panicking_sink_does_not_change_result() {
        let builder = EventBuilder::new("explosive", "")
            .with_sink(|_: &Event| panic!("sink exploded"));
        let result = IO::succeed("kept").debug(builder).run().await;
        assert_eq!(result.unwrap(), "kept");
    }

    #[tokio::test]
    async fn test_panicking_renderer_is_replaced() {
        let sink = RecordingSink::new();
        let builder = EventBuilder::<i32>::new("render", "")
            .with_success_output(|_| panic!("no render"))
            .with_sink(sink.clone());

        assert_eq!(IO::succeed(5).debug(builder).run().await.unwrap(), 5);
        assert_eq!(sink.events()[0].rendered, "<render failed>");
    }

    #[tokio::test]
    async fn test_custom_failure_output() {
        let sink = RecordingSink::new();
        let builder = EventBuilder::<()>::new("kinded", "ctx")
            .with_failure_output(|e| e.kind().to_string())
            .with_sink(sink.clone());

        let _ = IO::<()>::fail(Error::timeout(std::time::Duration::from_secs(1)))
            .debug(builder)
            .run()
            .await;
        assert_eq!(sink.events()[0].rendered, ErrorKind::Timeout.to_string());
    }

    #[test]
    fn test_derive_keeps_context_and_sink() {
        let sink = RecordingSink::new();
        let parent = EventBuilder::<bool>::new("AllExp", "checks").with_sink(sink.clone());
        let child: EventBuilder<bool> = parent.derive("AllExp[0]");

        assert_eq!(child.name(), "AllExp[0]");
        assert_eq!(child.context(), "checks");
        child.report(&Ok(true), Instant::now());
        assert_eq!(sink.names(), vec!["AllExp[0]"]);
    }
}
