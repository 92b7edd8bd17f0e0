//! Destinations for instrumentation events.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use super::event::{Event, Outcome};

/// A write-only consumer of [`Event`]s.
///
/// `emit` is called at most once per instrumented evaluation, on the task
/// that evaluated the effect. A sink cannot change the reported result: if it
/// panics, the panic is logged and dropped.
///
/// Any `Fn(&Event) + Send + Sync` closure is a sink.
pub trait EventSink: Send + Sync {
    /// Consume one event.
    fn emit(&self, event: &Event);
}

impl<F> EventSink for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn emit(&self, event: &Event) {
        self(event)
    }
}

/// The default sink: one `tracing` event per evaluation.
///
/// Successes are logged at `INFO`, failures at `WARN`, both under the
/// `eddy::event` target with the event's fields as structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &Event) {
        match event.outcome {
            Outcome::Success => tracing::info!(
                target: "eddy::event",
                name = %event.name,
                context = %event.context,
                outcome = %event.outcome,
                duration = ?event.duration,
                output = %event.rendered,
                "evaluated"
            ),
            Outcome::Failure => tracing::warn!(
                target: "eddy::event",
                name = %event.name,
                context = %event.context,
                outcome = %event.outcome,
                duration = ?event.duration,
                cause = %event.rendered,
                "evaluated"
            ),
        }
    }
}

/// Keeps every event in memory. Meant for tests.
///
/// Clones share the same buffer.
///
/// ```
/// use eddy::debug::{EventBuilder, RecordingSink};
/// use eddy::IO;
///
/// # tokio_test::block_on(async {
/// let sink = RecordingSink::new();
/// let builder = EventBuilder::new("lookup", "user 7").with_sink(sink.clone());
///
/// IO::succeed(7).debug(builder).run().await.unwrap();
///
/// let events = sink.events();
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].name, "lookup");
/// assert_eq!(events[0].rendered, "7");
/// # });
/// ```
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Names of the recorded events, in emission order.
    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.name).collect()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl fmt::Debug for RecordingSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingSink")
            .field("events", &self.events().len())
            .finish()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod sink_tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tracing_test::traced_test;

    fn event(outcome: Outcome, rendered: &str) -> Event {
        Event {
            name: "lookup".to_string(),
            context: "user 7".to_string(),
            outcome,
            rendered: rendered.to_string(),
            duration: Duration::from_millis(3),
            timestamp: SystemTime::now(),
        }
    }

    #[traced_test]
    #[test]
    fn test_tracing_sink_logs_success_and_failure() {
        TracingSink.emit(&event(Outcome::Success, "found"));
        TracingSink.emit(&event(Outcome::Failure, "not found"));

        assert!(logs_contain("name=lookup"));
        assert!(logs_contain("output=found"));
        assert!(logs_contain("cause=not found"));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    #[test]
    fn test_tracing_sink_levels_and_target() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            TracingSink.emit(&event(Outcome::Success, "found"));
            TracingSink.emit(&event(Outcome::Failure, "not found"));
        });

        let lines = captured.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("INFO"));
        assert!(lines[0].contains("eddy::event"));
        assert!(lines[0].contains("context=user 7"));
        assert!(lines[1].contains("WARN"));
        assert!(lines[1].contains("eddy::event"));
        assert!(lines[1].contains("cause=not found"));
    }

    #[test]
    fn test_closure_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |event: &Event| seen.lock().unwrap().push(event.rendered.clone())
        };

        sink.emit(&event(Outcome::Success, "a"));
        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn test_recording_sink_clear() {
        let sink = RecordingSink::new();
        sink.emit(&event(Outcome::Success, "a"));
        let shared = sink.clone();
        assert_eq!(shared.events().len(), 1);

        shared.clear();
        assert!(sink.events().is_empty());
    }
}
