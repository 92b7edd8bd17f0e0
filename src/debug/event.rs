//! The record emitted for every instrumented evaluation.

use std::fmt;
use std::time::{Duration, SystemTime};

/// Whether an instrumented evaluation succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome {
    /// The effect produced a value.
    Success,
    /// The effect failed.
    Failure,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("SUCCESS"),
            Outcome::Failure => f.write_str("FAILURE"),
        }
    }
}

/// One evaluation of an instrumented effect or expression.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    /// Name of the effect, suffixed with `[index]` or `[key]` for operands.
    pub name: String,
    /// Free-text context supplied by the caller.
    pub context: String,
    /// Success or failure.
    pub outcome: Outcome,
    /// The rendered value on success, the rendered cause on failure.
    pub rendered: String,
    /// How long the evaluation took.
    pub duration: Duration,
    /// When the evaluation finished.
    pub timestamp: SystemTime,
}

impl Event {
    /// True if the evaluation succeeded.
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} in {:?}: {}",
            self.name, self.outcome, self.duration, self.rendered
        )?;
        if !self.context.is_empty() {
            write!(f, " ({})", self.context)?;
        }
        Ok(())
    }
}
