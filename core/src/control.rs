// src/control.rs

//! Flow signals returned by handlers and the outcome of a whole run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
  /// Keep executing the current step's remaining handlers and the steps after it.
  Continue,
  /// Halt the pipeline right now. Nothing else in this run executes.
  Halt,
}

/// Outcome of a pipeline run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
  /// Every step ran or was legitimately skipped.
  Completed,
  /// A handler returned [`StepControl::Halt`].
  Halted,
}
