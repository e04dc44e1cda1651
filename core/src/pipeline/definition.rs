// src/pipeline/definition.rs

//! The `Pipeline<T, E>` type and its structural API.

use crate::context::Handler;
use crate::error::FlowError;
use crate::step::Step;
use std::collections::HashMap;

/// An ordered list of steps plus the handlers attached to them.
///
/// `T` is the context data the handlers share. `E` is the error every handler
/// resolves to; it must absorb [`FlowError`] so configuration failures found
/// while running (a required step without handlers) surface through the same
/// channel.
pub struct Pipeline<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<Step<T>>,
  pub(crate) before: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) on: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) after: HashMap<String, Vec<Handler<T, E>>>,
}

impl<T, E> Pipeline<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Builds a pipeline from its steps, in execution order.
  ///
  /// Panics when two steps share a name: that is a wiring bug, not a runtime
  /// condition.
  pub fn new(steps: Vec<Step<T>>) -> Self {
    let mut pipeline = Self {
      steps: Vec::with_capacity(steps.len()),
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    };
    for step in steps {
      if let Err(err) = pipeline.push_step(step) {
        panic!("Pipeline setup error: {}", err);
      }
    }
    pipeline
  }

  /// Appends a step after the existing ones.
  pub fn push_step(&mut self, step: Step<T>) -> Result<(), FlowError> {
    if self.contains_step(&step.name) {
      return Err(FlowError::DuplicateStep { step: step.name });
    }
    self.steps.push(step);
    Ok(())
  }

  /// Inserts a step right after `existing`.
  pub fn insert_after(&mut self, existing: &str, step: Step<T>) -> Result<(), FlowError> {
    let idx = self.position(existing)?;
    if self.contains_step(&step.name) {
      return Err(FlowError::DuplicateStep { step: step.name });
    }
    self.steps.insert(idx + 1, step);
    Ok(())
  }

  /// Removes a step together with all of its handlers.
  pub fn remove_step(&mut self, name: &str) -> Result<(), FlowError> {
    let idx = self.position(name)?;
    self.steps.remove(idx);
    self.before.remove(name);
    self.on.remove(name);
    self.after.remove(name);
    Ok(())
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn contains_step(&self, name: &str) -> bool {
    self.steps.iter().any(|s| s.name == name)
  }

  fn position(&self, name: &str) -> Result<usize, FlowError> {
    self
      .steps
      .iter()
      .position(|s| s.name == name)
      .ok_or_else(|| FlowError::StepNotFound { step: name.to_string() })
  }

  /// Panics on an unknown step name. Used by hook registration.
  pub(crate) fn ensure_step_exists(&self, name: &str) {
    if !self.contains_step(name) {
      panic!("Pipeline setup error: step '{}' is not declared.", name);
    }
  }
}
