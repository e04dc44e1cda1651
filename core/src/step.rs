// src/step.rs

use crate::context::FlowContext;
use std::fmt;
use std::sync::Arc;

/// Predicate checked right before a step runs. `true` skips the step.
pub type SkipIf<T> = Arc<dyn Fn(&T) -> bool + Send + Sync + 'static>;

/// A named stage of a pipeline.
#[derive(Clone)]
pub struct Step<T: 'static + Send + Sync> {
  pub name: String,
  pub optional: bool,
  pub skip_if: Option<SkipIf<T>>,
}

impl<T: 'static + Send + Sync> Step<T> {
  /// A step that must have at least one handler when the pipeline runs.
  pub fn required(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      optional: false,
      skip_if: None,
    }
  }

  /// A step that is passed over when no handler is attached.
  pub fn optional(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      optional: true,
      skip_if: None,
    }
  }

  pub fn skip_when(mut self, condition: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
    self.skip_if = Some(Arc::new(condition));
    self
  }

  pub(crate) fn should_skip(&self, ctx: &FlowContext<T>) -> bool {
    match &self.skip_if {
      // The read guard is released before the step's handlers run.
      Some(condition) => condition(&ctx.read()),
      None => false,
    }
  }
}

impl<T: 'static + Send + Sync> fmt::Debug for Step<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Step")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("has_skip_condition", &self.skip_if.is_some())
      .finish()
  }
}
