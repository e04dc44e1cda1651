// tests/common/mod.rs
#![allow(dead_code)]

use flowline::{FlowContext, FlowError, StepControl};
use once_cell::sync::Lazy;
use tracing::Level;

#[derive(Clone, Debug, Default)]
pub struct TallyContext {
  pub counter: i32,
  pub trail: String,
  pub steps_executed: Vec<String>,
  pub halt_at: Option<String>,
  pub pickup: bool,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  // FlowError is neither Clone nor Eq, keep its debug form.
  #[error("Flow error: {0}")]
  Flow(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(err: FlowError) -> Self {
    TestError::Flow(format!("{:?}", err))
  }
}

pub fn tally_handler(step: &'static str, mark: &'static str) -> flowline::Handler<TallyContext, TestError> {
  Box::new(move |ctx: FlowContext<TallyContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.trail.push_str(mark);
      guard.steps_executed.push(step.to_string());
      tracing::debug!(target: "test_handlers", step, counter = guard.counter, "tally");
      if guard.halt_at.as_deref() == Some(step) {
        return Ok(StepControl::Halt);
      }
      Ok(StepControl::Continue)
    })
  })
}

pub fn failing_handler(step: &'static str, message: &'static str) -> flowline::Handler<TallyContext, TestError> {
  Box::new(move |ctx: FlowContext<TallyContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
