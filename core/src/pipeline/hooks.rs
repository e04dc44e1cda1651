// src/pipeline/hooks.rs

//! Registration of `before`, `on` and `after` handlers.

use crate::context::{FlowContext, Handler};
use crate::control::StepControl;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use std::collections::HashMap;
use std::future::Future;

impl<T, E> Pipeline<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Attaches a handler that runs before the step's `on` handlers.
  ///
  /// The handler may fail with any error convertible into the pipeline's `E`.
  pub fn before<F, HandlerErr>(&mut self, step: &str, handler_fn: impl Fn(FlowContext<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<StepControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step);
    push_handler(&mut self.before, step, wrap(handler_fn));
  }

  /// Attaches the main handler of a step.
  pub fn on<F, HandlerErr>(&mut self, step: &str, handler_fn: impl Fn(FlowContext<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<StepControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step);
    push_handler(&mut self.on, step, wrap(handler_fn));
  }

  pub fn after<F, HandlerErr>(&mut self, step: &str, handler_fn: impl Fn(FlowContext<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<StepControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step);
    push_handler(&mut self.after, step, wrap(handler_fn));
  }
}

fn wrap<T, E, F, HandlerErr>(handler_fn: impl Fn(FlowContext<T>) -> F + Send + Sync + 'static) -> Handler<T, E>
where
  T: 'static + Send + Sync,
  E: Send + 'static,
  F: Future<Output = Result<StepControl, HandlerErr>> + Send + 'static,
  HandlerErr: Into<E> + Send + Sync + 'static,
{
  Box::new(move |ctx| {
    let fut = handler_fn(ctx);
    Box::pin(async move { fut.await.map_err(Into::into) })
  })
}

fn push_handler<T, E>(phase: &mut HashMap<String, Vec<Handler<T, E>>>, step: &str, handler: Handler<T, E>)
where
  T: 'static + Send + Sync,
{
  phase.entry(step.to_string()).or_default().push(handler);
}
