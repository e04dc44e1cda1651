// src/pipeline/execution.rs

//! `Pipeline::run()`: walks the steps and drives their handlers.

use crate::context::{FlowContext, Handler};
use crate::control::{FlowOutcome, StepControl};
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, info_span, instrument, Instrument, Level};

impl<T, E> Pipeline<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step against `ctx`, in declaration order.
  ///
  /// For each step: the skip condition is checked first, then `before`, `on`
  /// and `after` handlers run sequentially. A required step with no handler at
  /// all fails the run with [`FlowError::HandlerMissing`]. The first handler
  /// error aborts the run and is returned as is.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      context_type = %std::any::type_name::<T>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx: FlowContext<T>) -> Result<FlowOutcome, E> {
    event!(Level::DEBUG, "Pipeline starting.");

    for (idx, step) in self.steps.iter().enumerate() {
      let name = step.name.as_str();
      let step_span = info_span!("step", step = name, index = idx, optional = step.optional);

      if step.should_skip(&ctx) {
        event!(parent: &step_span, Level::INFO, "Step skipped by its condition.");
        continue;
      }

      let phases: [(&str, Option<&Vec<Handler<T, E>>>); 3] = [
        ("before", self.before.get(name)),
        ("on", self.on.get(name)),
        ("after", self.after.get(name)),
      ];

      if phases.iter().all(|(_, handlers)| handlers.map_or(true, |h| h.is_empty())) {
        if step.optional {
          event!(parent: &step_span, Level::DEBUG, "Optional step has no handlers.");
          continue;
        }
        event!(parent: &step_span, Level::ERROR, "Required step has no handlers.");
        return Err(E::from(FlowError::HandlerMissing { step: step.name.clone() }));
      }

      for (phase, handlers) in phases {
        let Some(handlers) = handlers else { continue };
        let control = run_phase(handlers, &ctx, phase).instrument(step_span.clone()).await?;
        if control == StepControl::Halt {
          event!(parent: &step_span, Level::INFO, phase, "Pipeline halted by handler.");
          return Ok(FlowOutcome::Halted);
        }
      }
    }

    event!(Level::DEBUG, "Pipeline completed.");
    Ok(FlowOutcome::Completed)
  }
}

async fn run_phase<T, E>(handlers: &[Handler<T, E>], ctx: &FlowContext<T>, phase: &str) -> Result<StepControl, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error,
{
  for handler in handlers {
    match handler(ctx.clone()).await {
      Ok(StepControl::Continue) => {}
      Ok(StepControl::Halt) => return Ok(StepControl::Halt),
      Err(e) => {
        event!(Level::ERROR, phase, error = %e, "Handler failed.");
        return Err(e);
      }
    }
  }
  Ok(StepControl::Continue)
}
