// src/registry.rs

//! `Workflows<E>`: pipelines keyed by the type of context they run on.

use crate::context::FlowContext;
use crate::control::FlowOutcome;
use crate::error::FlowError;
use crate::pipeline::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, Level};

#[async_trait]
trait ErasedRunner<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  /// `ctx` must hold a `FlowContext<T>` for the runner's `T`.
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<FlowOutcome, AppErr>;
}

struct TypedRunner<T, HandlerErr>
where
  T: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: Pipeline<T, HandlerErr>,
}

#[async_trait]
impl<T, HandlerErr, AppErr> ErasedRunner<AppErr> for TypedRunner<T, HandlerErr>
where
  T: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<HandlerErr> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<FlowOutcome, AppErr> {
    let ctx = match ctx.downcast::<FlowContext<T>>() {
      Ok(ctx) => *ctx,
      Err(_) => {
        let expected = std::any::type_name::<FlowContext<T>>();
        event!(Level::ERROR, expected, "Context type mismatch in registry dispatch.");
        return Err(AppErr::from(FlowError::TypeMismatch {
          expected: expected.to_string(),
        }));
      }
    };
    self.pipeline.run(ctx).await.map_err(AppErr::from)
  }
}

/// Registry of workflows, one per context type.
///
/// `AppErr` is what [`Workflows::run`] returns; it absorbs both the handler
/// errors of every registered pipeline and the registry's own [`FlowError`]s.
pub struct Workflows<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  runners: RwLock<HashMap<TypeId, Arc<dyn ErasedRunner<AppErr>>>>,
  _app_err: PhantomData<AppErr>,
}

impl<AppErr> Workflows<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      runners: RwLock::new(HashMap::new()),
      _app_err: PhantomData,
    }
  }

  /// Registers `pipeline` for context type `T`, replacing any earlier one.
  pub fn register<T, HandlerErr>(&self, pipeline: Pipeline<T, HandlerErr>)
  where
    T: 'static + Send + Sync,
    HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<HandlerErr>,
  {
    event!(Level::DEBUG, context_type = %std::any::type_name::<T>(), steps = ?pipeline.step_names(), "Registering workflow.");
    let runner: Arc<dyn ErasedRunner<AppErr>> = Arc::new(TypedRunner { pipeline });
    self.runners.write().insert(TypeId::of::<T>(), runner);
  }

  pub fn is_registered<T: 'static + Send + Sync>(&self) -> bool {
    self.runners.read().contains_key(&TypeId::of::<T>())
  }

  /// Runs the workflow registered for `T` against `ctx`.
  pub async fn run<T>(&self, ctx: FlowContext<T>) -> Result<FlowOutcome, AppErr>
  where
    T: 'static + Send + Sync,
  {
    let runner = self.runners.read().get(&TypeId::of::<T>()).cloned();
    let runner = runner.ok_or_else(|| {
      let context_type = std::any::type_name::<T>();
      event!(Level::ERROR, context_type, "No workflow registered.");
      AppErr::from(FlowError::NotRegistered {
        context_type: context_type.to_string(),
      })
    })?;

    runner.run_erased(Box::new(ctx)).await
  }
}

impl<AppErr> Default for Workflows<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
