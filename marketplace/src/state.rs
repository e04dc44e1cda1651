// marketplace/src/state.rs

use flowline::Workflows;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::services::events::{LogEventSink, OrderEventSink};
use crate::services::order_numbers::{OrderNumberSource, RandomOrderNumbers};
use crate::store::Stores;

/// Shared by every request handler and every workflow context.
#[derive(Clone)]
pub struct AppState {
  pub stores: Stores,
  pub workflows: Arc<Workflows<AppError>>,
  pub config: Arc<AppConfig>,
  pub order_numbers: Arc<dyn OrderNumberSource>,
  pub events: Arc<dyn OrderEventSink>,
}

impl AppState {
  /// Builds the state and registers every workflow the application runs.
  pub fn new(config: AppConfig, stores: Stores) -> Self {
    let workflows = Arc::new(Workflows::<AppError>::new());
    pipelines::register_all_pipelines(&workflows);

    Self {
      stores,
      workflows,
      config: Arc::new(config),
      order_numbers: Arc::new(RandomOrderNumbers),
      events: Arc::new(LogEventSink),
    }
  }

  pub fn with_order_numbers(mut self, source: Arc<dyn OrderNumberSource>) -> Self {
    self.order_numbers = source;
    self
  }

  pub fn with_events(mut self, sink: Arc<dyn OrderEventSink>) -> Self {
    self.events = sink;
    self
  }
}
