// marketplace/src/pipelines/mod.rs

use flowline::Workflows;
use std::sync::Arc;
use tracing::info;

use crate::errors::AppError;

pub mod cart_pipeline;
pub mod checkout_pipeline;
pub mod contexts;

pub fn register_all_pipelines(workflows: &Arc<Workflows<AppError>>) {
  checkout_pipeline::register_checkout_pipeline(workflows);
  cart_pipeline::register_add_to_cart_pipeline(workflows);
  info!("All marketplace workflows registered.");
}
