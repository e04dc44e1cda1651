// src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step}")]
  StepNotFound { step: String },

  #[error("Step '{step}' is declared twice")]
  DuplicateStep { step: String },

  #[error("Handler missing for required step: {step}")]
  HandlerMissing { step: String },

  #[error("No workflow registered for context type {context_type}")]
  NotRegistered { context_type: String },

  #[error("Context type mismatch (expected {expected})")]
  TypeMismatch { expected: String },

  #[error("Step handler failed. Source: {source}")]
  Handler {
    #[source]
    source: AnyhowError,
  },
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::Handler { source: err }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
