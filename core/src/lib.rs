// src/lib.rs

//! Flowline: async step pipelines for multi-stage business workflows.
//!
//! A workflow is a [`Pipeline`] of named [`Step`]s run against a shared
//! [`FlowContext`]. Each step can carry:
//!  - `before`, `on` and `after` handlers, run in that order.
//!  - a skip condition evaluated against the context right before the step.
//!  - an optional flag, so a step without handlers is passed over instead of
//!    failing the run.
//!
//! Any handler may halt the run early with [`StepControl::Halt`]. Pipelines are
//! registered in a [`Workflows`] registry keyed by their context type, so
//! callers only need the context to start the matching workflow.

pub mod context;
pub mod control;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod step;

pub use crate::context::{FlowContext, Handler};
pub use crate::control::{FlowOutcome, StepControl};
pub use crate::error::{FlowError, FlowResult};
pub use crate::pipeline::Pipeline;
pub use crate::registry::Workflows;
pub use crate::step::{SkipIf, Step};
