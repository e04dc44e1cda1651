// marketplace/src/lib.rs

//! B2B marketplace backend: carts, multi-seller checkout and order reads.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
