// marketplace/src/models/mod.rs

//! Domain entities shared by the stores, pipelines and web layer.

pub mod cart;
pub mod checkout;
pub mod identity;
pub mod order;
pub mod product;
