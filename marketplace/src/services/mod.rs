// marketplace/src/services/mod.rs

pub mod badges;
pub mod events;
pub mod order_numbers;
pub mod pricing;
