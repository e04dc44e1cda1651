// marketplace/src/web/handlers/mod.rs

pub mod badge_handlers;
pub mod cart_handlers;
pub mod checkout_handlers;
pub mod order_handlers;
