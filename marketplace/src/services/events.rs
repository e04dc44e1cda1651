// marketplace/src/services/events.rs

//! Order notifications handed to the messaging side after checkout.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::models::checkout::Currency;
use crate::models::order::Order;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
  OrderPlaced {
    order_number: String,
    buyer_id: Uuid,
    seller_id: Uuid,
    total_amount: Decimal,
    currency: Currency,
  },
}

impl From<&Order> for OrderEvent {
  fn from(order: &Order) -> Self {
    OrderEvent::OrderPlaced {
      order_number: order.order_number.clone(),
      buyer_id: order.buyer_id,
      seller_id: order.seller_id,
      total_amount: order.total_amount,
      currency: order.currency,
    }
  }
}

#[async_trait]
pub trait OrderEventSink: Send + Sync {
  async fn publish(&self, event: OrderEvent) -> anyhow::Result<()>;
}

/// Writes events to the log. Stands in until a message bus is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

#[async_trait]
impl OrderEventSink for LogEventSink {
  async fn publish(&self, event: OrderEvent) -> anyhow::Result<()> {
    let payload = serde_json::to_string(&event)?;
    info!(target: "marketplace::events", %payload, "Order event published.");
    Ok(())
  }
}
