// marketplace/src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::checkout::{Address, Currency, DeliveryMethod, DeliveryService, PaymentMethod};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  Pending,
  Confirmed,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub const ACTIVE: [OrderStatus; 4] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Processing,
    OrderStatus::Shipped,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Confirmed => "confirmed",
      OrderStatus::Processing => "processing",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    }
  }

  pub fn parse(raw: &str) -> Option<Self> {
    match raw {
      "pending" => Some(OrderStatus::Pending),
      "confirmed" => Some(OrderStatus::Confirmed),
      "processing" => Some(OrderStatus::Processing),
      "shipped" => Some(OrderStatus::Shipped),
      "delivered" => Some(OrderStatus::Delivered),
      "cancelled" => Some(OrderStatus::Cancelled),
      _ => None,
    }
  }

  pub fn is_active(&self) -> bool {
    Self::ACTIVE.contains(self)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
  pub status: OrderStatus,
  pub note: String,
  pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specification {
  pub name: String,
  pub value: String,
}

/// Snapshot of a purchased line. Never changes after the order is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
  pub product_id: Uuid,
  pub product_name: String,
  pub quantity: u32,
  pub unit_price: Decimal,
  pub total_price: Decimal,
  pub specifications: Vec<Specification>,
  pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingDetails {
  pub method: DeliveryMethod,
  pub service: Option<DeliveryService>,
  pub address: Option<Address>,
  pub estimated_delivery: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
  Pending,
  Paid,
  Failed,
}

/// Escrow account a `bank_transfer` buyer pays into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
  pub account_name: String,
  pub bank_name: String,
  pub account_number: String,
  pub swift_code: String,
  pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetails {
  pub method: PaymentMethod,
  pub status: PaymentStatus,
  pub bank_details: Option<BankDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
  pub id: Uuid,
  pub order_number: String,
  pub buyer_id: Uuid,
  pub seller_id: Uuid,
  pub items: Vec<OrderLineItem>,
  pub subtotal: Decimal,
  pub tax_amount: Decimal,
  pub shipping_cost: Decimal,
  pub total_amount: Decimal,
  pub currency: Currency,
  pub status: OrderStatus,
  pub status_history: Vec<StatusChange>,
  pub shipping: ShippingDetails,
  pub payment: PaymentDetails,
  pub special_instructions: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  pub fn involves(&self, company_id: Uuid) -> bool {
    self.buyer_id == company_id || self.seller_id == company_id
  }
}

/// What checkout reports back for each created order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
  pub order_number: String,
  pub seller_id: Uuid,
  pub subtotal: Decimal,
  pub tax_amount: Decimal,
  pub shipping_cost: Decimal,
  pub total_amount: Decimal,
  pub currency: Currency,
  pub status: OrderStatus,
  pub estimated_delivery: DateTime<Utc>,
}

impl From<&Order> for OrderSummary {
  fn from(order: &Order) -> Self {
    Self {
      order_number: order.order_number.clone(),
      seller_id: order.seller_id,
      subtotal: order.subtotal,
      tax_amount: order.tax_amount,
      shipping_cost: order.shipping_cost,
      total_amount: order.total_amount,
      currency: order.currency,
      status: order.status,
      estimated_delivery: order.shipping.estimated_delivery,
    }
  }
}
