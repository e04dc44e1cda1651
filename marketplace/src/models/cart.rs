// marketplace/src/models/cart.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Custom product options chosen by the buyer, e.g. `{"color": "navy"}`.
pub type Specifications = BTreeMap<String, String>;

/// Upper bound for a single cart line, merged lines included.
pub const MAX_LINE_QUANTITY: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
  pub id: Uuid,
  pub product_id: Uuid,
  pub seller_id: Uuid,
  pub product_name: String,
  pub quantity: u32,
  /// `None` when no price was captured at add time; checkout falls back to the catalog.
  pub unit_price: Option<Decimal>,
  pub specifications: Specifications,
  pub note: Option<String>,
  pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
  pub buyer_id: Uuid,
  pub items: Vec<CartLineItem>,
  /// Bumped on every mutation.
  pub version: i64,
  pub updated_at: DateTime<Utc>,
}

impl Cart {
  pub fn empty(buyer_id: Uuid) -> Self {
    Self {
      buyer_id,
      items: Vec::new(),
      version: 0,
      updated_at: Utc::now(),
    }
  }
}

/// What the cart store needs to add or merge a line.
#[derive(Debug, Clone)]
pub struct NewCartLine {
  pub product_id: Uuid,
  pub seller_id: Uuid,
  pub product_name: String,
  pub quantity: u32,
  pub unit_price: Option<Decimal>,
  pub specifications: Specifications,
  pub note: Option<String>,
}

impl NewCartLine {
  pub fn merges_with(&self, line: &CartLineItem) -> bool {
    line.product_id == self.product_id && line.specifications == self.specifications
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddCartItemRequest {
  pub product_id: Uuid,
  pub quantity: i64,
  #[serde(default)]
  pub specifications: Specifications,
  #[serde(default)]
  pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCartItemRequest {
  pub quantity: i64,
}
