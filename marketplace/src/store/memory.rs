// marketplace/src/store/memory.rs

//! Process-local backend with the same semantics as the PostgreSQL one.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use super::{CartStore, CatalogStore, FavoriteStore, MessageStore, OrderStore, StoreError, StoreResult};
use crate::models::cart::{Cart, CartLineItem, NewCartLine, MAX_LINE_QUANTITY};
use crate::models::order::Order;
use crate::models::product::Product;

#[derive(Debug, Default)]
pub struct MemoryStore {
  carts: RwLock<HashMap<Uuid, Cart>>,
  products: RwLock<HashMap<Uuid, Product>>,
  // Insertion order, so listing newest-first is a reverse walk.
  orders: RwLock<Vec<Order>>,
  unread_messages: RwLock<HashMap<Uuid, u64>>,
  favorites: RwLock<HashMap<Uuid, u64>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn put_product(&self, product: Product) {
    self.products.write().insert(product.id, product);
  }

  pub fn set_unread_messages(&self, company_id: Uuid, count: u64) {
    self.unread_messages.write().insert(company_id, count);
  }

  pub fn set_favorites(&self, company_id: Uuid, count: u64) {
    self.favorites.write().insert(company_id, count);
  }

  pub fn all_orders(&self) -> Vec<Order> {
    self.orders.read().clone()
  }
}

#[async_trait]
impl CartStore for MemoryStore {
  async fn get_cart(&self, buyer_id: Uuid) -> StoreResult<Option<Cart>> {
    Ok(self.carts.read().get(&buyer_id).cloned())
  }

  async fn add_item(&self, buyer_id: Uuid, line: NewCartLine) -> StoreResult<CartLineItem> {
    let mut carts = self.carts.write();
    let cart = carts.entry(buyer_id).or_insert_with(|| Cart::empty(buyer_id));
    let merge_at = cart.items.iter().position(|item| line.merges_with(item));
    if let Some(idx) = merge_at {
      let existing = &cart.items[idx];
      let requested = u64::from(existing.quantity) + u64::from(line.quantity);
      if requested > u64::from(MAX_LINE_QUANTITY) {
        return Err(StoreError::QuantityLimit {
          item_id: existing.id,
          requested,
          limit: MAX_LINE_QUANTITY,
        });
      }
    }

    let now = Utc::now();
    cart.version += 1;
    cart.updated_at = now;

    if let Some(idx) = merge_at {
      let existing = &mut cart.items[idx];
      existing.quantity += line.quantity;
      if line.unit_price.is_some() {
        existing.unit_price = line.unit_price;
      }
      if line.note.is_some() {
        existing.note = line.note;
      }
      return Ok(existing.clone());
    }

    let item = CartLineItem {
      id: Uuid::new_v4(),
      product_id: line.product_id,
      seller_id: line.seller_id,
      product_name: line.product_name,
      quantity: line.quantity,
      unit_price: line.unit_price,
      specifications: line.specifications,
      note: line.note,
      added_at: now,
    };
    cart.items.push(item.clone());
    Ok(item)
  }

  async fn update_quantity(&self, buyer_id: Uuid, item_id: Uuid, quantity: u32) -> StoreResult<CartLineItem> {
    let mut carts = self.carts.write();
    let cart = carts.get_mut(&buyer_id).ok_or(StoreError::NotFound("cart"))?;
    let item = cart
      .items
      .iter_mut()
      .find(|i| i.id == item_id)
      .ok_or(StoreError::NotFound("cart item"))?;
    item.quantity = quantity;
    let updated = item.clone();
    cart.version += 1;
    cart.updated_at = Utc::now();
    Ok(updated)
  }

  async fn remove_item(&self, buyer_id: Uuid, item_id: Uuid) -> StoreResult<()> {
    let mut carts = self.carts.write();
    let cart = carts.get_mut(&buyer_id).ok_or(StoreError::NotFound("cart"))?;
    let before = cart.items.len();
    cart.items.retain(|i| i.id != item_id);
    if cart.items.len() == before {
      return Err(StoreError::NotFound("cart item"));
    }
    cart.version += 1;
    cart.updated_at = Utc::now();
    Ok(())
  }

  async fn remove_items(&self, buyer_id: Uuid, item_ids: &[Uuid], expected_version: i64) -> StoreResult<Cart> {
    let mut carts = self.carts.write();
    let cart = carts.get_mut(&buyer_id).ok_or(StoreError::NotFound("cart"))?;
    if cart.version != expected_version {
      return Err(StoreError::VersionConflict {
        expected: expected_version,
        actual: cart.version,
      });
    }
    cart.items.retain(|i| !item_ids.contains(&i.id));
    cart.version += 1;
    cart.updated_at = Utc::now();
    Ok(cart.clone())
  }

  async fn item_count(&self, buyer_id: Uuid) -> StoreResult<u64> {
    Ok(self.carts.read().get(&buyer_id).map_or(0, |c| c.items.len() as u64))
  }
}

#[async_trait]
impl CatalogStore for MemoryStore {
  async fn get_product(&self, product_id: Uuid) -> StoreResult<Option<Product>> {
    Ok(self.products.read().get(&product_id).filter(|p| p.active).cloned())
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn insert_order(&self, order: &Order) -> StoreResult<()> {
    let mut orders = self.orders.write();
    if orders.iter().any(|o| o.order_number == order.order_number) {
      return Err(StoreError::DuplicateOrderNumber(order.order_number.clone()));
    }
    orders.push(order.clone());
    Ok(())
  }

  async fn delete_order(&self, order_id: Uuid) -> StoreResult<()> {
    let mut orders = self.orders.write();
    let before = orders.len();
    orders.retain(|o| o.id != order_id);
    if orders.len() == before {
      return Err(StoreError::NotFound("order"));
    }
    Ok(())
  }

  async fn get_by_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
    Ok(self.orders.read().iter().find(|o| o.order_number == order_number).cloned())
  }

  async fn list_for_party(&self, company_id: Uuid, as_seller: bool) -> StoreResult<Vec<Order>> {
    let orders = self.orders.read();
    Ok(
      orders
        .iter()
        .rev()
        .filter(|o| party_of(o, as_seller) == company_id)
        .cloned()
        .collect(),
    )
  }

  async fn count_active(&self, company_id: Uuid, as_seller: bool) -> StoreResult<u64> {
    let orders = self.orders.read();
    Ok(
      orders
        .iter()
        .filter(|o| party_of(o, as_seller) == company_id && o.status.is_active())
        .count() as u64,
    )
  }
}

fn party_of(order: &Order, as_seller: bool) -> Uuid {
  if as_seller {
    order.seller_id
  } else {
    order.buyer_id
  }
}

#[async_trait]
impl MessageStore for MemoryStore {
  async fn count_unread(&self, company_id: Uuid) -> StoreResult<u64> {
    Ok(self.unread_messages.read().get(&company_id).copied().unwrap_or(0))
  }
}

#[async_trait]
impl FavoriteStore for MemoryStore {
  async fn count_favorites(&self, company_id: Uuid) -> StoreResult<u64> {
    Ok(self.favorites.read().get(&company_id).copied().unwrap_or(0))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::cart::Specifications;
  use rust_decimal_macros::dec;

  fn new_line(product_id: Uuid, color: &str) -> NewCartLine {
    let mut specifications = Specifications::new();
    specifications.insert("color".into(), color.into());
    NewCartLine {
      product_id,
      seller_id: Uuid::new_v4(),
      product_name: "Pallet wrap".into(),
      quantity: 2,
      unit_price: Some(dec!(4.20)),
      specifications,
      note: None,
    }
  }

  #[tokio::test]
  async fn add_item_merges_same_product_and_specs() {
    let store = MemoryStore::new();
    let buyer = Uuid::new_v4();
    let product = Uuid::new_v4();

    let first = store.add_item(buyer, new_line(product, "clear")).await.unwrap();
    let merged = store.add_item(buyer, new_line(product, "clear")).await.unwrap();
    store.add_item(buyer, new_line(product, "black")).await.unwrap();

    assert_eq!(first.id, merged.id);
    assert_eq!(merged.quantity, 4);
    let cart = store.get_cart(buyer).await.unwrap().unwrap();
    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.version, 3);
  }

  #[tokio::test]
  async fn merge_past_line_limit_is_rejected() {
    let store = MemoryStore::new();
    let buyer = Uuid::new_v4();
    let product = Uuid::new_v4();
    let mut line = new_line(product, "clear");
    line.quantity = MAX_LINE_QUANTITY;

    let first = store.add_item(buyer, line.clone()).await.unwrap();
    line.quantity = 1;
    let err = store.add_item(buyer, line).await.unwrap_err();

    assert!(matches!(
      err,
      StoreError::QuantityLimit { item_id, requested: 10_001, limit: MAX_LINE_QUANTITY } if item_id == first.id
    ));
    let cart = store.get_cart(buyer).await.unwrap().unwrap();
    assert_eq!(cart.items[0].quantity, MAX_LINE_QUANTITY);
    assert_eq!(cart.version, 1);
  }

  #[tokio::test]
  async fn remove_items_checks_version() {
    let store = MemoryStore::new();
    let buyer = Uuid::new_v4();
    let item = store.add_item(buyer, new_line(Uuid::new_v4(), "clear")).await.unwrap();

    let err = store.remove_items(buyer, &[item.id], 0).await.unwrap_err();
    assert!(matches!(err, StoreError::VersionConflict { expected: 0, actual: 1 }));

    let cart = store.remove_items(buyer, &[item.id], 1).await.unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(cart.version, 2);
  }

  #[tokio::test]
  async fn missing_cart_lines_are_not_found() {
    let store = MemoryStore::new();
    let buyer = Uuid::new_v4();
    assert!(matches!(
      store.remove_item(buyer, Uuid::new_v4()).await,
      Err(StoreError::NotFound("cart"))
    ));
    store.add_item(buyer, new_line(Uuid::new_v4(), "clear")).await.unwrap();
    assert!(matches!(
      store.update_quantity(buyer, Uuid::new_v4(), 3).await,
      Err(StoreError::NotFound("cart item"))
    ));
  }
}
