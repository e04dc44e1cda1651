// marketplace/src/store/mod.rs

//! Persistence seams. Each concern is a trait so checkout can run against
//! PostgreSQL in production and the in-memory store in tests.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::cart::{Cart, CartLineItem, NewCartLine};
use crate::models::order::Order;
use crate::models::product::Product;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("{0} not found")]
  NotFound(&'static str),

  #[error("cart version conflict (expected {expected}, found {actual})")]
  VersionConflict { expected: i64, actual: i64 },

  #[error("merging would raise cart line {item_id} to {requested} (limit {limit})")]
  QuantityLimit { item_id: Uuid, requested: u64, limit: u32 },

  #[error("order number '{0}' already exists")]
  DuplicateOrderNumber(String),

  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CartStore: Send + Sync {
  async fn get_cart(&self, buyer_id: Uuid) -> StoreResult<Option<Cart>>;

  /// Adds a line, or raises the quantity of the line with the same product and specifications.
  /// A merge that would pass [`MAX_LINE_QUANTITY`](crate::models::cart::MAX_LINE_QUANTITY) fails with [`StoreError::QuantityLimit`]
  /// and leaves the cart untouched.
  async fn add_item(&self, buyer_id: Uuid, line: NewCartLine) -> StoreResult<CartLineItem>;

  async fn update_quantity(&self, buyer_id: Uuid, item_id: Uuid, quantity: u32) -> StoreResult<CartLineItem>;

  async fn remove_item(&self, buyer_id: Uuid, item_id: Uuid) -> StoreResult<()>;

  /// Removes `item_ids` in one update, only if the cart is still at `expected_version`.
  async fn remove_items(&self, buyer_id: Uuid, item_ids: &[Uuid], expected_version: i64) -> StoreResult<Cart>;

  async fn item_count(&self, buyer_id: Uuid) -> StoreResult<u64>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
  async fn get_product(&self, product_id: Uuid) -> StoreResult<Option<Product>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Fails with [`StoreError::DuplicateOrderNumber`] when the number is taken.
  async fn insert_order(&self, order: &Order) -> StoreResult<()>;

  async fn delete_order(&self, order_id: Uuid) -> StoreResult<()>;

  async fn get_by_number(&self, order_number: &str) -> StoreResult<Option<Order>>;

  /// Newest first. `as_seller` selects which side of the order `company_id` is on.
  async fn list_for_party(&self, company_id: Uuid, as_seller: bool) -> StoreResult<Vec<Order>>;

  async fn count_active(&self, company_id: Uuid, as_seller: bool) -> StoreResult<u64>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
  async fn count_unread(&self, company_id: Uuid) -> StoreResult<u64>;
}

#[async_trait]
pub trait FavoriteStore: Send + Sync {
  async fn count_favorites(&self, company_id: Uuid) -> StoreResult<u64>;
}

/// The store handles the application works with.
#[derive(Clone)]
pub struct Stores {
  pub carts: Arc<dyn CartStore>,
  pub catalog: Arc<dyn CatalogStore>,
  pub orders: Arc<dyn OrderStore>,
  pub messages: Arc<dyn MessageStore>,
  pub favorites: Arc<dyn FavoriteStore>,
}

impl Stores {
  pub fn from_backend<S>(backend: Arc<S>) -> Self
  where
    S: CartStore + CatalogStore + OrderStore + MessageStore + FavoriteStore + 'static,
  {
    Self {
      carts: backend.clone(),
      catalog: backend.clone(),
      orders: backend.clone(),
      messages: backend.clone(),
      favorites: backend,
    }
  }
}
