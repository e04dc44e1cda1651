// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowline::{FlowContext, FlowOutcome};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

use marketplace::config::AppConfig;
use marketplace::errors::AppError;
use marketplace::models::cart::{Cart, CartLineItem, NewCartLine, Specifications};
use marketplace::models::checkout::{Address, CheckoutRequest, Currency};
use marketplace::models::identity::{CompanyType, Identity, Role};
use marketplace::models::order::Order;
use marketplace::models::product::Product;
use marketplace::pipelines::contexts::CheckoutCtxData;
use marketplace::services::events::{OrderEvent, OrderEventSink};
use marketplace::services::order_numbers::OrderNumberSource;
use marketplace::state::AppState;
use marketplace::store::{CartStore, MemoryStore, MessageStore, OrderStore, StoreError, StoreResult, Stores};

pub mod db;

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub fn company(company_type: CompanyType) -> Identity {
  Identity {
    company_id: Uuid::new_v4(),
    company_type,
    role: Role::Owner,
  }
}

pub fn product(seller_id: Uuid, name: &str, price: Decimal) -> Product {
  Product {
    id: Uuid::new_v4(),
    seller_id,
    name: name.to_string(),
    category: "Industrial".to_string(),
    price,
    currency: Currency::Usd,
    active: true,
  }
}

pub fn address() -> Address {
  Address {
    recipient: "Receiving Dock 4".into(),
    phone: "+1 555 0142".into(),
    line1: "1200 Harbor Way".into(),
    line2: None,
    city: "Oakland".into(),
    state: Some("CA".into()),
    postal_code: Some("94607".into()),
    country: "US".into(),
  }
}

pub fn pickup_request(item_ids: Vec<Uuid>) -> CheckoutRequest {
  CheckoutRequest {
    selected_item_ids: item_ids,
    delivery_method: "pickup".into(),
    payment_method: "cash_on_pickup".into(),
    ..Default::default()
  }
}

pub fn delivery_request(item_ids: Vec<Uuid>, service: &str) -> CheckoutRequest {
  CheckoutRequest {
    selected_item_ids: item_ids,
    delivery_method: "delivery".into(),
    delivery_service: Some(service.into()),
    payment_method: "bank_transfer".into(),
    delivery_address: Some(address()),
    ..Default::default()
  }
}

/// A buyer, two manufacturers and their catalog, backed by one `MemoryStore`.
pub struct Fixture {
  pub store: Arc<MemoryStore>,
  pub buyer: Identity,
  pub seller_a: Identity,
  pub seller_b: Identity,
  pub pump: Product,
  pub seal_kit: Product,
  pub belt: Product,
}

impl Fixture {
  pub fn new() -> Self {
    setup_tracing();
    let store = Arc::new(MemoryStore::new());
    let seller_a = company(CompanyType::Manufacturer);
    let seller_b = company(CompanyType::Manufacturer);

    let pump = product(seller_a.company_id, "Hydraulic pump", dec!(10.00));
    let seal_kit = product(seller_a.company_id, "Seal kit", dec!(5.00));
    let belt = product(seller_b.company_id, "Conveyor belt", dec!(7.50));
    for p in [&pump, &seal_kit, &belt] {
      store.put_product(p.clone());
    }

    Self {
      store,
      buyer: company(CompanyType::Distributor),
      seller_a,
      seller_b,
      pump,
      seal_kit,
      belt,
    }
  }

  pub fn stores(&self) -> Stores {
    Stores::from_backend(self.store.clone())
  }

  pub fn state(&self) -> AppState {
    AppState::new(AppConfig::default(), self.stores())
  }

  /// Puts a line straight into the buyer's cart, price captured.
  pub async fn add(&self, product: &Product, quantity: u32) -> CartLineItem {
    self.add_line(product, quantity, Some(product.price)).await
  }

  pub async fn add_line(&self, product: &Product, quantity: u32, unit_price: Option<Decimal>) -> CartLineItem {
    self
      .store
      .add_item(
        self.buyer.company_id,
        NewCartLine {
          product_id: product.id,
          seller_id: product.seller_id,
          product_name: product.name.clone(),
          quantity,
          unit_price,
          specifications: Specifications::new(),
          note: None,
        },
      )
      .await
      .unwrap()
  }

  /// 2 pumps + 1 seal kit from seller A (25.00), 4 belts from seller B (30.00).
  pub async fn fill_two_seller_cart(&self) -> Vec<Uuid> {
    vec![
      self.add(&self.pump, 2).await.id,
      self.add(&self.seal_kit, 1).await.id,
      self.add(&self.belt, 4).await.id,
    ]
  }

  pub async fn cart(&self) -> Cart {
    self
      .store
      .get_cart(self.buyer.company_id)
      .await
      .unwrap()
      .unwrap_or_else(|| Cart::empty(self.buyer.company_id))
  }
}

pub async fn run_checkout(
  state: &AppState,
  buyer: Identity,
  request: CheckoutRequest,
) -> (Result<FlowOutcome, AppError>, CheckoutCtxData) {
  let ctx = FlowContext::new(CheckoutCtxData::new(state.clone(), buyer, request));
  let result = state.workflows.run(ctx.clone()).await;
  (result, ctx.snapshot())
}

/// Hands out the given numbers in order, then falls back to unique ones.
#[derive(Default)]
pub struct ScriptedOrderNumbers {
  numbers: Mutex<VecDeque<String>>,
  issued: AtomicUsize,
}

impl ScriptedOrderNumbers {
  pub fn new(numbers: &[&str]) -> Self {
    Self {
      numbers: Mutex::new(numbers.iter().map(|n| n.to_string()).collect()),
      issued: AtomicUsize::new(0),
    }
  }

  pub fn issued(&self) -> usize {
    self.issued.load(Ordering::SeqCst)
  }
}

impl OrderNumberSource for ScriptedOrderNumbers {
  fn next_number(&self, _at: DateTime<Utc>) -> String {
    let n = self.issued.fetch_add(1, Ordering::SeqCst);
    self
      .numbers
      .lock()
      .pop_front()
      .unwrap_or_else(|| format!("ORD-TEST-{:04}", n))
  }
}

#[derive(Default)]
pub struct RecordingSink {
  pub events: Mutex<Vec<OrderEvent>>,
  pub fail: bool,
}

impl RecordingSink {
  pub fn failing() -> Self {
    Self {
      events: Mutex::new(Vec::new()),
      fail: true,
    }
  }
}

#[async_trait]
impl OrderEventSink for RecordingSink {
  async fn publish(&self, event: OrderEvent) -> anyhow::Result<()> {
    if self.fail {
      anyhow::bail!("message bus unavailable");
    }
    self.events.lock().push(event);
    Ok(())
  }
}

/// Order store whose `fail_on`-th insert (1-based) fails with a database error.
pub struct FlakyOrders {
  pub inner: Arc<MemoryStore>,
  pub fail_on: usize,
  inserts: AtomicUsize,
}

impl FlakyOrders {
  pub fn new(inner: Arc<MemoryStore>, fail_on: usize) -> Self {
    Self {
      inner,
      fail_on,
      inserts: AtomicUsize::new(0),
    }
  }
}

#[async_trait]
impl OrderStore for FlakyOrders {
  async fn insert_order(&self, order: &Order) -> StoreResult<()> {
    let n = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
    if n == self.fail_on {
      return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
    }
    self.inner.insert_order(order).await
  }

  async fn delete_order(&self, order_id: Uuid) -> StoreResult<()> {
    self.inner.delete_order(order_id).await
  }

  async fn get_by_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
    self.inner.get_by_number(order_number).await
  }

  async fn list_for_party(&self, company_id: Uuid, as_seller: bool) -> StoreResult<Vec<Order>> {
    self.inner.list_for_party(company_id, as_seller).await
  }

  async fn count_active(&self, company_id: Uuid, as_seller: bool) -> StoreResult<u64> {
    self.inner.count_active(company_id, as_seller).await
  }
}

/// Cart store where another session touches the cart right after every read.
pub struct RacingCarts {
  pub inner: Arc<MemoryStore>,
  pub intruder: Product,
}

#[async_trait]
impl CartStore for RacingCarts {
  async fn get_cart(&self, buyer_id: Uuid) -> StoreResult<Option<Cart>> {
    let cart = self.inner.get_cart(buyer_id).await?;
    self
      .inner
      .add_item(
        buyer_id,
        NewCartLine {
          product_id: self.intruder.id,
          seller_id: self.intruder.seller_id,
          product_name: self.intruder.name.clone(),
          quantity: 1,
          unit_price: Some(self.intruder.price),
          specifications: Specifications::new(),
          note: None,
        },
      )
      .await?;
    Ok(cart)
  }

  async fn add_item(&self, buyer_id: Uuid, line: NewCartLine) -> StoreResult<CartLineItem> {
    self.inner.add_item(buyer_id, line).await
  }

  async fn update_quantity(&self, buyer_id: Uuid, item_id: Uuid, quantity: u32) -> StoreResult<CartLineItem> {
    self.inner.update_quantity(buyer_id, item_id, quantity).await
  }

  async fn remove_item(&self, buyer_id: Uuid, item_id: Uuid) -> StoreResult<()> {
    self.inner.remove_item(buyer_id, item_id).await
  }

  async fn remove_items(&self, buyer_id: Uuid, item_ids: &[Uuid], expected_version: i64) -> StoreResult<Cart> {
    self.inner.remove_items(buyer_id, item_ids, expected_version).await
  }

  async fn item_count(&self, buyer_id: Uuid) -> StoreResult<u64> {
    self.inner.item_count(buyer_id).await
  }
}

/// Cart store whose bulk release fails. With `after_delete` the lines are removed first,
/// the way a backend can fail once its delete is already committed.
pub struct FailingRelease {
  pub inner: Arc<MemoryStore>,
  pub after_delete: bool,
}

#[async_trait]
impl CartStore for FailingRelease {
  async fn get_cart(&self, buyer_id: Uuid) -> StoreResult<Option<Cart>> {
    self.inner.get_cart(buyer_id).await
  }

  async fn add_item(&self, buyer_id: Uuid, line: NewCartLine) -> StoreResult<CartLineItem> {
    self.inner.add_item(buyer_id, line).await
  }

  async fn update_quantity(&self, buyer_id: Uuid, item_id: Uuid, quantity: u32) -> StoreResult<CartLineItem> {
    self.inner.update_quantity(buyer_id, item_id, quantity).await
  }

  async fn remove_item(&self, buyer_id: Uuid, item_id: Uuid) -> StoreResult<()> {
    self.inner.remove_item(buyer_id, item_id).await
  }

  async fn remove_items(&self, buyer_id: Uuid, item_ids: &[Uuid], expected_version: i64) -> StoreResult<Cart> {
    if self.after_delete {
      self.inner.remove_items(buyer_id, item_ids, expected_version).await?;
    }
    Err(StoreError::Database(sqlx::Error::PoolTimedOut))
  }

  async fn item_count(&self, buyer_id: Uuid) -> StoreResult<u64> {
    self.inner.item_count(buyer_id).await
  }
}

pub struct BrokenMessages;

#[async_trait]
impl MessageStore for BrokenMessages {
  async fn count_unread(&self, _company_id: Uuid) -> StoreResult<u64> {
    Err(StoreError::Database(sqlx::Error::PoolClosed))
  }
}
