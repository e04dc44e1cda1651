// tests/postgres_store_tests.rs
//
// Runs against a throwaway PostgreSQL container. Needs a Docker daemon:
// `cargo test -p marketplace --test postgres_store_tests -- --ignored`
mod common;

use common::db::fresh_pool;
use common::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use marketplace::config::AppConfig;
use marketplace::models::cart::{NewCartLine, Specifications, MAX_LINE_QUANTITY};
use marketplace::models::identity::CompanyType;
use marketplace::models::product::Product;
use marketplace::state::AppState;
use marketplace::store::{CartStore, CatalogStore, OrderStore, PgStore, StoreError, Stores};

fn line(product: &Product, quantity: u32, color: Option<&str>) -> NewCartLine {
  let mut specifications = Specifications::new();
  if let Some(color) = color {
    specifications.insert("color".into(), color.into());
  }
  NewCartLine {
    product_id: product.id,
    seller_id: product.seller_id,
    product_name: product.name.clone(),
    quantity,
    unit_price: Some(product.price),
    specifications,
    note: None,
  }
}

async fn insert_product(pool: &PgPool, product: &Product) {
  sqlx::query(
    "INSERT INTO products (id, seller_id, name, category, price, currency, active) VALUES ($1, $2, $3, $4, $5, $6, $7)",
  )
  .bind(product.id)
  .bind(product.seller_id)
  .bind(&product.name)
  .bind(&product.category)
  .bind(product.price)
  .bind(product.currency.as_str())
  .bind(product.active)
  .execute(pool)
  .await
  .unwrap();
}

#[tokio::test]
#[ignore = "needs Docker for the PostgreSQL container"]
async fn add_item_merges_on_equal_specifications() {
  setup_tracing();
  let store = PgStore::new(fresh_pool().await);
  let buyer = Uuid::new_v4();
  let belt = product(Uuid::new_v4(), "Conveyor belt", dec!(7.50));

  let first = store.add_item(buyer, line(&belt, 2, Some("navy"))).await.unwrap();
  let merged = store.add_item(buyer, line(&belt, 3, Some("navy"))).await.unwrap();
  let plain = store.add_item(buyer, line(&belt, 1, None)).await.unwrap();

  assert_eq!(first.id, merged.id);
  assert_eq!(merged.quantity, 5);
  assert_ne!(plain.id, first.id);

  let cart = store.get_cart(buyer).await.unwrap().unwrap();
  assert_eq!(cart.version, 3);
  let ids: Vec<_> = cart.items.iter().map(|i| i.id).collect();
  assert_eq!(ids, vec![first.id, plain.id]);
  assert_eq!(cart.items[0].specifications.get("color").map(String::as_str), Some("navy"));
  assert_eq!(cart.items[0].unit_price, Some(dec!(7.50)));
  assert_eq!(store.item_count(buyer).await.unwrap(), 2);
}

#[tokio::test]
#[ignore = "needs Docker for the PostgreSQL container"]
async fn merge_past_line_limit_leaves_cart_untouched() {
  setup_tracing();
  let store = PgStore::new(fresh_pool().await);
  let buyer = Uuid::new_v4();
  let pump = product(Uuid::new_v4(), "Hydraulic pump", dec!(10.00));

  let first = store.add_item(buyer, line(&pump, MAX_LINE_QUANTITY, None)).await.unwrap();
  let err = store.add_item(buyer, line(&pump, MAX_LINE_QUANTITY, None)).await.unwrap_err();

  assert!(matches!(
    err,
    StoreError::QuantityLimit { item_id, requested: 20_000, .. } if item_id == first.id
  ));
  let cart = store.get_cart(buyer).await.unwrap().unwrap();
  assert_eq!(cart.version, 1);
  assert_eq!(cart.items[0].quantity, MAX_LINE_QUANTITY);
}

#[tokio::test]
#[ignore = "needs Docker for the PostgreSQL container"]
async fn remove_items_requires_the_expected_version() {
  setup_tracing();
  let store = PgStore::new(fresh_pool().await);
  let buyer = Uuid::new_v4();
  let pump = product(Uuid::new_v4(), "Hydraulic pump", dec!(10.00));
  let seal_kit = product(pump.seller_id, "Seal kit", dec!(5.00));
  let belt = product(Uuid::new_v4(), "Conveyor belt", dec!(7.50));

  let a = store.add_item(buyer, line(&pump, 1, None)).await.unwrap();
  let b = store.add_item(buyer, line(&seal_kit, 1, None)).await.unwrap();
  let c = store.add_item(buyer, line(&belt, 1, None)).await.unwrap();

  let err = store.remove_items(buyer, &[a.id, b.id], 2).await.unwrap_err();
  assert!(matches!(err, StoreError::VersionConflict { expected: 2, actual: 3 }));
  assert_eq!(store.item_count(buyer).await.unwrap(), 3);

  let cart = store.remove_items(buyer, &[a.id, b.id], 3).await.unwrap();
  assert_eq!(cart.version, 4);
  assert_eq!(cart.items.len(), 1);
  assert_eq!(cart.items[0].id, c.id);
  assert_eq!(store.get_cart(buyer).await.unwrap(), Some(cart));

  assert!(matches!(
    store.remove_items(Uuid::new_v4(), &[c.id], 0).await,
    Err(StoreError::NotFound("cart"))
  ));
}

#[tokio::test]
#[ignore = "needs Docker for the PostgreSQL container"]
async fn catalog_hides_inactive_products() {
  setup_tracing();
  let pool = fresh_pool().await;
  let store = PgStore::new(pool.clone());
  let live = product(Uuid::new_v4(), "Hydraulic pump", dec!(10.00));
  let retired = Product {
    active: false,
    ..product(live.seller_id, "Old pump", dec!(8.00))
  };
  insert_product(&pool, &live).await;
  insert_product(&pool, &retired).await;

  assert_eq!(store.get_product(live.id).await.unwrap(), Some(live));
  assert_eq!(store.get_product(retired.id).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "needs Docker for the PostgreSQL container"]
async fn checkout_persists_orders_and_rejects_taken_numbers() {
  setup_tracing();
  let pool = fresh_pool().await;
  let store = Arc::new(PgStore::new(pool.clone()));
  let buyer = company(CompanyType::Distributor);
  let seller_a = company(CompanyType::Manufacturer);
  let seller_b = company(CompanyType::Manufacturer);
  let pump = product(seller_a.company_id, "Hydraulic pump", dec!(10.00));
  let seal_kit = product(seller_a.company_id, "Seal kit", dec!(5.00));
  let belt = product(seller_b.company_id, "Conveyor belt", dec!(7.50));
  for p in [&pump, &seal_kit, &belt] {
    insert_product(&pool, p).await;
  }
  let ids = vec![
    store.add_item(buyer.company_id, line(&pump, 2, None)).await.unwrap().id,
    store.add_item(buyer.company_id, line(&seal_kit, 1, None)).await.unwrap().id,
    store.add_item(buyer.company_id, line(&belt, 4, None)).await.unwrap().id,
  ];
  let state = AppState::new(AppConfig::default(), Stores::from_backend(store.clone()));

  let (result, ctx) = run_checkout(&state, buyer, pickup_request(ids)).await;

  assert!(result.is_ok(), "{:?}", result);
  let mut totals: Vec<Decimal> = ctx.created_orders.iter().map(|o| o.total_amount).collect();
  totals.sort();
  assert_eq!(totals, vec![dec!(27.50), dec!(33.00)]);
  assert!(store.get_cart(buyer.company_id).await.unwrap().unwrap().items.is_empty());

  let placed = &ctx.created_orders[0];
  let stored = store.get_by_number(&placed.order_number).await.unwrap().unwrap();
  assert_eq!(stored.id, placed.id);
  assert_eq!(stored.items, placed.items);
  assert_eq!(stored.total_amount, placed.total_amount);
  assert_eq!(stored.status, placed.status);

  assert_eq!(store.list_for_party(buyer.company_id, false).await.unwrap().len(), 2);
  assert_eq!(store.list_for_party(seller_a.company_id, true).await.unwrap().len(), 1);
  assert_eq!(store.count_active(seller_b.company_id, true).await.unwrap(), 1);
  assert_eq!(store.count_active(buyer.company_id, true).await.unwrap(), 0);

  let copy = marketplace::models::order::Order {
    id: Uuid::new_v4(),
    ..placed.clone()
  };
  let err = store.insert_order(&copy).await.unwrap_err();
  assert!(matches!(err, StoreError::DuplicateOrderNumber(ref n) if *n == placed.order_number));

  store.delete_order(placed.id).await.unwrap();
  assert!(store.get_by_number(&placed.order_number).await.unwrap().is_none());
  assert!(matches!(store.delete_order(placed.id).await, Err(StoreError::NotFound("order"))));
}
