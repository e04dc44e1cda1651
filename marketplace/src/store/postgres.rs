// marketplace/src/store/postgres.rs

//! PostgreSQL backend. Schema lives in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnection, PgPool, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use super::{CartStore, CatalogStore, FavoriteStore, MessageStore, OrderStore, StoreError, StoreResult};
use crate::models::cart::{Cart, CartLineItem, NewCartLine, Specifications, MAX_LINE_QUANTITY};
use crate::models::checkout::Currency;
use crate::models::order::{Order, OrderLineItem, OrderStatus, PaymentDetails, ShippingDetails, StatusChange};
use crate::models::product::Product;

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

const CART_ITEM_COLUMNS: &str =
  "id, product_id, seller_id, product_name, quantity, unit_price, specifications, note, added_at";

const ORDER_COLUMNS: &str = "id, order_number, buyer_id, seller_id, items, subtotal, tax_amount, shipping_cost, \
   total_amount, currency, status, status_history, shipping, payment, special_instructions, created_at, updated_at";

fn decode_error(column: &str, detail: impl std::fmt::Display) -> StoreError {
  StoreError::Database(sqlx::Error::ColumnDecode {
    index: column.to_string(),
    source: detail.to_string().into(),
  })
}

fn cart_item_from_row(row: &PgRow) -> StoreResult<CartLineItem> {
  let quantity: i32 = row.try_get("quantity")?;
  let specifications: Json<Specifications> = row.try_get("specifications")?;
  Ok(CartLineItem {
    id: row.try_get("id")?,
    product_id: row.try_get("product_id")?,
    seller_id: row.try_get("seller_id")?,
    product_name: row.try_get("product_name")?,
    quantity: u32::try_from(quantity).map_err(|e| decode_error("quantity", e))?,
    unit_price: row.try_get("unit_price")?,
    specifications: specifications.0,
    note: row.try_get("note")?,
    added_at: row.try_get("added_at")?,
  })
}

fn order_from_row(row: &PgRow) -> StoreResult<Order> {
  let currency: String = row.try_get("currency")?;
  let status: String = row.try_get("status")?;
  let items: Json<Vec<OrderLineItem>> = row.try_get("items")?;
  let history: Json<Vec<StatusChange>> = row.try_get("status_history")?;
  let shipping: Json<ShippingDetails> = row.try_get("shipping")?;
  let payment: Json<PaymentDetails> = row.try_get("payment")?;

  Ok(Order {
    id: row.try_get("id")?,
    order_number: row.try_get("order_number")?,
    buyer_id: row.try_get("buyer_id")?,
    seller_id: row.try_get("seller_id")?,
    items: items.0,
    subtotal: row.try_get("subtotal")?,
    tax_amount: row.try_get("tax_amount")?,
    shipping_cost: row.try_get("shipping_cost")?,
    total_amount: row.try_get("total_amount")?,
    currency: currency.parse::<Currency>().map_err(|e| decode_error("currency", e))?,
    status: OrderStatus::parse(&status).ok_or_else(|| decode_error("status", &status))?,
    status_history: history.0,
    shipping: shipping.0,
    payment: payment.0,
    special_instructions: row.try_get("special_instructions")?,
    created_at: row.try_get("created_at")?,
    updated_at: row.try_get("updated_at")?,
  })
}

fn party_column(as_seller: bool) -> &'static str {
  if as_seller {
    "seller_id"
  } else {
    "buyer_id"
  }
}

/// Bumps the cart version, creating the cart row on first use.
async fn touch_cart(tx: &mut Transaction<'_, Postgres>, buyer_id: Uuid, now: DateTime<Utc>) -> StoreResult<()> {
  sqlx::query(
    "INSERT INTO carts (buyer_id, version, updated_at) VALUES ($1, 1, $2) \
     ON CONFLICT (buyer_id) DO UPDATE SET version = carts.version + 1, updated_at = EXCLUDED.updated_at",
  )
  .bind(buyer_id)
  .bind(now)
  .execute(&mut **tx)
  .await?;
  Ok(())
}

async fn bump_existing_cart(tx: &mut Transaction<'_, Postgres>, buyer_id: Uuid) -> StoreResult<()> {
  let updated = sqlx::query("UPDATE carts SET version = version + 1, updated_at = now() WHERE buyer_id = $1")
    .bind(buyer_id)
    .execute(&mut **tx)
    .await?;
  if updated.rows_affected() == 0 {
    return Err(StoreError::NotFound("cart"));
  }
  Ok(())
}

async fn fetch_cart(conn: &mut PgConnection, buyer_id: Uuid) -> StoreResult<Option<Cart>> {
  let Some(cart_row) = sqlx::query("SELECT version, updated_at FROM carts WHERE buyer_id = $1")
    .bind(buyer_id)
    .fetch_optional(&mut *conn)
    .await?
  else {
    return Ok(None);
  };

  let rows = sqlx::query(&format!(
    "SELECT {} FROM cart_items WHERE buyer_id = $1 ORDER BY position",
    CART_ITEM_COLUMNS
  ))
  .bind(buyer_id)
  .fetch_all(&mut *conn)
  .await?;

  Ok(Some(Cart {
    buyer_id,
    items: rows.iter().map(cart_item_from_row).collect::<StoreResult<_>>()?,
    version: cart_row.try_get("version")?,
    updated_at: cart_row.try_get("updated_at")?,
  }))
}

#[async_trait]
impl CartStore for PgStore {
  #[instrument(name = "PgStore::get_cart", skip(self))]
  async fn get_cart(&self, buyer_id: Uuid) -> StoreResult<Option<Cart>> {
    let mut conn = self.pool.acquire().await?;
    fetch_cart(&mut *conn, buyer_id).await
  }

  #[instrument(name = "PgStore::add_item", skip(self, line), fields(product_id = %line.product_id))]
  async fn add_item(&self, buyer_id: Uuid, line: NewCartLine) -> StoreResult<CartLineItem> {
    let now = Utc::now();
    let quantity = i32::try_from(line.quantity).map_err(|e| decode_error("quantity", e))?;
    let mut tx = self.pool.begin().await?;
    touch_cart(&mut tx, buyer_id, now).await?;

    // Serialized by the cart row lock taken in `touch_cart`.
    let existing = sqlx::query(
      "SELECT id, quantity FROM cart_items WHERE buyer_id = $1 AND product_id = $2 AND specifications = $3",
    )
    .bind(buyer_id)
    .bind(line.product_id)
    .bind(Json(&line.specifications))
    .fetch_optional(&mut *tx)
    .await?;

    let row = match existing {
      Some(found) => {
        let item_id: Uuid = found.try_get("id")?;
        let current: i32 = found.try_get("quantity")?;
        let requested = i64::from(current) + i64::from(quantity);
        if requested > i64::from(MAX_LINE_QUANTITY) {
          return Err(StoreError::QuantityLimit {
            item_id,
            requested: requested.max(0) as u64,
            limit: MAX_LINE_QUANTITY,
          });
        }
        sqlx::query(&format!(
          "UPDATE cart_items SET quantity = $2, unit_price = COALESCE($3, unit_price), note = COALESCE($4, note) \
           WHERE id = $1 RETURNING {}",
          CART_ITEM_COLUMNS
        ))
        .bind(item_id)
        .bind(requested as i32)
        .bind(line.unit_price)
        .bind(&line.note)
        .fetch_one(&mut *tx)
        .await?
      }
      None => {
        sqlx::query(&format!(
          "INSERT INTO cart_items (id, buyer_id, product_id, seller_id, product_name, quantity, unit_price, \
           specifications, note, added_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
          CART_ITEM_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(buyer_id)
        .bind(line.product_id)
        .bind(line.seller_id)
        .bind(&line.product_name)
        .bind(quantity)
        .bind(line.unit_price)
        .bind(Json(&line.specifications))
        .bind(&line.note)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?
      }
    };

    let item = cart_item_from_row(&row)?;
    tx.commit().await?;
    Ok(item)
  }

  #[instrument(name = "PgStore::update_quantity", skip(self))]
  async fn update_quantity(&self, buyer_id: Uuid, item_id: Uuid, quantity: u32) -> StoreResult<CartLineItem> {
    let quantity = i32::try_from(quantity).map_err(|e| decode_error("quantity", e))?;
    let mut tx = self.pool.begin().await?;
    bump_existing_cart(&mut tx, buyer_id).await?;
    let row = sqlx::query(&format!(
      "UPDATE cart_items SET quantity = $3 WHERE buyer_id = $1 AND id = $2 RETURNING {}",
      CART_ITEM_COLUMNS
    ))
    .bind(buyer_id)
    .bind(item_id)
    .bind(quantity)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(StoreError::NotFound("cart item"))?;
    let item = cart_item_from_row(&row)?;
    tx.commit().await?;
    Ok(item)
  }

  #[instrument(name = "PgStore::remove_item", skip(self))]
  async fn remove_item(&self, buyer_id: Uuid, item_id: Uuid) -> StoreResult<()> {
    let mut tx = self.pool.begin().await?;
    bump_existing_cart(&mut tx, buyer_id).await?;
    let deleted = sqlx::query("DELETE FROM cart_items WHERE buyer_id = $1 AND id = $2")
      .bind(buyer_id)
      .bind(item_id)
      .execute(&mut *tx)
      .await?;
    if deleted.rows_affected() == 0 {
      return Err(StoreError::NotFound("cart item"));
    }
    tx.commit().await?;
    Ok(())
  }

  #[instrument(name = "PgStore::remove_items", skip(self, item_ids), fields(count = item_ids.len()))]
  async fn remove_items(&self, buyer_id: Uuid, item_ids: &[Uuid], expected_version: i64) -> StoreResult<Cart> {
    let mut tx = self.pool.begin().await?;
    let bumped = sqlx::query(
      "UPDATE carts SET version = version + 1, updated_at = now() WHERE buyer_id = $1 AND version = $2",
    )
    .bind(buyer_id)
    .bind(expected_version)
    .execute(&mut *tx)
    .await?;

    if bumped.rows_affected() == 0 {
      let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM carts WHERE buyer_id = $1")
        .bind(buyer_id)
        .fetch_optional(&mut *tx)
        .await?;
      return Err(match actual {
        Some(actual) => StoreError::VersionConflict {
          expected: expected_version,
          actual,
        },
        None => StoreError::NotFound("cart"),
      });
    }

    sqlx::query("DELETE FROM cart_items WHERE buyer_id = $1 AND id = ANY($2)")
      .bind(buyer_id)
      .bind(item_ids)
      .execute(&mut *tx)
      .await?;

    // Read back before committing: once the delete is durable this call must not fail.
    let cart = fetch_cart(&mut *tx, buyer_id).await?.ok_or(StoreError::NotFound("cart"))?;
    tx.commit().await?;
    Ok(cart)
  }

  async fn item_count(&self, buyer_id: Uuid) -> StoreResult<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE buyer_id = $1")
      .bind(buyer_id)
      .fetch_one(&self.pool)
      .await?;
    Ok(count.max(0) as u64)
  }
}

#[async_trait]
impl CatalogStore for PgStore {
  #[instrument(name = "PgStore::get_product", skip(self))]
  async fn get_product(&self, product_id: Uuid) -> StoreResult<Option<Product>> {
    let row = sqlx::query(
      "SELECT id, seller_id, name, category, price, currency, active FROM products WHERE id = $1 AND active",
    )
    .bind(product_id)
    .fetch_optional(&self.pool)
    .await?;

    let Some(row) = row else { return Ok(None) };
    let currency: String = row.try_get("currency")?;
    let price: Decimal = row.try_get("price")?;
    Ok(Some(Product {
      id: row.try_get("id")?,
      seller_id: row.try_get("seller_id")?,
      name: row.try_get("name")?,
      category: row.try_get("category")?,
      price,
      currency: currency.parse::<Currency>().map_err(|e| decode_error("currency", e))?,
      active: row.try_get("active")?,
    }))
  }
}

#[async_trait]
impl OrderStore for PgStore {
  #[instrument(name = "PgStore::insert_order", skip(self, order), fields(order_number = %order.order_number))]
  async fn insert_order(&self, order: &Order) -> StoreResult<()> {
    let result = sqlx::query(
      "INSERT INTO orders (id, order_number, buyer_id, seller_id, items, subtotal, tax_amount, shipping_cost, \
       total_amount, currency, status, status_history, shipping, payment, special_instructions, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
    )
    .bind(order.id)
    .bind(&order.order_number)
    .bind(order.buyer_id)
    .bind(order.seller_id)
    .bind(Json(&order.items))
    .bind(order.subtotal)
    .bind(order.tax_amount)
    .bind(order.shipping_cost)
    .bind(order.total_amount)
    .bind(order.currency.as_str())
    .bind(order.status.as_str())
    .bind(Json(&order.status_history))
    .bind(Json(&order.shipping))
    .bind(Json(&order.payment))
    .bind(&order.special_instructions)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&self.pool)
    .await;

    match result {
      Ok(_) => Ok(()),
      Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
        Err(StoreError::DuplicateOrderNumber(order.order_number.clone()))
      }
      Err(e) => Err(e.into()),
    }
  }

  #[instrument(name = "PgStore::delete_order", skip(self))]
  async fn delete_order(&self, order_id: Uuid) -> StoreResult<()> {
    let deleted = sqlx::query("DELETE FROM orders WHERE id = $1")
      .bind(order_id)
      .execute(&self.pool)
      .await?;
    if deleted.rows_affected() == 0 {
      return Err(StoreError::NotFound("order"));
    }
    Ok(())
  }

  async fn get_by_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
    let row = sqlx::query(&format!("SELECT {} FROM orders WHERE order_number = $1", ORDER_COLUMNS))
      .bind(order_number)
      .fetch_optional(&self.pool)
      .await?;
    row.as_ref().map(order_from_row).transpose()
  }

  async fn list_for_party(&self, company_id: Uuid, as_seller: bool) -> StoreResult<Vec<Order>> {
    let rows = sqlx::query(&format!(
      "SELECT {} FROM orders WHERE {} = $1 ORDER BY created_at DESC",
      ORDER_COLUMNS,
      party_column(as_seller)
    ))
    .bind(company_id)
    .fetch_all(&self.pool)
    .await?;
    rows.iter().map(order_from_row).collect()
  }

  async fn count_active(&self, company_id: Uuid, as_seller: bool) -> StoreResult<u64> {
    let active: Vec<&str> = OrderStatus::ACTIVE.iter().map(|s| s.as_str()).collect();
    let count: i64 = sqlx::query_scalar(&format!(
      "SELECT COUNT(*) FROM orders WHERE {} = $1 AND status = ANY($2)",
      party_column(as_seller)
    ))
    .bind(company_id)
    .bind(&active)
    .fetch_one(&self.pool)
    .await?;
    Ok(count.max(0) as u64)
  }
}

#[async_trait]
impl MessageStore for PgStore {
  async fn count_unread(&self, company_id: Uuid) -> StoreResult<u64> {
    let count: i64 =
      sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE recipient_company_id = $1 AND read_at IS NULL")
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;
    Ok(count.max(0) as u64)
  }
}

#[async_trait]
impl FavoriteStore for PgStore {
  async fn count_favorites(&self, company_id: Uuid) -> StoreResult<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE company_id = $1")
      .bind(company_id)
      .fetch_one(&self.pool)
      .await?;
    Ok(count.max(0) as u64)
  }
}
