// marketplace/src/pipelines/cart_pipeline.rs

use flowline::{FlowContext, Pipeline, Step, StepControl, Workflows};
use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::{AppError, ErrorCode};
use crate::models::cart::{NewCartLine, MAX_LINE_QUANTITY};
use crate::pipelines::contexts::AddToCartCtxData;

pub const MAX_SPECIFICATIONS: usize = 20;
pub const MAX_SPEC_KEY_LEN: usize = 50;
pub const MAX_SPEC_VALUE_LEN: usize = 200;
pub const MAX_NOTE_LEN: usize = 500;

pub fn build_add_to_cart_pipeline() -> Pipeline<AddToCartCtxData, AppError> {
  let mut p = Pipeline::<AddToCartCtxData, AppError>::new(vec![
    Step::required("validate_cart_input"),
    Step::required("fetch_product_for_cart"),
    Step::required("add_or_merge_cart_line"),
  ]);

  // Step 1: Check the caller and the line shape
  p.on("validate_cart_input", |ctx: FlowContext<AddToCartCtxData>| {
    Box::pin(async move {
      let guard = ctx.read();
      guard.buyer.require_buyer()?;

      if !(1..=i64::from(MAX_LINE_QUANTITY)).contains(&guard.quantity) {
        return Err(AppError::validation(
          ErrorCode::ValidationError,
          format!("Quantity must be between 1 and {}.", MAX_LINE_QUANTITY),
        ));
      }
      if guard.specifications.len() > MAX_SPECIFICATIONS {
        return Err(AppError::validation(
          ErrorCode::ValidationError,
          format!("At most {} specifications are allowed per line.", MAX_SPECIFICATIONS),
        ));
      }
      let bad_spec = guard.specifications.iter().find(|(name, value)| {
        name.trim().is_empty() || name.chars().count() > MAX_SPEC_KEY_LEN || value.chars().count() > MAX_SPEC_VALUE_LEN
      });
      if let Some((name, _)) = bad_spec {
        return Err(AppError::validation(
          ErrorCode::ValidationError,
          format!("Specification '{}' is empty or too long.", name),
        ));
      }
      if guard.note.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTE_LEN) {
        return Err(AppError::validation(
          ErrorCode::ValidationError,
          format!("Notes are limited to {} characters.", MAX_NOTE_LEN),
        ));
      }
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  // Step 2: Look the product up in the catalog
  p.on("fetch_product_for_cart", |ctx: FlowContext<AddToCartCtxData>| {
    Box::pin(async move {
      let (catalog, product_id, buyer_id) = {
        let guard = ctx.read();
        (guard.app_state.stores.catalog.clone(), guard.product_id, guard.buyer.company_id)
      };

      let product = catalog.get_product(product_id).await?.ok_or_else(|| {
        warn!("Cart Pipeline (Buyer {}): Product {} not found.", buyer_id, product_id);
        AppError::not_found(ErrorCode::ProductNotFound, "Product not found.")
      })?;
      if product.seller_id == buyer_id {
        return Err(AppError::Forbidden("You cannot add your own products to the cart.".to_string()));
      }

      ctx.write().product = Some(product);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  // Step 3: Merge into a matching line or append a new one
  p.on("add_or_merge_cart_line", |ctx: FlowContext<AddToCartCtxData>| {
    Box::pin(async move {
      let (carts, buyer_id, line) = {
        let guard = ctx.read();
        let product = guard
          .product
          .as_ref()
          .ok_or_else(|| AppError::Internal("cart state missing: product was not fetched".to_string()))?;
        let line = NewCartLine {
          product_id: product.id,
          seller_id: product.seller_id,
          product_name: product.name.clone(),
          // Bounded by step 1.
          quantity: guard.quantity as u32,
          unit_price: Some(product.price),
          specifications: guard.specifications.clone(),
          note: guard.note.clone(),
        };
        (guard.app_state.stores.carts.clone(), guard.buyer.company_id, line)
      };

      let updated = carts.add_item(buyer_id, line).await?;
      info!(
        "Cart Pipeline (Buyer {}): Line {} now holds {} x '{}'.",
        buyer_id, updated.id, updated.quantity, updated.product_name
      );
      ctx.write().updated_line = Some(updated);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p
}

pub fn register_add_to_cart_pipeline(workflows: &Arc<Workflows<AppError>>) {
  workflows.register(build_add_to_cart_pipeline());
}
