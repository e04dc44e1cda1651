// marketplace/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use flowline::{FlowContext, FlowOutcome};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, ErrorCode};
use crate::models::cart::{AddCartItemRequest, Cart, UpdateCartItemRequest, MAX_LINE_QUANTITY};
use crate::models::identity::Identity;
use crate::pipelines::contexts::AddToCartCtxData;
use crate::state::AppState;

#[instrument(name = "handler::get_cart", skip(app_state, identity), fields(company_id = %identity.company_id))]
pub async fn get_cart_handler(app_state: web::Data<AppState>, identity: Identity) -> Result<HttpResponse, AppError> {
  identity.require_buyer()?;
  let cart = app_state
    .stores
    .carts
    .get_cart(identity.company_id)
    .await?
    .unwrap_or_else(|| Cart::empty(identity.company_id));

  Ok(HttpResponse::Ok().json(json!({ "success": true, "cart": cart })))
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, identity, payload),
  fields(company_id = %identity.company_id, product_id = %payload.product_id, quantity = payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  identity: Identity,
  payload: web::Json<AddCartItemRequest>,
) -> Result<HttpResponse, AppError> {
  let ctx = FlowContext::new(AddToCartCtxData::new(
    app_state.get_ref().clone(),
    identity,
    payload.into_inner(),
  ));

  match app_state.workflows.run(ctx.clone()).await? {
    FlowOutcome::Completed => {
      let line = ctx.read().updated_line.clone().ok_or_else(|| {
        warn!("Add-to-cart pipeline completed but no cart line was recorded.");
        AppError::Internal("Cart line unavailable after add.".to_string())
      })?;
      Ok(HttpResponse::Ok().json(json!({ "success": true, "item": line })))
    }
    FlowOutcome::Halted => Err(AppError::WorkflowHalted("add_to_cart")),
  }
}

#[instrument(name = "handler::update_cart_item", skip(app_state, identity, payload), fields(company_id = %identity.company_id))]
pub async fn update_cart_item_handler(
  app_state: web::Data<AppState>,
  identity: Identity,
  path: web::Path<Uuid>,
  payload: web::Json<UpdateCartItemRequest>,
) -> Result<HttpResponse, AppError> {
  identity.require_buyer()?;
  let item_id = path.into_inner();
  let quantity = payload.quantity;
  if !(1..=i64::from(MAX_LINE_QUANTITY)).contains(&quantity) {
    return Err(AppError::validation(
      ErrorCode::ValidationError,
      format!("Quantity must be between 1 and {}.", MAX_LINE_QUANTITY),
    ));
  }

  let line = app_state
    .stores
    .carts
    .update_quantity(identity.company_id, item_id, quantity as u32)
    .await?;
  info!("Cart line {} set to quantity {}.", item_id, quantity);
  Ok(HttpResponse::Ok().json(json!({ "success": true, "item": line })))
}

#[instrument(name = "handler::remove_cart_item", skip(app_state, identity), fields(company_id = %identity.company_id))]
pub async fn remove_cart_item_handler(
  app_state: web::Data<AppState>,
  identity: Identity,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  identity.require_buyer()?;
  let item_id = path.into_inner();
  app_state.stores.carts.remove_item(identity.company_id, item_id).await?;
  info!("Cart line {} removed.", item_id);
  Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
