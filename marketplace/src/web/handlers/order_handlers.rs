// marketplace/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::instrument;

use crate::errors::{AppError, ErrorCode};
use crate::models::identity::Identity;
use crate::state::AppState;

#[instrument(name = "handler::list_orders", skip(app_state, identity), fields(company_id = %identity.company_id))]
pub async fn list_orders_handler(app_state: web::Data<AppState>, identity: Identity) -> Result<HttpResponse, AppError> {
  let orders = app_state
    .stores
    .orders
    .list_for_party(identity.company_id, identity.sells())
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "orders": orders })))
}

/// Orders are only visible to their buyer and seller. Anyone else gets a plain not-found.
#[instrument(name = "handler::get_order", skip(app_state, identity), fields(company_id = %identity.company_id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  identity: Identity,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let order_number = path.into_inner();
  let order = app_state
    .stores
    .orders
    .get_by_number(&order_number)
    .await?
    .filter(|order| order.involves(identity.company_id))
    .ok_or_else(|| AppError::not_found(ErrorCode::NotFound, format!("Order '{}' not found.", order_number)))?;

  Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}
