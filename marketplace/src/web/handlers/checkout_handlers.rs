// marketplace/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use flowline::{FlowContext, FlowOutcome};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::checkout::CheckoutRequest;
use crate::models::identity::Identity;
use crate::pipelines::contexts::CheckoutCtxData;
use crate::state::AppState;

#[instrument(
  name = "handler::checkout",
  skip(app_state, identity, payload),
  fields(company_id = %identity.company_id, selected = payload.selected_item_ids.len())
)]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  identity: Identity,
  payload: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
  identity.require_buyer()?;
  info!("Checkout attempt by company: {}", identity.company_id);

  let ctx = FlowContext::new(CheckoutCtxData::new(
    app_state.get_ref().clone(),
    identity,
    payload.into_inner(),
  ));

  match app_state.workflows.run(ctx.clone()).await? {
    FlowOutcome::Completed => {
      let guard = ctx.read();
      if guard.created_orders.is_empty() {
        return Err(AppError::Internal("Checkout completed without creating any order.".to_string()));
      }
      info!(
        "Checkout completed for company {}: {} order(s), {} event(s) published.",
        guard.buyer.company_id,
        guard.created_orders.len(),
        guard.events_published
      );
      Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Orders placed successfully.",
        "orders": guard.summaries(),
        "redirect_hint": guard.redirect_hint(),
      })))
    }
    FlowOutcome::Halted => {
      warn!("Checkout pipeline halted for company {}.", ctx.read().buyer.company_id);
      Err(AppError::WorkflowHalted("checkout"))
    }
  }
}
