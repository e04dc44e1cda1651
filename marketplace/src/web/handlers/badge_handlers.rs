// marketplace/src/web/handlers/badge_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::instrument;

use crate::errors::AppError;
use crate::models::identity::Identity;
use crate::services::badges::collect_badges;
use crate::state::AppState;

#[instrument(name = "handler::badges", skip(app_state, identity), fields(company_id = %identity.company_id))]
pub async fn badges_handler(app_state: web::Data<AppState>, identity: Identity) -> Result<HttpResponse, AppError> {
  let counts = collect_badges(&app_state.stores, &identity).await;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "badges": counts })))
}
