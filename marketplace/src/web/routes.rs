// marketplace/src/web/routes.rs

use actix_web::{error, web, HttpResponse};

use crate::errors::{AppError, ErrorCode};
use crate::web::handlers::{badge_handlers, cart_handlers, checkout_handlers, order_handlers};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed bodies get the same error envelope as every other failure.
fn json_config() -> web::JsonConfig {
  web::JsonConfig::default().error_handler(|err, _req| {
    let message = match &err {
      error::JsonPayloadError::Deserialize(e) => format!("Invalid request body: {}", e),
      other => format!("Invalid request body: {}", other),
    };
    AppError::validation(ErrorCode::ValidationError, message).into()
  })
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .app_data(json_config())
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::get_cart_handler))
          .route("/items", web::post().to(cart_handlers::add_to_cart_handler))
          .route("/items/{item_id}", web::patch().to(cart_handlers::update_cart_item_handler))
          .route("/items/{item_id}", web::delete().to(cart_handlers::remove_cart_item_handler)),
      )
      .route("/checkout", web::post().to(checkout_handlers::checkout_handler))
      .service(
        web::scope("/orders")
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("/{order_number}", web::get().to(order_handlers::get_order_handler)),
      )
      .route("/badges", web::get().to(badge_handlers::badges_handler)),
  );
}
