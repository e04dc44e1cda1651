// marketplace/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;
use flowline::FlowError;

/// Machine-readable error codes returned in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
  EmptySelection,
  SelectionTooLarge,
  InvalidDeliveryMethod,
  InvalidDeliveryService,
  InvalidPaymentMethod,
  InvalidCurrency,
  MissingDeliveryAddress,
  ValidationError,
  CartNotFound,
  ItemNotInCart,
  ProductNotFound,
  NotFound,
  CartConflict,
  OrderNumberConflict,
  Unauthorized,
  Forbidden,
  CheckoutError,
  InternalError,
}

impl ErrorCode {
  pub fn as_str(&self) -> &'static str {
    match self {
      ErrorCode::EmptySelection => "EMPTY_SELECTION",
      ErrorCode::SelectionTooLarge => "SELECTION_TOO_LARGE",
      ErrorCode::InvalidDeliveryMethod => "INVALID_DELIVERY_METHOD",
      ErrorCode::InvalidDeliveryService => "INVALID_DELIVERY_SERVICE",
      ErrorCode::InvalidPaymentMethod => "INVALID_PAYMENT_METHOD",
      ErrorCode::InvalidCurrency => "INVALID_CURRENCY",
      ErrorCode::MissingDeliveryAddress => "MISSING_DELIVERY_ADDRESS",
      ErrorCode::ValidationError => "VALIDATION_ERROR",
      ErrorCode::CartNotFound => "CART_NOT_FOUND",
      ErrorCode::ItemNotInCart => "ITEM_NOT_IN_CART",
      ErrorCode::ProductNotFound => "PRODUCT_NOT_FOUND",
      ErrorCode::NotFound => "NOT_FOUND",
      ErrorCode::CartConflict => "CART_CONFLICT",
      ErrorCode::OrderNumberConflict => "ORDER_NUMBER_CONFLICT",
      ErrorCode::Unauthorized => "UNAUTHORIZED",
      ErrorCode::Forbidden => "FORBIDDEN",
      ErrorCode::CheckoutError => "CHECKOUT_ERROR",
      ErrorCode::InternalError => "INTERNAL_ERROR",
    }
  }
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {message}")]
  Validation { code: ErrorCode, message: String },

  #[error("Authentication Required: {0}")]
  Unauthorized(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {message}")]
  NotFound { code: ErrorCode, message: String },

  #[error("Conflict: {message}")]
  Conflict { code: ErrorCode, message: String },

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Store Error: {0}")]
  Store(#[from] StoreError),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Workflow '{0}' was halted before completing.")]
  WorkflowHalted(&'static str),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  pub fn validation(code: ErrorCode, message: impl Into<String>) -> Self {
    AppError::Validation {
      code,
      message: message.into(),
    }
  }

  pub fn not_found(code: ErrorCode, message: impl Into<String>) -> Self {
    AppError::NotFound {
      code,
      message: message.into(),
    }
  }

  pub fn conflict(code: ErrorCode, message: impl Into<String>) -> Self {
    AppError::Conflict {
      code,
      message: message.into(),
    }
  }

  pub fn code(&self) -> ErrorCode {
    match self {
      AppError::Validation { code, .. } | AppError::NotFound { code, .. } | AppError::Conflict { code, .. } => *code,
      AppError::Unauthorized(_) => ErrorCode::Unauthorized,
      AppError::Forbidden(_) => ErrorCode::Forbidden,
      AppError::Store(StoreError::NotFound(_)) => ErrorCode::NotFound,
      AppError::Store(StoreError::VersionConflict { .. }) => ErrorCode::CartConflict,
      AppError::Store(StoreError::QuantityLimit { .. }) => ErrorCode::ValidationError,
      AppError::Store(StoreError::DuplicateOrderNumber(_)) => ErrorCode::OrderNumberConflict,
      AppError::Store(StoreError::Database(_)) | AppError::Config(_) | AppError::Internal(_) => ErrorCode::InternalError,
      AppError::Workflow { .. } | AppError::WorkflowHalted(_) => ErrorCode::CheckoutError,
    }
  }

  /// Message safe to show to API clients. Server-side failures stay generic.
  fn public_message(&self) -> String {
    match self {
      AppError::Validation { message, .. } | AppError::NotFound { message, .. } | AppError::Conflict { message, .. } => {
        message.clone()
      }
      AppError::Unauthorized(m) | AppError::Forbidden(m) => m.clone(),
      AppError::Store(StoreError::NotFound(what)) => format!("{} not found.", what),
      AppError::Store(StoreError::VersionConflict { .. }) => "The cart was modified concurrently. Please retry.".to_string(),
      AppError::Store(StoreError::QuantityLimit { limit, .. }) => {
        format!("A cart line can hold at most {} units.", limit)
      }
      AppError::Store(StoreError::DuplicateOrderNumber(_)) => "Could not allocate a unique order number.".to_string(),
      AppError::Workflow { .. } | AppError::WorkflowHalted(_) => "Checkout could not be completed.".to_string(),
      AppError::Store(StoreError::Database(_)) | AppError::Config(_) | AppError::Internal(_) => {
        "An internal error occurred.".to_string()
      }
    }
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<AppError>() {
      Ok(app_err) => app_err,
      Err(err) => AppError::Internal(format!("{:#}", err)),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation { .. } | AppError::Store(StoreError::QuantityLimit { .. }) => StatusCode::BAD_REQUEST,
      AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound { .. } | AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
      AppError::Conflict { .. }
      | AppError::Store(StoreError::VersionConflict { .. })
      | AppError::Store(StoreError::DuplicateOrderNumber(_)) => StatusCode::CONFLICT,
      AppError::Store(StoreError::Database(_))
      | AppError::Config(_)
      | AppError::Workflow { .. }
      | AppError::WorkflowHalted(_)
      | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    let mut body = json!({
      "success": false,
      "message": self.public_message(),
      "code": self.code(),
    });

    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with server error");
      if cfg!(debug_assertions) {
        body["detail"] = json!(self.to_string());
      }
    } else {
      tracing::warn!(application_error = %self, code = self.code().as_str(), "Responding with client error");
    }

    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
