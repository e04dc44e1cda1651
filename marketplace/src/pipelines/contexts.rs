// marketplace/src/pipelines/contexts.rs

//! Data carried through each workflow. Handlers receive these wrapped in
//! `flowline::FlowContext`.

use uuid::Uuid;

use crate::models::cart::{AddCartItemRequest, Cart, CartLineItem, Specifications};
use crate::models::checkout::{CheckoutRequest, DeliveryMethod, ValidatedCheckout};
use crate::models::identity::Identity;
use crate::models::order::{Order, OrderSummary};
use crate::models::product::Product;
use crate::services::pricing::{ResolvedLine, SellerGroup};
use crate::state::AppState;

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub buyer: Identity,
  pub request: CheckoutRequest,
  pub validated: Option<ValidatedCheckout>,
  pub cart: Option<Cart>,
  pub selected_lines: Vec<ResolvedLine>,
  pub seller_groups: Vec<SellerGroup>,
  pub created_orders: Vec<Order>,
  pub cart_released: bool,
  pub events_published: usize,
}

impl CheckoutCtxData {
  pub fn new(app_state: AppState, buyer: Identity, request: CheckoutRequest) -> Self {
    Self {
      app_state,
      buyer,
      request,
      validated: None,
      cart: None,
      selected_lines: Vec::new(),
      seller_groups: Vec::new(),
      created_orders: Vec::new(),
      cart_released: false,
      events_published: 0,
    }
  }

  pub fn is_pickup(&self) -> bool {
    matches!(
      self.validated.as_ref().map(|v| v.delivery),
      Some(DeliveryMethod::Pickup)
    )
  }

  pub fn summaries(&self) -> Vec<OrderSummary> {
    self.created_orders.iter().map(OrderSummary::from).collect()
  }

  /// Where the client should go next: the order itself when only one was created.
  pub fn redirect_hint(&self) -> String {
    match self.created_orders.as_slice() {
      [only] => format!("/orders/{}", only.order_number),
      _ => "/orders".to_string(),
    }
  }
}

#[derive(Clone)]
pub struct AddToCartCtxData {
  pub app_state: AppState,
  pub buyer: Identity,
  pub product_id: Uuid,
  pub quantity: i64,
  pub specifications: Specifications,
  pub note: Option<String>,
  pub product: Option<Product>,
  pub updated_line: Option<CartLineItem>,
}

impl AddToCartCtxData {
  pub fn new(app_state: AppState, buyer: Identity, request: AddCartItemRequest) -> Self {
    Self {
      app_state,
      buyer,
      product_id: request.product_id,
      quantity: request.quantity,
      specifications: request.specifications,
      note: request.note,
      product: None,
      updated_line: None,
    }
  }
}
