// marketplace/src/pipelines/checkout_pipeline.rs

//! Checkout: turns the selected cart lines into one order per seller.

use chrono::{DateTime, Duration, Utc};
use flowline::{FlowContext, Pipeline, Step, StepControl, Workflows};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, ErrorCode};
use crate::models::checkout::{DeliveryMethod, PaymentMethod, ValidatedCheckout};
use crate::models::order::{
  BankDetails, Order, OrderLineItem, OrderStatus, PaymentDetails, PaymentStatus, ShippingDetails, Specification,
  StatusChange,
};
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::events::OrderEvent;
use crate::services::pricing::{group_by_seller, ResolvedLine, SellerGroup};
use crate::state::AppState;
use crate::store::StoreError;

pub const STEPS: [&str; 9] = [
  "validate_checkout_request",
  "load_buyer_cart",
  "resolve_selected_items",
  "group_by_seller",
  "price_seller_groups",
  "apply_delivery_charges",
  "place_orders",
  "release_cart_items",
  "publish_order_events",
];

pub fn build_checkout_pipeline() -> Pipeline<CheckoutCtxData, AppError> {
  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(vec![
    Step::required("validate_checkout_request"),
    Step::required("load_buyer_cart"),
    Step::required("resolve_selected_items"),
    Step::required("group_by_seller"),
    Step::required("price_seller_groups"),
    Step::required("apply_delivery_charges").skip_when(|c: &CheckoutCtxData| c.is_pickup()),
    Step::required("place_orders"),
    Step::required("release_cart_items"),
    Step::optional("publish_order_events"),
  ]);

  // Step 1: Validate the request before touching any store
  p.on("validate_checkout_request", |ctx: FlowContext<CheckoutCtxData>| {
    Box::pin(async move {
      let (buyer_id, validated) = {
        let guard = ctx.read();
        let validated = guard
          .buyer
          .require_buyer()
          .and_then(|_| guard.request.validate(&guard.app_state.config.checkout));
        (guard.buyer.company_id, validated)
      };

      let validated = validated.map_err(|e| {
        warn!("Checkout Pipeline (Buyer {}): Request rejected: {}", buyer_id, e);
        e
      })?;
      info!(
        "Checkout Pipeline (Buyer {}): Request valid. {} item(s), {} via {}.",
        buyer_id,
        validated.item_ids.len(),
        validated.payment,
        validated.delivery
      );
      ctx.write().validated = Some(validated);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  // Step 2: Load the buyer's cart
  p.on("load_buyer_cart", |ctx: FlowContext<CheckoutCtxData>| {
    Box::pin(async move {
      let (carts, buyer_id) = {
        let guard = ctx.read();
        (guard.app_state.stores.carts.clone(), guard.buyer.company_id)
      };

      let cart = carts.get_cart(buyer_id).await?.ok_or_else(|| {
        warn!("Checkout Pipeline (Buyer {}): No cart found.", buyer_id);
        AppError::not_found(ErrorCode::CartNotFound, "No cart found for this buyer.")
      })?;
      info!(
        "Checkout Pipeline (Buyer {}): Cart loaded at version {} with {} line(s).",
        buyer_id,
        cart.version,
        cart.items.len()
      );
      ctx.write().cart = Some(cart);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  // Step 3: Keep only the selected lines and settle their unit prices
  p.on("resolve_selected_items", |ctx: FlowContext<CheckoutCtxData>| {
    Box::pin(async move {
      let (catalog, buyer_id, cart, validated) = {
        let guard = ctx.read();
        (
          guard.app_state.stores.catalog.clone(),
          guard.buyer.company_id,
          guard.cart.clone(),
          guard.validated.clone(),
        )
      };
      let cart = cart.ok_or_else(|| out_of_order("load_buyer_cart"))?;
      let validated = validated.ok_or_else(|| out_of_order("validate_checkout_request"))?;

      let selected: Vec<_> = cart
        .items
        .iter()
        .filter(|line| validated.item_ids.contains(&line.id))
        .cloned()
        .collect();
      if selected.is_empty() {
        warn!("Checkout Pipeline (Buyer {}): None of the selected items are in the cart.", buyer_id);
        return Err(AppError::not_found(
          ErrorCode::EmptySelection,
          "None of the selected items are in the cart.",
        ));
      }
      if selected.len() < validated.item_ids.len() {
        let missing = validated.item_ids.len() - selected.len();
        warn!(
          "Checkout Pipeline (Buyer {}): {} selected item(s) are not in the cart.",
          buyer_id, missing
        );
        return Err(AppError::not_found(
          ErrorCode::ItemNotInCart,
          format!("{} selected item(s) are no longer in the cart.", missing),
        ));
      }

      let mut resolved = Vec::with_capacity(selected.len());
      for line in selected {
        let unit_price = match line.unit_price {
          Some(price) => price,
          None => {
            let product = catalog.get_product(line.product_id).await?.ok_or_else(|| {
              AppError::not_found(
                ErrorCode::ProductNotFound,
                format!("Product '{}' is no longer available.", line.product_name),
              )
            })?;
            info!(
              "Checkout Pipeline (Buyer {}): Priced line {} from catalog at {}.",
              buyer_id, line.id, product.price
            );
            product.price
          }
        };
        resolved.push(ResolvedLine {
          cart_item_id: line.id,
          product_id: line.product_id,
          seller_id: line.seller_id,
          product_name: line.product_name,
          quantity: line.quantity,
          unit_price,
          specifications: line.specifications,
          note: line.note,
        });
      }

      ctx.write().selected_lines = resolved;
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  // Step 4: One group per seller
  p.on("group_by_seller", |ctx: FlowContext<CheckoutCtxData>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.seller_groups = group_by_seller(guard.selected_lines.clone());
      info!(
        "Checkout Pipeline (Buyer {}): {} line(s) split across {} seller(s).",
        guard.buyer.company_id,
        guard.selected_lines.len(),
        guard.seller_groups.len()
      );
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  // Step 5: Subtotal and tax per seller
  p.on("price_seller_groups", |ctx: FlowContext<CheckoutCtxData>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      let policy = guard.app_state.config.checkout.clone();
      for group in guard.seller_groups.iter_mut() {
        policy.price_group(group);
      }
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  // Step 6: Shipping fee per seller order. Skipped for pickup.
  p.on("apply_delivery_charges", |ctx: FlowContext<CheckoutCtxData>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      let validated = guard.validated.clone().ok_or_else(|| out_of_order("validate_checkout_request"))?;
      let fee = guard
        .app_state
        .config
        .checkout
        .shipping_fee(validated.delivery, validated.service);
      for group in guard.seller_groups.iter_mut() {
        group.shipping_cost = fee;
      }
      info!(
        "Checkout Pipeline (Buyer {}): Delivery fee {} applied to {} order(s).",
        guard.buyer.company_id,
        fee,
        guard.seller_groups.len()
      );
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  // Step 7: Persist one order per seller, sequentially
  p.on("place_orders", |ctx: FlowContext<CheckoutCtxData>| {
    Box::pin(async move {
      let (app_state, buyer_id, validated, groups) = {
        let guard = ctx.read();
        (
          guard.app_state.clone(),
          guard.buyer.company_id,
          guard.validated.clone(),
          guard.seller_groups.clone(),
        )
      };
      let validated = validated.ok_or_else(|| out_of_order("validate_checkout_request"))?;

      let now = Utc::now();
      let mut created: Vec<Order> = Vec::with_capacity(groups.len());
      for group in &groups {
        let order = build_order(&app_state, buyer_id, &validated, group, now);
        match insert_with_retry(&app_state, order).await {
          Ok(order) => {
            info!(
              "Checkout Pipeline (Buyer {}): Order {} created for seller {}. Total: {} {}",
              buyer_id, order.order_number, order.seller_id, order.total_amount, order.currency
            );
            created.push(order);
          }
          Err(e) => {
            error!(
              "Checkout Pipeline (Buyer {}): Creating order for seller {} failed: {}",
              buyer_id, group.seller_id, e
            );
            compensate(&app_state, &created).await;
            return Err(e);
          }
        }
      }

      ctx.write().created_orders = created;
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  // Step 8: Drop the checked-out lines, guarded by the cart version read in step 2
  p.on("release_cart_items", |ctx: FlowContext<CheckoutCtxData>| {
    Box::pin(async move {
      let (app_state, buyer_id, item_ids, version, created) = {
        let guard = ctx.read();
        (
          guard.app_state.clone(),
          guard.buyer.company_id,
          guard.selected_lines.iter().map(|l| l.cart_item_id).collect::<Vec<Uuid>>(),
          guard.cart.as_ref().map(|c| c.version),
          guard.created_orders.clone(),
        )
      };
      let version = version.ok_or_else(|| out_of_order("load_buyer_cart"))?;

      let released = match app_state.stores.carts.remove_items(buyer_id, &item_ids, version).await {
        Ok(cart) => {
          info!(
            "Checkout Pipeline (Buyer {}): Released {} cart line(s). Cart now at version {}.",
            buyer_id,
            item_ids.len(),
            cart.version
          );
          Ok(())
        }
        Err(StoreError::VersionConflict { expected, actual }) => {
          warn!(
            "Checkout Pipeline (Buyer {}): Cart moved from version {} to {} during checkout.",
            buyer_id, expected, actual
          );
          Err(AppError::conflict(
            ErrorCode::CartConflict,
            "The cart changed while checking out. Please review it and try again.",
          ))
        }
        // The store may fail after the delete became durable. Then the orders must stay.
        Err(e) => {
          if lines_gone(&app_state, buyer_id, &item_ids).await {
            warn!(
              "Checkout Pipeline (Buyer {}): Cart release reported '{}' but the lines are gone. Keeping {} order(s).",
              buyer_id,
              e,
              created.len()
            );
            Ok(())
          } else {
            Err(AppError::from(e))
          }
        }
      };

      match released {
        Ok(()) => {
          ctx.write().cart_released = true;
          Ok::<_, AppError>(StepControl::Continue)
        }
        Err(err) => {
          warn!(
            "Checkout Pipeline (Buyer {}): Releasing cart lines failed ({}). Rolling back {} order(s).",
            buyer_id,
            err,
            created.len()
          );
          compensate(&app_state, &created).await;
          ctx.write().created_orders.clear();
          Err(err)
        }
      }
    })
  });

  // Step 9: Notify sellers (optional). Never fails the checkout.
  p.on("publish_order_events", |ctx: FlowContext<CheckoutCtxData>| {
    Box::pin(async move {
      let (events, orders) = {
        let guard = ctx.read();
        (guard.app_state.events.clone(), guard.created_orders.clone())
      };

      let mut published = 0;
      for order in &orders {
        match events.publish(OrderEvent::from(order)).await {
          Ok(()) => published += 1,
          Err(e) => warn!(
            "Checkout Pipeline (Order {}): Publishing order event failed: {:#}",
            order.order_number, e
          ),
        }
      }
      ctx.write().events_published = published;
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p
}

pub fn register_checkout_pipeline(workflows: &Arc<Workflows<AppError>>) {
  workflows.register(build_checkout_pipeline());
}

fn out_of_order(step: &str) -> AppError {
  AppError::Internal(format!("checkout state missing: step '{}' has not run", step))
}

fn build_order(
  app_state: &AppState,
  buyer_id: Uuid,
  validated: &ValidatedCheckout,
  group: &SellerGroup,
  now: DateTime<Utc>,
) -> Order {
  let policy = &app_state.config.checkout;
  let order_number = app_state.order_numbers.next_number(now);

  let items = group
    .lines
    .iter()
    .map(|line| OrderLineItem {
      product_id: line.product_id,
      product_name: line.product_name.clone(),
      quantity: line.quantity,
      unit_price: line.unit_price,
      total_price: policy.line_total(line.unit_price, line.quantity),
      specifications: line
        .specifications
        .iter()
        .map(|(name, value)| Specification {
          name: name.clone(),
          value: value.clone(),
        })
        .collect(),
      note: line.note.clone(),
    })
    .collect();

  let bank_details = match (validated.payment, &app_state.config.bank_account) {
    (PaymentMethod::BankTransfer, Some(account)) => Some(BankDetails {
      account_name: account.account_name.clone(),
      bank_name: account.bank_name.clone(),
      account_number: account.account_number.clone(),
      swift_code: account.swift_code.clone(),
      reference: order_number.clone(),
    }),
    _ => None,
  };

  Order {
    id: Uuid::new_v4(),
    order_number,
    buyer_id,
    seller_id: group.seller_id,
    items,
    subtotal: group.subtotal,
    tax_amount: group.tax_amount,
    shipping_cost: group.shipping_cost,
    total_amount: group.total(),
    currency: validated.currency,
    status: OrderStatus::Pending,
    status_history: vec![StatusChange {
      status: OrderStatus::Pending,
      note: "Order created".to_string(),
      at: now,
    }],
    shipping: ShippingDetails {
      method: validated.delivery,
      service: validated.service,
      address: match validated.delivery {
        DeliveryMethod::Delivery => validated.address.clone(),
        DeliveryMethod::Pickup => None,
      },
      estimated_delivery: now + Duration::days(policy.transit_days(validated.delivery, validated.service)),
    },
    payment: PaymentDetails {
      method: validated.payment,
      status: PaymentStatus::Pending,
      bank_details,
    },
    special_instructions: validated.instructions.clone(),
    created_at: now,
    updated_at: now,
  }
}

/// Inserts `order`, drawing a fresh number once if the first one is taken.
#[instrument(name = "checkout::insert_order", skip(app_state, order), fields(seller_id = %order.seller_id))]
async fn insert_with_retry(app_state: &AppState, mut order: Order) -> Result<Order, AppError> {
  match app_state.stores.orders.insert_order(&order).await {
    Ok(()) => return Ok(order),
    Err(StoreError::DuplicateOrderNumber(taken)) => {
      warn!(order_number = %taken, "Order number already taken, drawing a new one.");
    }
    Err(e) => return Err(e.into()),
  }

  order.order_number = app_state.order_numbers.next_number(Utc::now());
  if let Some(bank) = order.payment.bank_details.as_mut() {
    bank.reference = order.order_number.clone();
  }
  match app_state.stores.orders.insert_order(&order).await {
    Ok(()) => Ok(order),
    Err(StoreError::DuplicateOrderNumber(taken)) => Err(AppError::conflict(
      ErrorCode::OrderNumberConflict,
      format!("Order number '{}' collided twice. Please retry the checkout.", taken),
    )),
    Err(e) => Err(e.into()),
  }
}

/// True when none of `item_ids` is left in the buyer's cart. An unreadable cart counts as not gone.
async fn lines_gone(app_state: &AppState, buyer_id: Uuid, item_ids: &[Uuid]) -> bool {
  match app_state.stores.carts.get_cart(buyer_id).await {
    Ok(Some(cart)) => !cart.items.iter().any(|item| item_ids.contains(&item.id)),
    Ok(None) => true,
    Err(e) => {
      warn!(%buyer_id, error = %e, "Could not re-read the cart after a failed release.");
      false
    }
  }
}

/// Deletes orders created earlier in a checkout that can no longer complete.
async fn compensate(app_state: &AppState, orders: &[Order]) {
  for order in orders {
    match app_state.stores.orders.delete_order(order.id).await {
      Ok(()) => info!("Checkout compensation: order {} removed.", order.order_number),
      Err(e) => error!(
        order_number = %order.order_number,
        error = %e,
        "Checkout compensation failed, order left without a cart release."
      ),
    }
  }
}
