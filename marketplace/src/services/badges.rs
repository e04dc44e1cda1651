// marketplace/src/services/badges.rs

//! Header badge counters, gathered concurrently.

use serde::Serialize;
use tracing::{instrument, warn};

use crate::models::identity::Identity;
use crate::store::{StoreResult, Stores};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BadgeCounts {
  pub active_orders: u64,
  pub unread_messages: u64,
  pub favorites: u64,
  pub cart_items: u64,
}

/// Fetches all four counters at once. A failing counter is logged and shown as zero.
#[instrument(name = "badges::collect", skip(stores), fields(company_id = %identity.company_id))]
pub async fn collect_badges(stores: &Stores, identity: &Identity) -> BadgeCounts {
  let company_id = identity.company_id;
  let as_seller = identity.sells();

  let (active_orders, unread_messages, favorites, cart_items) = tokio::join!(
    stores.orders.count_active(company_id, as_seller),
    stores.messages.count_unread(company_id),
    stores.favorites.count_favorites(company_id),
    async {
      if identity.is_buyer() {
        stores.carts.item_count(company_id).await
      } else {
        Ok(0)
      }
    },
  );

  BadgeCounts {
    active_orders: or_zero("active_orders", active_orders),
    unread_messages: or_zero("unread_messages", unread_messages),
    favorites: or_zero("favorites", favorites),
    cart_items: or_zero("cart_items", cart_items),
  }
}

fn or_zero(counter: &'static str, result: StoreResult<u64>) -> u64 {
  result.unwrap_or_else(|e| {
    warn!(counter, error = %e, "Badge counter unavailable, showing zero.");
    0
  })
}
