// marketplace/src/services/pricing.rs

//! Seller grouping and the money math of checkout.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::models::cart::Specifications;
use crate::models::checkout::{Currency, DeliveryMethod, DeliveryService};

/// Deployment-wide checkout knobs. Loaded from the environment, see `AppConfig`.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutPolicy {
  pub tax_rate: Decimal,
  pub express_fee: Decimal,
  pub standard_fee: Decimal,
  pub economy_fee: Decimal,
  pub max_selection: usize,
  pub max_instructions_len: usize,
  pub default_currency: Currency,
}

impl Default for CheckoutPolicy {
  fn default() -> Self {
    Self {
      tax_rate: dec!(0.10),
      express_fee: dec!(25.00),
      standard_fee: dec!(10.00),
      economy_fee: dec!(5.00),
      max_selection: 50,
      max_instructions_len: 500,
      default_currency: Currency::Usd,
    }
  }
}

impl CheckoutPolicy {
  pub fn line_total(&self, unit_price: Decimal, quantity: u32) -> Decimal {
    unit_price * Decimal::from(quantity)
  }

  /// Tax on a seller subtotal, rounded half away from zero to cents.
  pub fn tax_for(&self, subtotal: Decimal) -> Decimal {
    (subtotal * self.tax_rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
  }

  /// Flat fee per seller order. Pickup is free, delivery defaults to the standard tier.
  pub fn shipping_fee(&self, method: DeliveryMethod, service: Option<DeliveryService>) -> Decimal {
    match (method, service) {
      (DeliveryMethod::Pickup, _) => Decimal::ZERO,
      (DeliveryMethod::Delivery, Some(DeliveryService::Express)) => self.express_fee,
      (DeliveryMethod::Delivery, Some(DeliveryService::Economy)) => self.economy_fee,
      (DeliveryMethod::Delivery, Some(DeliveryService::Standard) | None) => self.standard_fee,
    }
  }

  pub fn transit_days(&self, method: DeliveryMethod, service: Option<DeliveryService>) -> i64 {
    match (method, service) {
      (DeliveryMethod::Pickup, _) => 1,
      (DeliveryMethod::Delivery, Some(DeliveryService::Express)) => 2,
      (DeliveryMethod::Delivery, Some(DeliveryService::Economy)) => 10,
      (DeliveryMethod::Delivery, Some(DeliveryService::Standard) | None) => 5,
    }
  }

  /// Fills in the subtotal and tax of a group from its lines.
  pub fn price_group(&self, group: &mut SellerGroup) {
    group.subtotal = group
      .lines
      .iter()
      .map(|line| self.line_total(line.unit_price, line.quantity))
      .sum();
    group.tax_amount = self.tax_for(group.subtotal);
  }
}

/// A selected cart line with its price settled.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLine {
  pub cart_item_id: Uuid,
  pub product_id: Uuid,
  pub seller_id: Uuid,
  pub product_name: String,
  pub quantity: u32,
  pub unit_price: Decimal,
  pub specifications: Specifications,
  pub note: Option<String>,
}

/// All selected lines of one seller. Becomes exactly one order.
#[derive(Debug, Clone, PartialEq)]
pub struct SellerGroup {
  pub seller_id: Uuid,
  pub lines: Vec<ResolvedLine>,
  pub subtotal: Decimal,
  pub tax_amount: Decimal,
  pub shipping_cost: Decimal,
}

impl SellerGroup {
  pub fn total(&self) -> Decimal {
    self.subtotal + self.tax_amount + self.shipping_cost
  }
}

/// Partitions lines by seller. Groups keep the order in which sellers first appear.
pub fn group_by_seller(lines: Vec<ResolvedLine>) -> Vec<SellerGroup> {
  let mut groups: Vec<SellerGroup> = Vec::new();
  for line in lines {
    match groups.iter_mut().find(|g| g.seller_id == line.seller_id) {
      Some(group) => group.lines.push(line),
      None => groups.push(SellerGroup {
        seller_id: line.seller_id,
        lines: vec![line],
        subtotal: Decimal::ZERO,
        tax_amount: Decimal::ZERO,
        shipping_cost: Decimal::ZERO,
      }),
    }
  }
  groups
}

#[cfg(test)]
mod tests {
  use super::*;

  fn line(seller_id: Uuid, quantity: u32, unit_price: Decimal) -> ResolvedLine {
    ResolvedLine {
      cart_item_id: Uuid::new_v4(),
      product_id: Uuid::new_v4(),
      seller_id,
      product_name: "Steel bracket".into(),
      quantity,
      unit_price,
      specifications: Specifications::new(),
      note: None,
    }
  }

  #[test]
  fn groups_keep_first_appearance_order() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let groups = group_by_seller(vec![
      line(b, 1, dec!(1)),
      line(a, 1, dec!(1)),
      line(b, 2, dec!(1)),
    ]);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].seller_id, b);
    assert_eq!(groups[0].lines.len(), 2);
    assert_eq!(groups[1].seller_id, a);
  }

  #[test]
  fn prices_a_group() {
    let policy = CheckoutPolicy::default();
    let seller = Uuid::new_v4();
    let mut group = group_by_seller(vec![line(seller, 2, dec!(10)), line(seller, 1, dec!(5))]).remove(0);
    policy.price_group(&mut group);

    assert_eq!(group.subtotal, dec!(25));
    assert_eq!(group.tax_amount, dec!(2.50));
    assert_eq!(group.total(), dec!(27.50));
  }

  #[test]
  fn tax_rounds_half_away_from_zero() {
    let policy = CheckoutPolicy::default();
    assert_eq!(policy.tax_for(dec!(0.25)), dec!(0.03));
    assert_eq!(policy.tax_for(dec!(33.33)), dec!(3.33));
    assert_eq!(policy.tax_for(Decimal::ZERO), Decimal::ZERO);
  }

  #[test]
  fn shipping_fee_and_transit_by_tier() {
    let policy = CheckoutPolicy::default();
    use DeliveryMethod::*;
    use DeliveryService::*;

    assert_eq!(policy.shipping_fee(Pickup, Some(Express)), Decimal::ZERO);
    assert_eq!(policy.shipping_fee(Delivery, Some(Express)), dec!(25.00));
    assert_eq!(policy.shipping_fee(Delivery, Some(Economy)), dec!(5.00));
    assert_eq!(policy.shipping_fee(Delivery, None), dec!(10.00));

    assert_eq!(policy.transit_days(Pickup, None), 1);
    assert_eq!(policy.transit_days(Delivery, Some(Express)), 2);
    assert_eq!(policy.transit_days(Delivery, Some(Standard)), 5);
    assert_eq!(policy.transit_days(Delivery, Some(Economy)), 10);
  }
}
