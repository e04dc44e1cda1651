// marketplace/src/models/checkout.rs

//! Checkout vocabulary: delivery, payment and currency enums, the raw
//! request as clients send it, and its validated form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::errors::{AppError, ErrorCode};
use crate::services::pricing::CheckoutPolicy;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
  pub kind: &'static str,
  pub value: String,
}

macro_rules! string_enum {
  ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
    impl $name {
      pub fn as_str(&self) -> &'static str {
        match self {
          $($name::$variant => $text),+
        }
      }
    }

    impl FromStr for $name {
      type Err = UnknownVariant;

      fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
          $(s if s.eq_ignore_ascii_case($text) => Ok($name::$variant),)+
          other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
        }
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
      }
    }
  };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
  Delivery,
  Pickup,
}
string_enum!(DeliveryMethod, "delivery method", { Delivery => "delivery", Pickup => "pickup" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryService {
  Express,
  Standard,
  Economy,
}
string_enum!(DeliveryService, "delivery service", {
  Express => "express",
  Standard => "standard",
  Economy => "economy",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
  BankTransfer,
  CashOnDelivery,
  CashOnPickup,
  Card,
}
string_enum!(PaymentMethod, "payment method", {
  BankTransfer => "bank_transfer",
  CashOnDelivery => "cash_on_delivery",
  CashOnPickup => "cash_on_pickup",
  Card => "card",
});

impl PaymentMethod {
  /// Cash methods only work with the matching hand-over.
  pub fn required_delivery(&self) -> Option<DeliveryMethod> {
    match self {
      PaymentMethod::CashOnDelivery => Some(DeliveryMethod::Delivery),
      PaymentMethod::CashOnPickup => Some(DeliveryMethod::Pickup),
      PaymentMethod::BankTransfer | PaymentMethod::Card => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
  Usd,
  Eur,
  Gbp,
  Cny,
}
string_enum!(Currency, "currency", { Usd => "USD", Eur => "EUR", Gbp => "GBP", Cny => "CNY" });

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
  pub recipient: String,
  pub phone: String,
  pub line1: String,
  #[serde(default)]
  pub line2: Option<String>,
  pub city: String,
  #[serde(default)]
  pub state: Option<String>,
  #[serde(default)]
  pub postal_code: Option<String>,
  pub country: String,
}

impl Address {
  pub fn missing_fields(&self) -> Vec<&'static str> {
    [
      ("recipient", &self.recipient),
      ("phone", &self.phone),
      ("line1", &self.line1),
      ("city", &self.city),
      ("country", &self.country),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect()
  }
}

/// Checkout request body, before any validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutRequest {
  #[serde(default)]
  pub selected_item_ids: Vec<Uuid>,
  #[serde(default)]
  pub delivery_method: String,
  #[serde(default)]
  pub payment_method: String,
  #[serde(default)]
  pub delivery_address: Option<Address>,
  #[serde(default)]
  pub delivery_service: Option<String>,
  #[serde(default)]
  pub special_instructions: Option<String>,
  #[serde(default)]
  pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCheckout {
  /// Duplicates removed, first occurrence wins.
  pub item_ids: Vec<Uuid>,
  pub delivery: DeliveryMethod,
  pub service: Option<DeliveryService>,
  pub payment: PaymentMethod,
  pub address: Option<Address>,
  pub instructions: Option<String>,
  pub currency: Currency,
}

impl CheckoutRequest {
  /// Checks everything that can be checked without touching a store.
  pub fn validate(&self, policy: &CheckoutPolicy) -> Result<ValidatedCheckout, AppError> {
    if self.selected_item_ids.is_empty() {
      return Err(AppError::validation(
        ErrorCode::EmptySelection,
        "Select at least one cart item to check out.",
      ));
    }

    let mut item_ids: Vec<Uuid> = Vec::with_capacity(self.selected_item_ids.len());
    for id in &self.selected_item_ids {
      if !item_ids.contains(id) {
        item_ids.push(*id);
      }
    }
    if item_ids.len() > policy.max_selection {
      return Err(AppError::validation(
        ErrorCode::SelectionTooLarge,
        format!("At most {} items can be checked out at once.", policy.max_selection),
      ));
    }

    let delivery: DeliveryMethod = self
      .delivery_method
      .parse()
      .map_err(|e: UnknownVariant| AppError::validation(ErrorCode::InvalidDeliveryMethod, e.to_string()))?;

    let service = match self.delivery_service.as_deref().filter(|s| !s.trim().is_empty()) {
      Some(raw) => Some(
        raw
          .parse::<DeliveryService>()
          .map_err(|e| AppError::validation(ErrorCode::InvalidDeliveryService, e.to_string()))?,
      ),
      None => None,
    };

    let payment: PaymentMethod = self
      .payment_method
      .parse()
      .map_err(|e: UnknownVariant| AppError::validation(ErrorCode::InvalidPaymentMethod, e.to_string()))?;
    if let Some(required) = payment.required_delivery() {
      if required != delivery {
        return Err(AppError::validation(
          ErrorCode::InvalidPaymentMethod,
          format!("Payment method '{}' requires delivery method '{}'.", payment, required),
        ));
      }
    }

    let currency = match self.currency.as_deref().filter(|s| !s.trim().is_empty()) {
      Some(raw) => raw
        .parse::<Currency>()
        .map_err(|e| AppError::validation(ErrorCode::InvalidCurrency, e.to_string()))?,
      None => policy.default_currency,
    };

    let address = match delivery {
      DeliveryMethod::Delivery => {
        let address = self.delivery_address.clone().ok_or_else(|| {
          AppError::validation(ErrorCode::MissingDeliveryAddress, "A delivery address is required for delivery.")
        })?;
        let missing = address.missing_fields();
        if !missing.is_empty() {
          return Err(AppError::validation(
            ErrorCode::MissingDeliveryAddress,
            format!("Delivery address is missing: {}.", missing.join(", ")),
          ));
        }
        Some(address)
      }
      // An address sent along with a pickup is ignored.
      DeliveryMethod::Pickup => None,
    };

    let instructions = self
      .special_instructions
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::to_string);
    if let Some(text) = &instructions {
      if text.chars().count() > policy.max_instructions_len {
        return Err(AppError::validation(
          ErrorCode::ValidationError,
          format!(
            "Special instructions are limited to {} characters.",
            policy.max_instructions_len
          ),
        ));
      }
    }

    Ok(ValidatedCheckout {
      item_ids,
      delivery,
      service: match delivery {
        DeliveryMethod::Delivery => service,
        DeliveryMethod::Pickup => None,
      },
      payment,
      address,
      instructions,
      currency,
    })
  }
}
