// marketplace/src/models/identity.rs

//! The caller's identity as resolved at the request boundary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyType {
  Manufacturer,
  Distributor,
  Customer,
  Admin,
}

impl CompanyType {
  pub fn parse(raw: &str) -> Option<Self> {
    match raw.trim().to_ascii_lowercase().as_str() {
      "manufacturer" => Some(CompanyType::Manufacturer),
      "distributor" => Some(CompanyType::Distributor),
      "customer" => Some(CompanyType::Customer),
      "admin" => Some(CompanyType::Admin),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Owner,
  Member,
  Admin,
}

impl Role {
  pub fn parse(raw: &str) -> Option<Self> {
    match raw.trim().to_ascii_lowercase().as_str() {
      "owner" => Some(Role::Owner),
      "member" => Some(Role::Member),
      "admin" => Some(Role::Admin),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Identity {
  pub company_id: Uuid,
  pub company_type: CompanyType,
  pub role: Role,
}

impl Identity {
  pub fn is_buyer(&self) -> bool {
    matches!(self.company_type, CompanyType::Distributor | CompanyType::Customer)
  }

  /// Orders are listed from the seller side for manufacturers.
  pub fn sells(&self) -> bool {
    self.company_type == CompanyType::Manufacturer
  }

  pub fn require_buyer(&self) -> Result<(), AppError> {
    if self.is_buyer() {
      Ok(())
    } else {
      Err(AppError::Forbidden(
        "Only distributor and customer companies can use the cart and checkout.".to_string(),
      ))
    }
  }
}
