// marketplace/src/config.rs

use dotenvy::dotenv;
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

use crate::errors::{AppError, Result};
use crate::models::checkout::Currency;
use crate::services::pricing::CheckoutPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
  Postgres,
  Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

/// Escrow account attached to `bank_transfer` orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankAccount {
  pub account_name: String,
  pub bank_name: String,
  pub account_number: String,
  pub swift_code: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub storage: StorageBackend,
  pub database_url: Option<String>,
  pub database_max_connections: u32,
  pub run_migrations: bool,
  pub log_format: LogFormat,
  pub checkout: CheckoutPolicy,
  pub bank_account: Option<BankAccount>,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      storage: StorageBackend::Memory,
      database_url: None,
      database_max_connections: 10,
      run_migrations: false,
      log_format: LogFormat::Pretty,
      checkout: CheckoutPolicy::default(),
      bank_account: None,
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source. `from_env` passes the process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    fn parse<T: FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T>
    where
      T::Err: std::fmt::Display,
    {
      match raw {
        Some(value) => value
          .parse::<T>()
          .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, value, e))),
        None => Ok(default),
      }
    }

    let defaults = AppConfig::default();
    let policy_defaults = CheckoutPolicy::default();

    let server_host = get_env("SERVER_HOST").unwrap_or(defaults.server_host);
    let server_port = parse("SERVER_PORT", get_env("SERVER_PORT"), defaults.server_port)?;

    let storage = match get_env("STORAGE_BACKEND").as_deref().map(str::to_ascii_lowercase).as_deref() {
      None | Some("postgres") => StorageBackend::Postgres,
      Some("memory") => StorageBackend::Memory,
      Some(other) => {
        return Err(AppError::Config(format!(
          "Invalid STORAGE_BACKEND '{}': expected 'postgres' or 'memory'",
          other
        )))
      }
    };

    let database_url = get_env("DATABASE_URL");
    if storage == StorageBackend::Postgres && database_url.is_none() {
      return Err(AppError::Config(
        "Missing environment variable 'DATABASE_URL' (required when STORAGE_BACKEND=postgres)".to_string(),
      ));
    }

    let log_format = match get_env("LOG_FORMAT").as_deref() {
      Some("json") => LogFormat::Json,
      _ => LogFormat::Pretty,
    };

    let checkout = CheckoutPolicy {
      tax_rate: parse::<Decimal>("CHECKOUT_TAX_RATE", get_env("CHECKOUT_TAX_RATE"), policy_defaults.tax_rate)?,
      express_fee: parse::<Decimal>(
        "SHIPPING_FEE_EXPRESS",
        get_env("SHIPPING_FEE_EXPRESS"),
        policy_defaults.express_fee,
      )?,
      standard_fee: parse::<Decimal>(
        "SHIPPING_FEE_STANDARD",
        get_env("SHIPPING_FEE_STANDARD"),
        policy_defaults.standard_fee,
      )?,
      economy_fee: parse::<Decimal>(
        "SHIPPING_FEE_ECONOMY",
        get_env("SHIPPING_FEE_ECONOMY"),
        policy_defaults.economy_fee,
      )?,
      max_selection: parse(
        "CHECKOUT_MAX_SELECTION",
        get_env("CHECKOUT_MAX_SELECTION"),
        policy_defaults.max_selection,
      )?,
      max_instructions_len: parse(
        "CHECKOUT_MAX_INSTRUCTIONS",
        get_env("CHECKOUT_MAX_INSTRUCTIONS"),
        policy_defaults.max_instructions_len,
      )?,
      default_currency: parse::<Currency>(
        "DEFAULT_CURRENCY",
        get_env("DEFAULT_CURRENCY"),
        policy_defaults.default_currency,
      )?,
    };
    if checkout.tax_rate.is_sign_negative() || checkout.tax_rate >= Decimal::ONE {
      return Err(AppError::Config(format!(
        "CHECKOUT_TAX_RATE must be within [0, 1), got {}",
        checkout.tax_rate
      )));
    }
    for (name, fee) in [
      ("SHIPPING_FEE_EXPRESS", checkout.express_fee),
      ("SHIPPING_FEE_STANDARD", checkout.standard_fee),
      ("SHIPPING_FEE_ECONOMY", checkout.economy_fee),
    ] {
      // Orders store money as NUMERIC(14, 2).
      if fee.is_sign_negative() || fee.normalize().scale() > 2 {
        return Err(AppError::Config(format!(
          "{} must be a non-negative amount with at most 2 decimal places, got {}",
          name, fee
        )));
      }
    }

    let bank_account = match (
      get_env("BANK_ACCOUNT_NAME"),
      get_env("BANK_NAME"),
      get_env("BANK_ACCOUNT_NUMBER"),
      get_env("BANK_SWIFT"),
    ) {
      (Some(account_name), Some(bank_name), Some(account_number), Some(swift_code)) => Some(BankAccount {
        account_name,
        bank_name,
        account_number,
        swift_code,
      }),
      (None, None, None, None) => None,
      _ => {
        return Err(AppError::Config(
          "Bank details need all of BANK_ACCOUNT_NAME, BANK_NAME, BANK_ACCOUNT_NUMBER and BANK_SWIFT".to_string(),
        ))
      }
    };

    let config = Self {
      server_host,
      server_port,
      storage,
      database_url,
      database_max_connections: parse(
        "DATABASE_MAX_CONNECTIONS",
        get_env("DATABASE_MAX_CONNECTIONS"),
        defaults.database_max_connections,
      )?,
      run_migrations: parse("RUN_MIGRATIONS", get_env("RUN_MIGRATIONS"), defaults.run_migrations)?,
      log_format,
      checkout,
      bank_account,
    };

    tracing::info!(
      storage = ?config.storage,
      tax_rate = %config.checkout.tax_rate,
      bank_transfer_details = config.bank_account.is_some(),
      "Application configuration loaded."
    );
    Ok(config)
  }
}
