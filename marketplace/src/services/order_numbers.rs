// marketplace/src/services/order_numbers.rs

use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};

/// Produces human-readable order numbers.
///
/// Uniqueness is enforced by the order store; checkout regenerates once when
/// a number is already taken.
pub trait OrderNumberSource: Send + Sync {
  fn next_number(&self, at: DateTime<Utc>) -> String;
}

/// `ORD-{yymmddHHMMSS}-{6 hex digits}`, the suffix drawn from the OS RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomOrderNumbers;

impl OrderNumberSource for RandomOrderNumbers {
  fn next_number(&self, at: DateTime<Utc>) -> String {
    let token = OsRng.next_u32() & 0x00FF_FFFF;
    format!("ORD-{}-{:06X}", at.format("%y%m%d%H%M%S"), token)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn formats_timestamp_and_token() {
    let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
    let number = RandomOrderNumbers.next_number(at);

    assert!(number.starts_with("ORD-240309140507-"), "{}", number);
    let token = &number["ORD-240309140507-".len()..];
    assert_eq!(token.len(), 6);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
  }
}
