use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer};

use crate::prelude::*;

/// Storage keeps money and percentages in hundredths.
pub const CENTS: i64 = 100;

pub fn now() -> DateTime {
  Utc::now().naive_utc()
}

pub fn to_decimal(cents: i64) -> Decimal {
  Decimal::new(cents, 2)
}

/// Converts a non-negative decimal with at most two fractional digits.
pub fn to_cents(value: Decimal) -> Result<i64> {
  if value.is_sign_negative() && !value.is_zero() {
    return Err(Error::InvalidArgs("Amount must not be negative".into()));
  }

  let scaled = value
    .checked_mul(Decimal::from(CENTS))
    .ok_or_else(|| Error::InvalidArgs("Amount is too large".into()))?;
  if scaled.fract() != Decimal::ZERO {
    return Err(Error::InvalidArgs(
      "Amount must have at most two decimal places".into(),
    ));
  }

  scaled
    .to_i64()
    .ok_or_else(|| Error::InvalidArgs("Amount is too large".into()))
}

/// `#[serde(default, deserialize_with = "nullable")]` tells an absent field
/// (`None`) apart from an explicit `null` (`Some(None)`).
pub fn nullable<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(de).map(Some)
}
