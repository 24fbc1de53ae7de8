//! Type-safe price representation using decimal arithmetic.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PriceError {
    /// The input is not a decimal number.
    #[error("price must be a decimal number")]
    Invalid,
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
}

/// A product price.
///
/// A non-negative decimal amount in the store's currency. Serialized on the
/// wire as a decimal string (e.g., `"9.99"`), never as a binary float.
///
/// ## Examples
///
/// ```
/// use tradepost_core::Price;
///
/// assert!(Price::parse("9.99").is_ok());
/// assert!(Price::parse("0").is_ok());
/// assert!(Price::parse("-1").is_err());
/// assert!(Price::parse("free").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Parse a `Price` from a decimal string.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Invalid`] if the input is not a decimal number
    /// and [`PriceError::Negative`] if the amount is below zero.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| PriceError::Invalid)?;
        Self::from_decimal(amount)
    }

    /// Create a `Price` from an already-parsed decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if the amount is below zero.
    pub fn from_decimal(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// SQLx support (with postgres feature): stored as NUMERIC
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are constrained non-negative by the schema
        Ok(Self(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(Price::parse("9.99").unwrap().to_string(), "9.99");
        assert_eq!(Price::parse("0").unwrap().to_string(), "0");
        assert_eq!(Price::parse(" 12.50 ").unwrap().to_string(), "12.50");
    }

    #[test]
    fn test_parse_negative() {
        assert!(matches!(Price::parse("-1"), Err(PriceError::Negative)));
        assert!(matches!(Price::parse("-0.01"), Err(PriceError::Negative)));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(Price::parse("free"), Err(PriceError::Invalid)));
        assert!(matches!(Price::parse(""), Err(PriceError::Invalid)));
    }

    #[test]
    fn test_negative_zero_is_zero() {
        assert!(Price::parse("-0").is_ok());
    }

    #[test]
    fn test_serde_roundtrip() {
        let price = Price::parse("19.95").unwrap();
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(json, "\"19.95\"");

        let parsed: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, price);
    }
}
