//! Fixed-point currency amounts
//!
//! Amounts are `rust_decimal::Decimal` so that line prices and totals are
//! exact. Arithmetic between different currencies is refused rather than
//! converted.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minor-unit precision used for every persisted or submitted amount
pub const CURRENCY_SCALE: u32 = 2;

/// ISO-4217 currency code newtype wrapper
///
/// # Examples
///
/// ```
/// use claimwright::domain::money::Currency;
///
/// let aud = Currency::new("aud").unwrap();
/// assert_eq!(aud.as_str(), "AUD");
/// assert!(Currency::new("dollars").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Creates a currency from a three-letter code (case-insensitive)
    pub fn new(code: impl AsRef<str>) -> Result<Self, String> {
        let code = code.as_ref().trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(format!(
                "Invalid currency code '{code}'. Expected a three-letter ISO-4217 code"
            ));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// Returns the currency code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

/// An amount in a single currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Fixed-point amount
    pub amount: Decimal,

    /// Currency of the amount
    pub currency: Currency,
}

impl Money {
    /// Creates a new amount
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency
    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Multiplies by a whole quantity
    pub fn times(&self, quantity: u32) -> Money {
        Money::new(self.amount * Decimal::from(quantity), self.currency.clone())
    }

    /// Adds two amounts of the same currency
    ///
    /// # Errors
    ///
    /// Returns an error naming both currencies when they differ.
    pub fn checked_add(&self, other: &Money) -> Result<Money, String> {
        if self.currency != other.currency {
            return Err(format!(
                "Currency mismatch: cannot add {} to {}",
                other.currency, self.currency
            ));
        }
        Ok(Money::new(self.amount + other.amount, self.currency.clone()))
    }

    /// Rounds to the currency's minor unit, midpoint away from zero
    pub fn rounded(&self) -> Money {
        Money::new(
            self.amount
                .round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero),
            self.currency.clone(),
        )
    }

    /// Sums a sequence of amounts that must all share `currency`
    pub fn sum<'a>(
        currency: Currency,
        amounts: impl IntoIterator<Item = &'a Money>,
    ) -> Result<Money, String> {
        amounts
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.checked_add(m))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aud() -> Currency {
        Currency::new("AUD").unwrap()
    }

    #[test]
    fn test_currency_normalized_to_uppercase() {
        assert_eq!(Currency::new(" usd ").unwrap().as_str(), "USD");
    }

    #[test]
    fn test_currency_rejects_bad_codes() {
        assert!(Currency::new("").is_err());
        assert!(Currency::new("AU").is_err());
        assert!(Currency::new("A1D").is_err());
    }

    #[test]
    fn test_times_quantity() {
        let fee = Money::new(Decimal::new(3910, 2), aud());
        assert_eq!(fee.times(3).amount, Decimal::new(11730, 2));
    }

    #[test]
    fn test_checked_add_rejects_mixed_currency() {
        let a = Money::new(Decimal::ONE, aud());
        let b = Money::new(Decimal::ONE, Currency::new("NZD").unwrap());
        let err = a.checked_add(&b).unwrap_err();
        assert!(err.contains("NZD"));
        assert!(err.contains("AUD"));
    }

    #[test]
    fn test_rounding_midpoint_away_from_zero() {
        let m = Money::new(Decimal::new(10125, 3), aud());
        assert_eq!(m.rounded().amount, Decimal::new(1013, 2));
    }

    #[test]
    fn test_sum() {
        let items = vec![
            Money::new(Decimal::new(3910, 2), aud()),
            Money::new(Decimal::new(1790, 2), aud()),
        ];
        let total = Money::sum(aud(), &items).unwrap();
        assert_eq!(total.amount, Decimal::new(5700, 2));
    }

    #[test]
    fn test_display() {
        let m = Money::new(Decimal::new(391, 1), aud());
        assert_eq!(m.to_string(), "39.10 AUD");
    }
}
