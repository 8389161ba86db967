//! Rupiah prices using decimal arithmetic.
//!
//! The shop only sells in Indonesian rupiah, so a price is a non-negative
//! [`Decimal`] amount with no currency tag. Display follows the local
//! convention: `Rp 25.000`, with a `,50` suffix only when there are cents.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::Quantity;

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Prices cannot be negative.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
}

/// A non-negative amount in rupiah.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// A price of zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of rupiah.
    #[must_use]
    pub fn from_rupiah(rupiah: u64) -> Self {
        Self(Decimal::from(rupiah))
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(self, quantity: Quantity) -> Self {
        Self(self.0 * Decimal::from(quantity.get()))
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.0.round_dp(2);
        let whole = rounded.trunc().to_u128().unwrap_or_default();
        let cents = (rounded.fract() * Decimal::ONE_HUNDRED)
            .to_u32()
            .unwrap_or_default();

        write!(f, "Rp {}", group_thousands(whole))?;
        if cents > 0 {
            write!(f, ",{cents:02}")?;
        }
        Ok(())
    }
}

/// Format an integer with `.` as the thousands separator.
fn group_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Price::from_rupiah(0).to_string(), "Rp 0");
        assert_eq!(Price::from_rupiah(950).to_string(), "Rp 950");
        assert_eq!(Price::from_rupiah(25_000).to_string(), "Rp 25.000");
        assert_eq!(Price::from_rupiah(1_250_000).to_string(), "Rp 1.250.000");
    }

    #[test]
    fn test_display_shows_cents_only_when_present() {
        let price = Price::new(Decimal::new(1_850_050, 2)).unwrap();
        assert_eq!(price.to_string(), "Rp 18.500,50");
    }

    #[test]
    fn test_negative_rejected() {
        assert!(Price::new(Decimal::new(-1, 0)).is_err());
        assert!(serde_json::from_str::<Price>("-5").is_err());
    }

    #[test]
    fn test_deserializes_from_number_or_string() {
        let from_number: Price = serde_json::from_str("28000").unwrap();
        let from_string: Price = serde_json::from_str("\"28000\"").unwrap();
        assert_eq!(from_number, Price::from_rupiah(28_000));
        assert_eq!(from_string, from_number);
    }

    #[test]
    fn test_times_and_sum() {
        let qty = Quantity::new(3).unwrap();
        let line = Price::from_rupiah(18_000).times(qty);
        assert_eq!(line, Price::from_rupiah(54_000));

        let total: Price = [line, Price::from_rupiah(6_000)].into_iter().sum();
        assert_eq!(total, Price::from_rupiah(60_000));
    }
}
