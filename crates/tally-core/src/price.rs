//! # Price Module
//!
//! Provides the `Price` type: an exact decimal amount tagged with a currency.
//!
//! ## Why Decimal?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Tax percentages are fractional (0.0825, 0.196) and promotions are      │
//! │  percentages of percentages, so integer cents are not enough either.    │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal                                             │
//! │    Exact base-10 arithmetic, rounded explicitly at the edges           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use tally_core::price::Price;
//!
//! let price = Price::new(Decimal::new(1099, 2), "USD").unwrap(); // 10.99 USD
//! let doubled = price.multiply(Decimal::TWO).unwrap();
//! assert_eq!(doubled.number(), Decimal::new(2198, 2));
//!
//! // Currencies never mix silently
//! let euros = Price::new(Decimal::ONE, "EUR").unwrap();
//! assert!(price.add(&euros).is_err());
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::validate_currency_code;

// =============================================================================
// Price Type
// =============================================================================

/// A monetary amount in a specific currency.
///
/// ## Design Decisions
/// - **Decimal (signed)**: Negative values for promotions and refunds
/// - **Immutable**: Every operation returns a new `Price`
/// - **Exact equality**: `1.10 USD == 1.1 USD` (numeric, not textual)
///
/// ## Where Price is Used
/// ```text
/// OrderItem.unit_price ──► OrderItem.total_price ──► Order.subtotal_price
///                                                          │
/// Adjustment.amount (promotion, tax, fee) ─────────────────┤
///                                                          ▼
///                                                   Order.total_price
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price {
    number: Decimal,
    currency_code: String,
}

impl Price {
    /// Creates a price, validating the currency code.
    pub fn new(number: Decimal, currency_code: impl Into<String>) -> CoreResult<Self> {
        let currency_code = currency_code.into();
        validate_currency_code(&currency_code)?;
        Ok(Price {
            number,
            currency_code,
        })
    }

    /// Zero in the given currency.
    pub fn zero(currency_code: impl Into<String>) -> CoreResult<Self> {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Returns the numeric amount.
    #[inline]
    pub fn number(&self) -> Decimal {
        self.number
    }

    /// Returns the ISO 4217 currency code.
    #[inline]
    pub fn currency_code(&self) -> &str {
        &self.currency_code
    }

    /// Checks if the amount is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.number.is_zero()
    }

    /// Checks if the amount is greater than zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.number > Decimal::ZERO
    }

    /// Checks if the amount is less than zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.number < Decimal::ZERO
    }

    /// Adds two prices of the same currency.
    pub fn add(&self, other: &Price) -> CoreResult<Price> {
        self.ensure_same_currency(other)?;
        let number = self
            .number
            .checked_add(other.number)
            .ok_or_else(|| overflow("addition"))?;
        Ok(self.with_number(number))
    }

    /// Subtracts `other` from this price.
    pub fn subtract(&self, other: &Price) -> CoreResult<Price> {
        self.ensure_same_currency(other)?;
        let number = self
            .number
            .checked_sub(other.number)
            .ok_or_else(|| overflow("subtraction"))?;
        Ok(self.with_number(number))
    }

    /// Multiplies the amount (quantities, percentages).
    pub fn multiply(&self, factor: Decimal) -> CoreResult<Price> {
        let number = self
            .number
            .checked_mul(factor)
            .ok_or_else(|| overflow("multiplication"))?;
        Ok(self.with_number(number))
    }

    /// Divides the amount.
    ///
    /// Division by zero is rejected rather than panicking.
    pub fn divide(&self, divisor: Decimal) -> CoreResult<Price> {
        let number = self
            .number
            .checked_div(divisor)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "divisor".to_string(),
                reason: "must be non-zero and keep the result in range".to_string(),
            })?;
        Ok(self.with_number(number))
    }

    /// Flips the sign.
    pub fn negate(&self) -> Price {
        self.with_number(-self.number)
    }

    /// Returns the smaller of two prices of the same currency.
    pub fn min(&self, other: &Price) -> CoreResult<Price> {
        self.ensure_same_currency(other)?;
        Ok(if self.number <= other.number {
            self.clone()
        } else {
            other.clone()
        })
    }

    /// `self > other`, currencies must match.
    pub fn greater_than(&self, other: &Price) -> CoreResult<bool> {
        self.ensure_same_currency(other)?;
        Ok(self.number > other.number)
    }

    /// `self < other`, currencies must match.
    pub fn less_than(&self, other: &Price) -> CoreResult<bool> {
        self.ensure_same_currency(other)?;
        Ok(self.number < other.number)
    }

    /// Rounds to `scale` decimal places, half away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::price::Price;
    ///
    /// let tax = Price::new(Decimal::new(825, 3), "USD").unwrap(); // 0.825
    /// assert_eq!(tax.round(2).number(), Decimal::new(83, 2));    // 0.83
    /// ```
    pub fn round(&self, scale: u32) -> Price {
        self.with_number(
            self.number
                .round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    fn with_number(&self, number: Decimal) -> Price {
        Price {
            number,
            currency_code: self.currency_code.clone(),
        }
    }

    fn ensure_same_currency(&self, other: &Price) -> CoreResult<()> {
        if self.currency_code != other.currency_code {
            return Err(CoreError::CurrencyMismatch {
                expected: self.currency_code.clone(),
                found: other.currency_code.clone(),
            });
        }
        Ok(())
    }
}

/// Shows the amount followed by the currency code, e.g. `10.99 USD`.
impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.currency_code)
    }
}

fn overflow(operation: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field: "amount".to_string(),
        reason: format!("{operation} overflows the decimal range"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd(number: Decimal) -> Price {
        Price::new(number, "USD").unwrap()
    }

    #[test]
    fn test_new_validates_currency() {
        assert!(Price::new(dec!(1), "USD").is_ok());
        assert!(Price::new(dec!(1), "usd").is_err());
        assert!(Price::new(dec!(1), "").is_err());
        assert!(Price::new(dec!(1), "DOLLARS").is_err());
    }

    #[test]
    fn test_equality_is_numeric() {
        assert_eq!(usd(dec!(1.10)), usd(dec!(1.1)));
        assert_ne!(usd(dec!(1.10)), Price::new(dec!(1.10), "EUR").unwrap());
    }

    #[test]
    fn test_arithmetic() {
        let a = usd(dec!(10.00));
        let b = usd(dec!(2.50));

        assert_eq!(a.add(&b).unwrap().number(), dec!(12.50));
        assert_eq!(a.subtract(&b).unwrap().number(), dec!(7.50));
        assert_eq!(b.multiply(dec!(3)).unwrap().number(), dec!(7.50));
        assert_eq!(a.divide(dec!(4)).unwrap().number(), dec!(2.5));
        assert_eq!(b.negate().number(), dec!(-2.50));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let max = usd(Decimal::MAX);

        assert!(matches!(
            max.add(&usd(Decimal::MAX)),
            Err(CoreError::Validation(ValidationError::InvalidFormat { .. }))
        ));
        assert!(usd(Decimal::MIN).subtract(&max).is_err());
        assert!(max.multiply(dec!(2)).is_err());
        assert_eq!(max.multiply(Decimal::ONE).unwrap(), max);
    }

    #[test]
    fn test_currency_mismatch() {
        let eur = Price::new(dec!(1), "EUR").unwrap();
        let err = usd(dec!(1)).add(&eur).unwrap_err();
        assert!(matches!(err, CoreError::CurrencyMismatch { .. }));
        assert!(usd(dec!(1)).greater_than(&eur).is_err());
    }

    #[test]
    fn test_divide_by_zero_is_error() {
        assert!(usd(dec!(1)).divide(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(usd(dec!(0.825)).round(2).number(), dec!(0.83));
        assert_eq!(usd(dec!(-0.825)).round(2).number(), dec!(-0.83));
        assert_eq!(usd(dec!(0.824)).round(2).number(), dec!(0.82));
    }

    #[test]
    fn test_sign_checks() {
        assert!(usd(dec!(0)).is_zero());
        assert!(usd(dec!(0.01)).is_positive());
        assert!(usd(dec!(-0.01)).is_negative());
    }

    #[test]
    fn test_display() {
        assert_eq!(usd(dec!(10.99)).to_string(), "10.99 USD");
        assert_eq!(usd(dec!(-5.5)).to_string(), "-5.5 USD");
    }

    #[test]
    fn test_min() {
        let low = usd(dec!(3));
        let high = usd(dec!(5));
        assert_eq!(high.min(&low).unwrap(), low);
    }
}
