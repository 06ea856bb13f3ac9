//! # Validation Module
//!
//! Input validation for records entering the pricing core.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: pricing.toml (tally-config)                                  │
//! │  ├── Deserialization (types, required fields)                          │
//! │  └── PricingConfig::validate                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Currency codes, identifiers                                       │
//! │  └── Percentages, date windows                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Constructors (Price::new, Promotion::new, TaxRate::new)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_currency_code, validate_identifier};
//!
//! validate_currency_code("EUR").unwrap();
//! validate_identifier("promotion_id", "spring-sale").unwrap();
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::MAX_IDENTIFIER_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an ISO 4217 currency code.
///
/// ## Rules
/// - Exactly three characters
/// - ASCII uppercase letters only
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_currency_code;
///
/// assert!(validate_currency_code("USD").is_ok());
/// assert!(validate_currency_code("usd").is_err());
/// assert!(validate_currency_code("").is_err());
/// ```
pub fn validate_currency_code(code: &str) -> ValidationResult<()> {
    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "currency_code".to_string(),
        });
    }

    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency_code".to_string(),
            reason: format!("'{}' is not a three-letter uppercase code", code),
        });
    }

    Ok(())
}

/// Validates an identifier (promotion, zone, rate, processor, store...).
///
/// ## Rules
/// - Must not be empty
/// - At most 128 characters
/// - Letters, digits and `_ . : -` only
pub fn validate_identifier(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if id.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_IDENTIFIER_LENGTH,
        });
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-'))
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, and _ . : -".to_string(),
        });
    }

    Ok(())
}

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a fractional percentage (`0.2` = 20%).
///
/// ## Rules
/// - Between 0 and 1 inclusive
/// - 0 is allowed (zero-rated goods are a real tax rate)
pub fn validate_percentage(field: &str, percentage: Decimal) -> ValidationResult<()> {
    if percentage < Decimal::ZERO || percentage > Decimal::ONE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0".to_string(),
            max: "1".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates that a date window does not end before it starts.
///
/// A single-day window (`start == end`) is valid.
pub fn validate_date_window(
    field: &str,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> ValidationResult<()> {
    match end {
        Some(end) if end < start => Err(ValidationError::InvalidDateWindow {
            field: field.to_string(),
            start,
            end,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_validate_currency_code() {
        assert!(validate_currency_code("USD").is_ok());
        assert!(validate_currency_code("EUR").is_ok());

        assert!(validate_currency_code("").is_err());
        assert!(validate_currency_code("US").is_err());
        assert!(validate_currency_code("usd").is_err());
        assert!(validate_currency_code("US1").is_err());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("id", "spring-sale").is_ok());
        assert!(validate_identifier("id", "tax_rate:fr.standard").is_ok());

        assert!(validate_identifier("id", "").is_err());
        assert!(validate_identifier("id", "   ").is_err());
        assert!(validate_identifier("id", "has space").is_err());
        assert!(validate_identifier("id", &"a".repeat(200)).is_err());
    }

    #[test]
    fn test_validate_percentage() {
        assert!(validate_percentage("p", dec!(0)).is_ok());
        assert!(validate_percentage("p", dec!(0.2)).is_ok());
        assert!(validate_percentage("p", dec!(1)).is_ok());

        assert!(validate_percentage("p", dec!(-0.01)).is_err());
        assert!(validate_percentage("p", dec!(1.01)).is_err());
    }

    #[test]
    fn test_validate_date_window() {
        assert!(validate_date_window("w", date(2024, 1, 1), Some(date(2024, 1, 1))).is_ok());
        assert!(validate_date_window("w", date(2024, 1, 1), None).is_ok());
        assert!(validate_date_window("w", date(2024, 2, 1), Some(date(2024, 1, 1))).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }
}
