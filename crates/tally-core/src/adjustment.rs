//! # Adjustments
//!
//! An [`Adjustment`] is a signed modification of an order or order item
//! total: a promotion, a tax, a fee. Adjustments are immutable values; to
//! change one, build a new one.
//!
//! ## Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Adjustment                                                             │
//! │  ─────────────────────────────────────────────────────────────────────  │
//! │  type        Tax                 ← which processor owns it              │
//! │  label       "VAT"                                                      │
//! │  amount      1.67 EUR            ← signed (promotions are negative)     │
//! │  percentage  Some(0.2)           ← when computed from a percentage      │
//! │  source_id   "vat|fr|standard"   ← origin, used to combine duplicates   │
//! │  included    true                ← already inside the base price        │
//! │  locked      false               ← recalculation may remove it          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::price::Price;

// =============================================================================
// Adjustment Type
// =============================================================================

/// The kind of an adjustment.
///
/// Each processor in the chain owns exactly one type and clears adjustments
/// of that type before recomputing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    /// Shipping charges.
    Shipping,
    /// Promotions and discounts (negative amounts).
    Promotion,
    /// Handling or service fees.
    Fee,
    /// Manually entered adjustments.
    Custom,
    /// Taxes.
    Tax,
}

impl AdjustmentType {
    /// Every known type, in weight order.
    pub const ALL: [AdjustmentType; 5] = [
        AdjustmentType::Shipping,
        AdjustmentType::Promotion,
        AdjustmentType::Fee,
        AdjustmentType::Custom,
        AdjustmentType::Tax,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            AdjustmentType::Shipping => "Shipping",
            AdjustmentType::Promotion => "Promotion",
            AdjustmentType::Fee => "Fee",
            AdjustmentType::Custom => "Custom",
            AdjustmentType::Tax => "Tax",
        }
    }

    /// Display weight; lighter types are listed first.
    pub fn weight(&self) -> i32 {
        match self {
            AdjustmentType::Shipping => 0,
            AdjustmentType::Promotion => 10,
            AdjustmentType::Fee => 20,
            AdjustmentType::Custom => 30,
            AdjustmentType::Tax => 40,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            AdjustmentType::Shipping => "shipping",
            AdjustmentType::Promotion => "promotion",
            AdjustmentType::Fee => "fee",
            AdjustmentType::Custom => "custom",
            AdjustmentType::Tax => "tax",
        }
    }
}

impl fmt::Display for AdjustmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdjustmentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdjustmentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "adjustment_type".to_string(),
                reason: format!(
                    "unknown adjustment type '{}'. Valid options: shipping, promotion, fee, custom, tax",
                    s
                ),
            })
    }
}

// =============================================================================
// Adjustment
// =============================================================================

/// A signed modification applied to an order or an order item.
///
/// Two adjustments are equal when every field is equal; amounts compare as
/// decimals, so `1.10` equals `1.1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    #[serde(rename = "type")]
    adjustment_type: AdjustmentType,
    label: String,
    amount: Price,
    #[serde(default)]
    percentage: Option<Decimal>,
    #[serde(default)]
    source_id: Option<String>,
    #[serde(default)]
    included: bool,
    #[serde(default)]
    locked: bool,
}

impl Adjustment {
    /// Creates an unlocked, non-included adjustment.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::{Adjustment, AdjustmentType, Price};
    ///
    /// let discount = Adjustment::new(
    ///     AdjustmentType::Promotion,
    ///     "Spring sale",
    ///     Price::new(Decimal::new(-500, 2), "USD").unwrap(),
    /// )
    /// .with_source_id("spring-sale");
    ///
    /// assert!(discount.is_negative());
    /// assert_eq!(discount.source_id(), Some("spring-sale"));
    /// ```
    pub fn new(adjustment_type: AdjustmentType, label: impl Into<String>, amount: Price) -> Self {
        Adjustment {
            adjustment_type,
            label: label.into(),
            amount,
            percentage: None,
            source_id: None,
            included: false,
            locked: false,
        }
    }

    /// Records the percentage the amount was computed from.
    pub fn with_percentage(mut self, percentage: Decimal) -> Self {
        self.percentage = Some(percentage);
        self
    }

    /// Records the originating entity (promotion id, tax rate id...).
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Marks the amount as already included in the base price.
    pub fn with_included(mut self, included: bool) -> Self {
        self.included = included;
        self
    }

    /// Locked adjustments survive recalculation.
    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Returns a copy with a different amount.
    pub fn with_amount(&self, amount: Price) -> Self {
        Adjustment {
            amount,
            ..self.clone()
        }
    }

    pub fn adjustment_type(&self) -> AdjustmentType {
        self.adjustment_type
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn amount(&self) -> &Price {
        &self.amount
    }

    pub fn percentage(&self) -> Option<Decimal> {
        self.percentage
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    pub fn is_included(&self) -> bool {
        self.included
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Positive adjustments raise the total (taxes, fees).
    pub fn is_positive(&self) -> bool {
        self.amount.is_positive()
    }

    /// Negative adjustments lower the total (promotions).
    pub fn is_negative(&self) -> bool {
        self.amount.is_negative()
    }

    /// Adds another adjustment from the same source.
    ///
    /// Both must share type, source id, inclusion and currency. The label,
    /// percentage and lock flag of `self` are kept.
    pub fn add(&self, other: &Adjustment) -> CoreResult<Adjustment> {
        self.ensure_compatible(other)?;
        Ok(self.with_amount(self.amount.add(&other.amount)?))
    }

    /// Subtracts another adjustment from the same source.
    pub fn subtract(&self, other: &Adjustment) -> CoreResult<Adjustment> {
        self.ensure_compatible(other)?;
        Ok(self.with_amount(self.amount.subtract(&other.amount)?))
    }

    /// Scales the amount, e.g. to split an order adjustment across items.
    pub fn multiply(&self, factor: Decimal) -> CoreResult<Adjustment> {
        Ok(self.with_amount(self.amount.multiply(factor)?))
    }

    /// Divides the amount.
    pub fn divide(&self, divisor: Decimal) -> CoreResult<Adjustment> {
        Ok(self.with_amount(self.amount.divide(divisor)?))
    }

    fn ensure_compatible(&self, other: &Adjustment) -> CoreResult<()> {
        let reason = if self.adjustment_type != other.adjustment_type {
            format!(
                "type {} does not match {}",
                self.adjustment_type, other.adjustment_type
            )
        } else if self.source_id != other.source_id {
            format!(
                "source {:?} does not match {:?}",
                self.source_id, other.source_id
            )
        } else if self.included != other.included {
            "included flags differ".to_string()
        } else {
            return Ok(());
        };
        Err(CoreError::IncompatibleAdjustments { reason })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
