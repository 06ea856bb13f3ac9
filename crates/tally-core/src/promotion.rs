//! # Promotions
//!
//! Promotion records and the eligibility filter that decides which ones an
//! order may receive.
//!
//! ## Eligibility
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A promotion is valid for (order_type, store, today) iff ALL hold:      │
//! │                                                                         │
//! │   status                         enabled                                │
//! │   store       ∈ store_ids        (empty set never matches)              │
//! │   order_type  ∈ order_type_ids   (empty set never matches)              │
//! │   start_date  <= today           inclusive                              │
//! │   end_date    >= today           inclusive, None = open-ended           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dates are calendar days in UTC; there is no time-of-day component.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::price::Price;
use crate::validation::{
    validate_currency_code, validate_date_window, validate_identifier, validate_percentage,
};

// =============================================================================
// Offer & Compatibility
// =============================================================================

/// What a promotion gives once it applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromotionOffer {
    /// Percentage off the order subtotal (`0.1` = 10%).
    OrderPercentageOff { percentage: Decimal },
    /// Fixed amount off the order subtotal.
    OrderFixedAmountOff { amount: Price },
    /// Percentage off every item's total.
    ItemPercentageOff { percentage: Decimal },
}

/// Whether a promotion can be combined with others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compatibility {
    /// Stacks with any other promotion.
    #[default]
    Any,
    /// Applies only alone; blocks every later promotion.
    None,
}

// =============================================================================
// Promotion
// =============================================================================

/// A scoped, time-bounded price reduction.
///
/// Promotions are read-only while orders are processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
    pub id: String,
    pub name: String,
    pub store_ids: BTreeSet<String>,
    pub order_type_ids: BTreeSet<String>,
    pub start_date: NaiveDate,
    /// Last valid day. `None` never expires.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub status: bool,
    /// Application order; lighter first.
    #[serde(default)]
    pub weight: i32,
    pub offer: PromotionOffer,
    #[serde(default)]
    pub compatibility: Compatibility,
}

impl Promotion {
    /// Checks the record before it is handed to a storage.
    pub fn validate(&self) -> CoreResult<()> {
        validate_identifier("promotion id", &self.id)?;
        validate_date_window(&format!("promotion {}", self.id), self.start_date, self.end_date)?;
        match &self.offer {
            PromotionOffer::OrderPercentageOff { percentage }
            | PromotionOffer::ItemPercentageOff { percentage } => {
                validate_percentage(&format!("promotion {} percentage", self.id), *percentage)?;
            }
            PromotionOffer::OrderFixedAmountOff { amount } => {
                // Deserialized prices skip `Price::new`.
                validate_currency_code(amount.currency_code())?;
                if !amount.is_positive() {
                    return Err(ValidationError::InvalidFormat {
                        field: format!("promotion {} amount", self.id),
                        reason: "must be greater than zero".to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Returns true when the promotion applies to the order type and store
    /// on the given day.
    ///
    /// ## Example
    /// ```rust
    /// # use std::collections::BTreeSet;
    /// # use chrono::NaiveDate;
    /// # use rust_decimal::Decimal;
    /// # use tally_core::promotion::{Compatibility, Promotion, PromotionOffer};
    /// let promotion = Promotion {
    ///     id: "summer".into(),
    ///     name: "Summer".into(),
    ///     store_ids: BTreeSet::from(["1".to_string()]),
    ///     order_type_ids: BTreeSet::from(["default".to_string()]),
    ///     start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    ///     end_date: NaiveDate::from_ymd_opt(2024, 12, 31),
    ///     status: true,
    ///     weight: 0,
    ///     offer: PromotionOffer::OrderPercentageOff { percentage: Decimal::new(1, 1) },
    ///     compatibility: Compatibility::Any,
    /// };
    /// let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
    /// assert!(promotion.is_valid_for("default", "1", today));
    /// assert!(!promotion.is_valid_for("default", "2", today));
    /// ```
    pub fn is_valid_for(&self, order_type_id: &str, store_id: &str, today: NaiveDate) -> bool {
        self.status
            && self.store_ids.contains(store_id)
            && self.order_type_ids.contains(order_type_id)
            && self.start_date <= today
            && self.end_date.map_or(true, |end| end >= today)
    }
}

/// Filters `promotions` down to those valid for the order type, store and day.
///
/// Result order follows the input and carries no meaning; the applying
/// processor decides the order.
pub fn filter_valid<'a, I>(
    promotions: I,
    order_type_id: &str,
    store_id: &str,
    today: NaiveDate,
) -> Vec<Promotion>
where
    I: IntoIterator<Item = &'a Promotion>,
{
    promotions
        .into_iter()
        .filter(|p| p.is_valid_for(order_type_id, store_id, today))
        .cloned()
        .collect()
}

// =============================================================================
// Storage
// =============================================================================

/// Supplies the promotions valid for an order.
///
/// Implementations are expected to answer from an index or memory; the
/// chain calls this synchronously for every recalculation. "Nothing
/// matches" is an empty `Vec`, never an error.
pub trait PromotionStorage: Send + Sync {
    fn load_valid(
        &self,
        order_type_id: &str,
        store_id: &str,
        today: NaiveDate,
    ) -> CoreResult<Vec<Promotion>>;
}

// =============================================================================
// Unit Tests
// =============================================================================
