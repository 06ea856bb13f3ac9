//! # Orders
//!
//! The order is owned by the host application. This module defines the
//! shape the pricing core reads from and writes adjustments onto.
//!
//! ## Order Totals
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  OrderItem.unit_price × quantity = OrderItem.total_price               │
//! │                 Σ total_price    = Order.subtotal_price                │
//! │                                                                         │
//! │  Order.total_price = subtotal                                          │
//! │                    + Σ item adjustments   (not included)               │
//! │                    + Σ order adjustments  (not included)               │
//! │                                                                         │
//! │  Included adjustments (e.g. VAT in EU prices) are already part of      │
//! │  unit_price; they are informational and never added again.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adjustment::{Adjustment, AdjustmentType};
use crate::error::{CoreError, CoreResult};
use crate::price::Price;
use crate::validation::{validate_currency_code, validate_identifier};

// =============================================================================
// Order Item
// =============================================================================

/// A line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,
    pub title: String,
    pub quantity: Decimal,
    pub unit_price: Price,
    #[serde(default)]
    adjustments: Vec<Adjustment>,
}

impl OrderItem {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        quantity: Decimal,
        unit_price: Price,
    ) -> Self {
        OrderItem {
            id: id.into(),
            title: title.into(),
            quantity,
            unit_price,
            adjustments: Vec::new(),
        }
    }

    /// Unit price × quantity, before adjustments.
    pub fn total_price(&self) -> CoreResult<Price> {
        self.unit_price.multiply(self.quantity)
    }

    /// Total plus the item's non-included adjustments.
    ///
    /// `types` restricts which adjustment types count; `None` counts all.
    pub fn adjusted_total_price(&self, types: Option<&[AdjustmentType]>) -> CoreResult<Price> {
        sum_adjustments(self.total_price()?, &self.adjustments, types)
    }

    pub fn adjustments(&self) -> &[Adjustment] {
        &self.adjustments
    }

    /// Appends an adjustment; its currency must match the unit price.
    pub fn add_adjustment(&mut self, adjustment: Adjustment) -> CoreResult<()> {
        ensure_currency(self.unit_price.currency_code(), &adjustment)?;
        self.adjustments.push(adjustment);
        Ok(())
    }

    /// Removes every adjustment of the given type, locked or not.
    pub fn remove_adjustments_by_type(&mut self, adjustment_type: AdjustmentType) {
        self.adjustments
            .retain(|a| a.adjustment_type() != adjustment_type);
    }

    fn clear_unlocked(&mut self, adjustment_type: AdjustmentType) -> usize {
        let before = self.adjustments.len();
        self.adjustments
            .retain(|a| a.adjustment_type() != adjustment_type || a.is_locked());
        before - self.adjustments.len()
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order being priced.
///
/// ## Invariants
/// - Every price and adjustment on the order shares `currency_code`
/// - `adjustments` keeps insertion order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Order type (e.g. "default", "b2b"); scopes promotions.
    pub order_type_id: String,

    /// Store the order belongs to; scopes promotions.
    pub store_id: String,

    /// ISO 4217 code shared by all amounts on the order.
    pub currency_code: String,

    /// Country used to match tax zones. `None` matches only zones
    /// without territories.
    #[serde(default)]
    pub customer_country: Option<String>,

    /// Date promotions and tax percentages are evaluated against.
    pub calculation_date: NaiveDate,

    #[serde(default)]
    items: Vec<OrderItem>,

    #[serde(default)]
    adjustments: Vec<Adjustment>,
}

impl Order {
    /// Creates an empty order with a fresh UUID.
    pub fn new(
        order_type_id: impl Into<String>,
        store_id: impl Into<String>,
        currency_code: impl Into<String>,
        calculation_date: NaiveDate,
    ) -> CoreResult<Self> {
        let order_type_id = order_type_id.into();
        let store_id = store_id.into();
        let currency_code = currency_code.into();
        validate_identifier("order_type_id", &order_type_id)?;
        validate_identifier("store_id", &store_id)?;
        validate_currency_code(&currency_code)?;

        Ok(Order {
            id: Uuid::new_v4().to_string(),
            order_type_id,
            store_id,
            currency_code,
            customer_country: None,
            calculation_date,
            items: Vec::new(),
            adjustments: Vec::new(),
        })
    }

    pub fn with_customer_country(mut self, country: impl Into<String>) -> Self {
        self.customer_country = Some(country.into());
        self
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Adds a line; its unit price must be in the order currency.
    pub fn add_item(&mut self, item: OrderItem) -> CoreResult<()> {
        if item.unit_price.currency_code() != self.currency_code {
            return Err(CoreError::CurrencyMismatch {
                expected: self.currency_code.clone(),
                found: item.unit_price.currency_code().to_string(),
            });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [OrderItem] {
        &mut self.items
    }

    // =========================================================================
    // Adjustments
    // =========================================================================

    /// Order-level adjustments in insertion order.
    pub fn adjustments(&self) -> &[Adjustment] {
        &self.adjustments
    }

    /// Appends an order-level adjustment.
    pub fn add_adjustment(&mut self, adjustment: Adjustment) -> CoreResult<()> {
        ensure_currency(&self.currency_code, &adjustment)?;
        self.adjustments.push(adjustment);
        Ok(())
    }

    /// Removes every order-level adjustment of the given type.
    pub fn remove_adjustments_by_type(&mut self, adjustment_type: AdjustmentType) {
        self.adjustments
            .retain(|a| a.adjustment_type() != adjustment_type);
    }

    /// Removes unlocked adjustments of a type from the order and its items.
    ///
    /// Returns how many adjustments were removed. Locked adjustments are
    /// kept, so manual entries survive a recalculation.
    pub fn clear_adjustments_by_type(&mut self, adjustment_type: AdjustmentType) -> usize {
        let before = self.adjustments.len();
        self.adjustments
            .retain(|a| a.adjustment_type() != adjustment_type || a.is_locked());
        let mut removed = before - self.adjustments.len();
        for item in &mut self.items {
            removed += item.clear_unlocked(adjustment_type);
        }
        removed
    }

    /// Item adjustments (in item order) followed by order adjustments.
    pub fn collect_adjustments(&self) -> Vec<Adjustment> {
        self.items
            .iter()
            .flat_map(|i| i.adjustments.iter())
            .chain(self.adjustments.iter())
            .cloned()
            .collect()
    }

    /// True when any order or item adjustment has the given source id.
    pub fn has_adjustment_from(&self, adjustment_type: AdjustmentType, source_id: &str) -> bool {
        self.collect_adjustments()
            .iter()
            .any(|a| a.adjustment_type() == adjustment_type && a.source_id() == Some(source_id))
    }

    // =========================================================================
    // Totals
    // =========================================================================

    /// Sum of item totals, before any adjustment.
    pub fn subtotal_price(&self) -> CoreResult<Price> {
        let mut subtotal = Price::zero(self.currency_code.clone())?;
        for item in &self.items {
            subtotal = subtotal.add(&item.total_price()?)?;
        }
        Ok(subtotal)
    }

    /// Subtotal plus non-included adjustments of the given types.
    ///
    /// Processors use this to see what earlier processors wrote, e.g. a fee
    /// on the subtotal after promotions.
    pub fn adjusted_subtotal_price(&self, types: &[AdjustmentType]) -> CoreResult<Price> {
        sum_adjustments(self.subtotal_price()?, &self.collect_adjustments(), Some(types))
    }

    /// Subtotal plus every non-included adjustment.
    pub fn total_price(&self) -> CoreResult<Price> {
        sum_adjustments(self.subtotal_price()?, &self.collect_adjustments(), None)
    }
}

fn sum_adjustments(
    base: Price,
    adjustments: &[Adjustment],
    types: Option<&[AdjustmentType]>,
) -> CoreResult<Price> {
    let mut total = base;
    for adjustment in adjustments {
        if adjustment.is_included() {
            continue;
        }
        if let Some(types) = types {
            if !types.contains(&adjustment.adjustment_type()) {
                continue;
            }
        }
        total = total.add(adjustment.amount())?;
    }
    Ok(total)
}

fn ensure_currency(currency_code: &str, adjustment: &Adjustment) -> CoreResult<()> {
    if adjustment.amount().currency_code() != currency_code {
        return Err(CoreError::CurrencyMismatch {
            expected: currency_code.to_string(),
            found: adjustment.amount().currency_code().to_string(),
        });
    }
    Ok(())
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

    fn order() -> Order {
        let mut order = Order::new(
            "default",
            "1",
            "USD",
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        )
        .unwrap();
        order
            .add_item(OrderItem::new("a", "Coffee", dec!(2), usd(dec!(4.50))))
            .unwrap();
        order
            .add_item(OrderItem::new("b", "Bagel", dec!(1), usd(dec!(3.00))))
            .unwrap();
        order
    }

    #[test]
    fn test_new_order_has_uuid() {
        let order = order();
        assert!(crate::validation::validate_uuid(&order.id).is_ok());
    }

    #[test]
    fn test_new_rejects_bad_input() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(Order::new("", "1", "USD", date).is_err());
        assert!(Order::new("default", "1", "usd", date).is_err());
    }

    #[test]
    fn test_subtotal_and_total() {
        let mut order = order();
        assert_eq!(order.subtotal_price().unwrap().number(), dec!(12.00));

        order
            .add_adjustment(Adjustment::new(
                AdjustmentType::Promotion,
                "Promo",
                usd(dec!(-2)),
            ))
            .unwrap();
        order.items_mut()[0]
            .add_adjustment(Adjustment::new(AdjustmentType::Tax, "Tax", usd(dec!(0.90))))
            .unwrap();
        // Included adjustments are informational only.
        order.items_mut()[1]
            .add_adjustment(
                Adjustment::new(AdjustmentType::Tax, "VAT", usd(dec!(0.50))).with_included(true),
            )
            .unwrap();

        assert_eq!(order.total_price().unwrap().number(), dec!(10.90));
        assert_eq!(
            order
                .adjusted_subtotal_price(&[AdjustmentType::Promotion])
                .unwrap()
                .number(),
            dec!(10.00)
        );
        assert_eq!(
            order.items()[0]
                .adjusted_total_price(None)
                .unwrap()
                .number(),
            dec!(9.90)
        );
    }

    #[test]
    fn test_add_adjustment_rejects_other_currency() {
        let mut order = order();
        let eur = Adjustment::new(
            AdjustmentType::Fee,
            "Fee",
            Price::new(dec!(1), "EUR").unwrap(),
        );
        assert!(order.add_adjustment(eur.clone()).is_err());
        assert!(order.items_mut()[0].add_adjustment(eur).is_err());
        assert!(order
            .add_item(OrderItem::new(
                "c",
                "Tea",
                dec!(1),
                Price::new(dec!(1), "EUR").unwrap()
            ))
            .is_err());
    }

    #[test]
    fn test_remove_adjustments_by_type() {
        let mut order = order();
        order
            .add_adjustment(Adjustment::new(AdjustmentType::Fee, "Fee", usd(dec!(1))))
            .unwrap();
        order
            .add_adjustment(
                Adjustment::new(AdjustmentType::Fee, "Manual fee", usd(dec!(1))).with_locked(true),
            )
            .unwrap();
        order
            .add_adjustment(Adjustment::new(AdjustmentType::Tax, "Tax", usd(dec!(1))))
            .unwrap();

        order.remove_adjustments_by_type(AdjustmentType::Fee);
        assert_eq!(order.adjustments().len(), 1);
        assert_eq!(order.adjustments()[0].adjustment_type(), AdjustmentType::Tax);
    }

    #[test]
    fn test_item_remove_adjustments_by_type() {
        let mut order = order();
        let item = &mut order.items_mut()[0];
        item.add_adjustment(
            Adjustment::new(AdjustmentType::Promotion, "Promo", usd(dec!(-1))).with_locked(true),
        )
        .unwrap();
        item.add_adjustment(Adjustment::new(AdjustmentType::Promotion, "Promo", usd(dec!(-1))))
            .unwrap();
        item.add_adjustment(Adjustment::new(AdjustmentType::Tax, "Tax", usd(dec!(0.80))))
            .unwrap();

        item.remove_adjustments_by_type(AdjustmentType::Promotion);
        assert_eq!(item.adjustments().len(), 1);
        assert_eq!(item.adjustments()[0].adjustment_type(), AdjustmentType::Tax);
        assert_eq!(item.adjusted_total_price(None).unwrap().number(), dec!(9.80));
    }

    #[test]
    fn test_clear_keeps_locked_and_reaches_items() {
        let mut order = order();
        order
            .add_adjustment(
                Adjustment::new(AdjustmentType::Fee, "Manual fee", usd(dec!(1))).with_locked(true),
            )
            .unwrap();
        order
            .add_adjustment(Adjustment::new(AdjustmentType::Fee, "Fee", usd(dec!(1))))
            .unwrap();
        order.items_mut()[0]
            .add_adjustment(Adjustment::new(AdjustmentType::Fee, "Item fee", usd(dec!(1))))
            .unwrap();

        let removed = order.clear_adjustments_by_type(AdjustmentType::Fee);
        assert_eq!(removed, 2);
        assert_eq!(order.adjustments().len(), 1);
        assert!(order.adjustments()[0].is_locked());
        assert!(order.items()[0].adjustments().is_empty());
    }

    #[test]
    fn test_collect_adjustments_order() {
        let mut order = order();
        order
            .add_adjustment(Adjustment::new(AdjustmentType::Fee, "Order", usd(dec!(1))))
            .unwrap();
        order.items_mut()[1]
            .add_adjustment(
                Adjustment::new(AdjustmentType::Tax, "Item", usd(dec!(1))).with_source_id("t"),
            )
            .unwrap();

        let labels: Vec<String> = order
            .collect_adjustments()
            .iter()
            .map(|a| a.label().to_string())
            .collect();
        assert_eq!(labels, vec!["Item", "Order"]);
        assert!(order.has_adjustment_from(AdjustmentType::Tax, "t"));
        assert!(!order.has_adjustment_from(AdjustmentType::Fee, "t"));
    }
}
