//! Percentage fee on the order subtotal after earlier adjustments.

use rust_decimal::Decimal;

use crate::adjustment::{Adjustment, AdjustmentType};
use crate::error::CoreResult;
use crate::order::Order;
use crate::processor::OrderProcessor;
use crate::validation::{validate_identifier, validate_percentage};

/// Adds one order-level `Fee` adjustment.
///
/// The base is the subtotal plus the non-included adjustments of
/// `base_types`, so a fee registered below the promotion processor is
/// charged on the discounted subtotal.
#[derive(Debug, Clone)]
pub struct FeeProcessor {
    id: String,
    label: String,
    percentage: Decimal,
    base_types: Vec<AdjustmentType>,
    scale: u32,
}

impl FeeProcessor {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        percentage: Decimal,
        scale: u32,
    ) -> CoreResult<Self> {
        let id = id.into();
        validate_identifier("fee id", &id)?;
        validate_percentage("fee percentage", percentage)?;
        Ok(FeeProcessor {
            id,
            label: label.into(),
            percentage,
            base_types: vec![AdjustmentType::Shipping, AdjustmentType::Promotion],
            scale,
        })
    }

    /// Overrides which adjustment types count towards the base.
    pub fn with_base_types(mut self, base_types: Vec<AdjustmentType>) -> Self {
        self.base_types = base_types;
        self
    }
}

impl OrderProcessor for FeeProcessor {
    fn process(&self, order: &mut Order) -> CoreResult<()> {
        let base = order.adjusted_subtotal_price(&self.base_types)?;
        if !base.is_positive() {
            return Ok(());
        }

        let amount = base.multiply(self.percentage)?.round(self.scale);
        if amount.is_zero() {
            return Ok(());
        }

        order.add_adjustment(
            Adjustment::new(AdjustmentType::Fee, &self.label, amount)
                .with_percentage(self.percentage)
                .with_source_id(&self.id),
        )
    }
}
