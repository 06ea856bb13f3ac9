//! Applies valid promotions as negative `Promotion` adjustments.
//!
//! Every promotion adjustment lands on order items, so processors that run
//! later (tax in particular) see discounted item totals. Order-level offers
//! are split across items in proportion to their totals; the last item
//! absorbs the rounding remainder so the split always sums to the offer.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use crate::adjustment::{Adjustment, AdjustmentType};
use crate::error::CoreResult;
use crate::order::Order;
use crate::price::Price;
use crate::processor::OrderProcessor;
use crate::promotion::{Compatibility, Promotion, PromotionOffer, PromotionStorage};

const PROMOTION_ONLY: &[AdjustmentType] = &[AdjustmentType::Promotion];

/// Loads promotions from a [`PromotionStorage`] and applies their offers.
pub struct PromotionProcessor {
    storage: Arc<dyn PromotionStorage>,
    scale: u32,
}

impl PromotionProcessor {
    pub fn new(storage: Arc<dyn PromotionStorage>, scale: u32) -> Self {
        PromotionProcessor { storage, scale }
    }

    /// Applies one promotion. Returns false when it discounted nothing.
    fn apply(&self, promotion: &Promotion, order: &mut Order) -> CoreResult<bool> {
        let discounts: Vec<(usize, Price)> = match &promotion.offer {
            PromotionOffer::OrderPercentageOff { percentage } => {
                let base = order.adjusted_subtotal_price(PROMOTION_ONLY)?;
                if !base.is_positive() {
                    return Ok(false);
                }
                let amount = base.multiply(*percentage)?.round(self.scale);
                split_across_items(order, &amount, self.scale)?
            }
            PromotionOffer::OrderFixedAmountOff { amount } => {
                if amount.currency_code() != order.currency_code {
                    debug!(
                        promotion = %promotion.id,
                        currency = %amount.currency_code(),
                        "Fixed amount promotion does not match the order currency"
                    );
                    return Ok(false);
                }
                let base = order.adjusted_subtotal_price(PROMOTION_ONLY)?;
                if !base.is_positive() {
                    return Ok(false);
                }
                // Never discount below zero.
                let amount = amount.min(&base)?;
                split_across_items(order, &amount, self.scale)?
            }
            PromotionOffer::ItemPercentageOff { percentage } => {
                let mut discounts = Vec::new();
                for (index, item) in order.items().iter().enumerate() {
                    let base = item.adjusted_total_price(Some(PROMOTION_ONLY))?;
                    if base.is_positive() {
                        discounts.push((index, base.multiply(*percentage)?.round(self.scale)));
                    }
                }
                discounts
            }
        };

        let percentage = match &promotion.offer {
            PromotionOffer::OrderPercentageOff { percentage }
            | PromotionOffer::ItemPercentageOff { percentage } => Some(*percentage),
            PromotionOffer::OrderFixedAmountOff { .. } => None,
        };

        let mut applied = false;
        for (index, discount) in discounts {
            if discount.is_zero() {
                continue;
            }
            let mut adjustment =
                Adjustment::new(AdjustmentType::Promotion, &promotion.name, discount.negate())
                    .with_source_id(&promotion.id);
            if let Some(percentage) = percentage {
                adjustment = adjustment.with_percentage(percentage);
            }
            order.items_mut()[index].add_adjustment(adjustment)?;
            applied = true;
        }
        Ok(applied)
    }
}

impl OrderProcessor for PromotionProcessor {
    fn process(&self, order: &mut Order) -> CoreResult<()> {
        let mut promotions =
            self.storage
                .load_valid(&order.order_type_id, &order.store_id, order.calculation_date)?;
        promotions.sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.id.cmp(&b.id)));

        // Locked promotion adjustments survived the clear and count as applied.
        let mut any_applied = order
            .collect_adjustments()
            .iter()
            .any(|a| a.adjustment_type() == AdjustmentType::Promotion);

        for promotion in &promotions {
            if promotion.compatibility == Compatibility::None && any_applied {
                debug!(promotion = %promotion.id, "Skipping promotion that cannot be combined");
                continue;
            }

            if self.apply(promotion, order)? {
                debug!(order_id = %order.id, promotion = %promotion.id, "Promotion applied");
                any_applied = true;
                if promotion.compatibility == Compatibility::None {
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Splits `amount` across items proportionally to their totals after
/// promotions. Items with non-positive totals receive nothing.
fn split_across_items(order: &Order, amount: &Price, scale: u32) -> CoreResult<Vec<(usize, Price)>> {
    let mut weights: Vec<(usize, Decimal)> = Vec::new();
    for (index, item) in order.items().iter().enumerate() {
        let total = item.adjusted_total_price(Some(PROMOTION_ONLY))?.number();
        if total > Decimal::ZERO {
            weights.push((index, total));
        }
    }
    let sum: Decimal = weights.iter().map(|(_, w)| *w).sum();
    if sum.is_zero() {
        return Ok(Vec::new());
    }

    let mut shares = Vec::with_capacity(weights.len());
    let mut remaining = amount.clone();
    let last = weights.len() - 1;
    for (position, (index, weight)) in weights.into_iter().enumerate() {
        let share = if position == last {
            remaining.clone()
        } else {
            amount.multiply(weight)?.divide(sum)?.round(scale)
        };
        remaining = remaining.subtract(&share)?;
        shares.push((index, share));
    }
    Ok(shares)
}
