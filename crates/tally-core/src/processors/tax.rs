//! Applies tax types to order items as `Tax` adjustments.
//!
//! ## Per Item, Per Zone
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for tax_type:                                                          │
//! │      zones = zone_resolver.zones_for(tax_type)   ← full snapshot first  │
//! │      keep zones matching order.customer_country                         │
//! │      for item, zone:                                                    │
//! │          rate = rate_resolver.resolve(zone, item)      (None → untaxed) │
//! │          pct  = resolve_rate(zone, rate, date)   (not in force → skip)  │
//! │          base = item total after promotions                             │
//! │          exclusive: base × pct                                          │
//! │          inclusive: base − base / (1 + pct)   (included = true)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use crate::adjustment::{Adjustment, AdjustmentType};
use crate::error::CoreResult;
use crate::order::Order;
use crate::processor::OrderProcessor;
use crate::tax::{resolve_rate, ChainTaxRateResolver, TaxType, TaxZoneResolver};

/// Computes item taxes for a fixed list of tax types.
pub struct TaxProcessor {
    tax_types: Vec<TaxType>,
    zone_resolver: Arc<TaxZoneResolver>,
    rate_resolver: Arc<ChainTaxRateResolver>,
    scale: u32,
}

impl TaxProcessor {
    pub fn new(
        tax_types: Vec<TaxType>,
        zone_resolver: Arc<TaxZoneResolver>,
        rate_resolver: Arc<ChainTaxRateResolver>,
        scale: u32,
    ) -> Self {
        TaxProcessor {
            tax_types,
            zone_resolver,
            rate_resolver,
            scale,
        }
    }

    fn item_adjustments(&self, tax_type: &TaxType, order: &Order) -> CoreResult<Vec<(usize, Adjustment)>> {
        let zones: Vec<_> = self
            .zone_resolver
            .zones_for(tax_type)
            .into_iter()
            .filter(|z| z.matches(order.customer_country.as_deref()))
            .collect();
        if zones.is_empty() {
            debug!(tax_type = %tax_type.id, "No tax zone matches the order");
            return Ok(Vec::new());
        }

        let mut pending = Vec::new();
        for (index, item) in order.items().iter().enumerate() {
            let base = item.adjusted_total_price(Some(&[AdjustmentType::Promotion]))?;

            for zone in &zones {
                let Some(rate) = self.rate_resolver.resolve(zone, item, order) else {
                    continue;
                };

                let percentage = match resolve_rate(zone, &rate.id, order.calculation_date) {
                    Ok(percentage) => percentage,
                    Err(e) if e.is_percentage_not_found() => {
                        debug!(
                            zone = %zone.id,
                            rate = %rate.id,
                            date = %order.calculation_date,
                            "Tax rate not in force yet, skipping"
                        );
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                let amount = if tax_type.display_inclusive {
                    base.subtract(&base.divide(Decimal::ONE + percentage)?)?
                } else {
                    base.multiply(percentage)?
                }
                .round(self.scale);

                if amount.is_zero() {
                    continue;
                }

                pending.push((
                    index,
                    Adjustment::new(AdjustmentType::Tax, &rate.label, amount)
                        .with_percentage(percentage)
                        .with_source_id(format!("{}|{}|{}", tax_type.id, zone.id, rate.id))
                        .with_included(tax_type.display_inclusive),
                ));
            }
        }
        Ok(pending)
    }
}

impl OrderProcessor for TaxProcessor {
    fn process(&self, order: &mut Order) -> CoreResult<()> {
        for tax_type in &self.tax_types {
            let pending = self.item_adjustments(tax_type, order)?;
            debug!(
                order_id = %order.id,
                tax_type = %tax_type.id,
                adjustments = pending.len(),
                "Tax type applied"
            );
            for (index, adjustment) in pending {
                order.items_mut()[index].add_adjustment(adjustment)?;
            }
        }
        Ok(())
    }
}
