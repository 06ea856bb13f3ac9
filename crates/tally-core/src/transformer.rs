//! Adjustment post-processing: combining, sorting and rounding.
//!
//! Hosts call [`process_adjustments`] on `Order::collect_adjustments()` before
//! displaying a summary, so that per-item taxes from the same rate show up as
//! one line.

use std::collections::HashMap;

use crate::adjustment::{Adjustment, AdjustmentType};
use crate::error::CoreResult;

/// Merges adjustments that share a type and a source id.
///
/// Adjustments without a source id are kept as separate lines. The result
/// preserves the position of the first adjustment of each group.
pub fn combine_adjustments(adjustments: &[Adjustment]) -> CoreResult<Vec<Adjustment>> {
    let mut combined: Vec<Adjustment> = Vec::with_capacity(adjustments.len());
    let mut index: HashMap<(AdjustmentType, String, bool), usize> = HashMap::new();

    for adjustment in adjustments {
        let Some(source_id) = adjustment.source_id() else {
            combined.push(adjustment.clone());
            continue;
        };

        let key = (
            adjustment.adjustment_type(),
            source_id.to_string(),
            adjustment.is_included(),
        );
        match index.get(&key) {
            Some(&position) => {
                combined[position] = combined[position].add(adjustment)?;
            }
            None => {
                index.insert(key, combined.len());
                combined.push(adjustment.clone());
            }
        }
    }

    Ok(combined)
}

/// Stable sort by adjustment type weight.
pub fn sort_adjustments(adjustments: &mut [Adjustment]) {
    adjustments.sort_by_key(|a| a.adjustment_type().weight());
}

/// Rounds every amount to `scale` decimal places.
pub fn round_adjustments(adjustments: &[Adjustment], scale: u32) -> Vec<Adjustment> {
    adjustments
        .iter()
        .map(|a| a.with_amount(a.amount().round(scale)))
        .collect()
}

/// Combine, then sort, then round.
pub fn process_adjustments(adjustments: &[Adjustment], scale: u32) -> CoreResult<Vec<Adjustment>> {
    let mut combined = combine_adjustments(adjustments)?;
    sort_adjustments(&mut combined);
    Ok(round_adjustments(&combined, scale))
}
