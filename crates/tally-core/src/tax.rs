//! # Tax Zones & Rates
//!
//! A tax type (e.g. "EU VAT") owns zones; a zone owns rates; a rate owns a
//! schedule of percentages keyed by the day they take effect.
//!
//! ## Rate Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Rate "standard"                                                        │
//! │    0.10 from 2020-01-01                                                 │
//! │    0.15 from 2023-01-01                                                 │
//! │                                                                         │
//! │  resolve_rate(.., 2019-01-01)  → PercentageNotFound  (not yet in force) │
//! │  resolve_rate(.., 2022-06-01)  → 0.10                                   │
//! │  resolve_rate(.., 2023-01-01)  → 0.15                                   │
//! │                                                                         │
//! │  Rule: the entry with the latest start_date <= evaluation date.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Zone Snapshots
//! Zones are shared as `Arc<TaxZone>` and never mutated. A [`ZoneAlterer`]
//! that wants a different zone returns a new one; [`TaxZoneResolver`]
//! applies every alterer to every zone before handing out the snapshot, so
//! rate lookups never observe a half-altered zone.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::order::{Order, OrderItem};
use crate::validation::{validate_identifier, validate_percentage};

// =============================================================================
// Tax Rate
// =============================================================================

/// One entry of a rate's schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRatePercentage {
    /// Fractional percentage (`0.2` = 20%).
    pub number: Decimal,
    /// First day this percentage applies.
    pub start_date: NaiveDate,
}

/// A named component of a zone with a time-varying percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate {
    pub id: String,
    pub label: String,
    /// Schedule, ascending by `start_date`.
    pub percentages: Vec<TaxRatePercentage>,
    /// Picked by [`DefaultTaxRateResolver`].
    #[serde(default)]
    pub default: bool,
}

impl TaxRate {
    /// Builds a rate, validating and sorting the schedule.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        mut percentages: Vec<TaxRatePercentage>,
    ) -> CoreResult<Self> {
        let id = id.into();
        validate_identifier("tax rate id", &id)?;
        for percentage in &percentages {
            validate_percentage(&format!("tax rate {} percentage", id), percentage.number)?;
        }
        percentages.sort_by_key(|p| p.start_date);

        Ok(TaxRate {
            id,
            label: label.into(),
            percentages,
            default: false,
        })
    }

    pub fn with_default(mut self, default: bool) -> Self {
        self.default = default;
        self
    }

    /// The percentage in force on `date`, if any.
    ///
    /// Does not rely on the schedule being sorted; on equal start dates the
    /// later entry wins.
    pub fn percentage_for(&self, date: NaiveDate) -> Option<&TaxRatePercentage> {
        self.percentages
            .iter()
            .filter(|p| p.start_date <= date)
            .max_by_key(|p| p.start_date)
    }
}

// =============================================================================
// Tax Zone
// =============================================================================

/// A jurisdiction: the territories it covers and the rates that apply there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxZone {
    pub id: String,
    pub label: String,
    /// ISO 3166 country codes. Empty = applies everywhere.
    #[serde(default)]
    pub territories: Vec<String>,
    pub rates: Vec<TaxRate>,
}

impl TaxZone {
    pub fn rate(&self, rate_id: &str) -> Option<&TaxRate> {
        self.rates.iter().find(|r| r.id == rate_id)
    }

    /// Whether the zone covers `country`.
    pub fn matches(&self, country: Option<&str>) -> bool {
        if self.territories.is_empty() {
            return true;
        }
        country.map_or(false, |country| {
            self.territories
                .iter()
                .any(|t| t.eq_ignore_ascii_case(country))
        })
    }
}

/// Resolves the percentage of `rate_id` in `zone` on `date`.
///
/// ## Errors
/// - `TaxRateNotFound` - no rate with that id in the zone
/// - `PercentageNotFound` - the rate exists but nothing is in force yet;
///   callers must not treat this as 0%
pub fn resolve_rate(zone: &TaxZone, rate_id: &str, date: NaiveDate) -> CoreResult<Decimal> {
    let rate = zone.rate(rate_id).ok_or_else(|| CoreError::TaxRateNotFound {
        zone: zone.id.clone(),
        rate: rate_id.to_string(),
    })?;

    rate.percentage_for(date)
        .map(|p| p.number)
        .ok_or_else(|| CoreError::PercentageNotFound {
            zone: zone.id.clone(),
            rate: rate_id.to_string(),
            date,
        })
}

// =============================================================================
// Tax Type
// =============================================================================

/// A family of zones computed the same way (e.g. "EU VAT", "US sales tax").
#[derive(Debug, Clone)]
pub struct TaxType {
    pub id: String,
    pub label: String,
    /// Prices already contain this tax (VAT-style); adjustments are
    /// recorded as included.
    pub display_inclusive: bool,
    pub zones: Vec<Arc<TaxZone>>,
}

// =============================================================================
// Zone Alteration
// =============================================================================

/// Extension point run before any rate lookup for a tax type.
///
/// Return `Some(new_zone)` to replace the zone wholesale, `None` to leave it.
pub trait ZoneAlterer: Send + Sync {
    fn alter_zone(&self, tax_type_id: &str, zone: &TaxZone) -> Option<TaxZone>;
}

impl<F> ZoneAlterer for F
where
    F: Fn(&str, &TaxZone) -> Option<TaxZone> + Send + Sync,
{
    fn alter_zone(&self, tax_type_id: &str, zone: &TaxZone) -> Option<TaxZone> {
        self(tax_type_id, zone)
    }
}

/// Produces complete zone snapshots for a tax type.
#[derive(Default)]
pub struct TaxZoneResolver {
    alterers: Vec<Box<dyn ZoneAlterer>>,
}

impl TaxZoneResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alterers run in registration order; each sees the previous result.
    pub fn with_alterer(mut self, alterer: impl ZoneAlterer + 'static) -> Self {
        self.alterers.push(Box::new(alterer));
        self
    }

    pub fn add_alterer(&mut self, alterer: Box<dyn ZoneAlterer>) {
        self.alterers.push(alterer);
    }

    /// Every zone of `tax_type`, after all alterers ran.
    pub fn zones_for(&self, tax_type: &TaxType) -> Vec<Arc<TaxZone>> {
        tax_type
            .zones
            .iter()
            .map(|zone| {
                let mut current = Arc::clone(zone);
                for alterer in &self.alterers {
                    if let Some(altered) = alterer.alter_zone(&tax_type.id, &current) {
                        debug!(tax_type = %tax_type.id, zone = %altered.id, "Tax zone altered");
                        current = Arc::new(altered);
                    }
                }
                current
            })
            .collect()
    }
}

impl std::fmt::Debug for TaxZoneResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaxZoneResolver")
            .field("alterers", &self.alterers.len())
            .finish()
    }
}

// =============================================================================
// Rate Selection
// =============================================================================

/// Outcome of a [`TaxRateResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateResolution<'z> {
    /// Use this rate.
    Rate(&'z TaxRate),
    /// The item is not taxed in this zone; stop asking other resolvers.
    NoApplicableRate,
}

/// Chooses which rate of a zone applies to an order item.
///
/// Returning `None` defers to the next resolver in the chain.
pub trait TaxRateResolver: Send + Sync {
    fn resolve<'z>(
        &self,
        zone: &'z TaxZone,
        item: &OrderItem,
        order: &Order,
    ) -> Option<RateResolution<'z>>;
}

/// Picks the rate flagged `default`, or the zone's only rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTaxRateResolver;

impl TaxRateResolver for DefaultTaxRateResolver {
    fn resolve<'z>(
        &self,
        zone: &'z TaxZone,
        _item: &OrderItem,
        _order: &Order,
    ) -> Option<RateResolution<'z>> {
        zone.rates
            .iter()
            .find(|r| r.default)
            .or(match zone.rates.as_slice() {
                [only] => Some(only),
                _ => None,
            })
            .map(RateResolution::Rate)
    }
}

/// Asks resolvers in order; the first answer wins.
pub struct ChainTaxRateResolver {
    resolvers: Vec<Box<dyn TaxRateResolver>>,
}

impl ChainTaxRateResolver {
    pub fn new(resolvers: Vec<Box<dyn TaxRateResolver>>) -> Self {
        ChainTaxRateResolver { resolvers }
    }

    /// Resolved rate, or `None` when the item is untaxed in this zone.
    pub fn resolve<'z>(
        &self,
        zone: &'z TaxZone,
        item: &OrderItem,
        order: &Order,
    ) -> Option<&'z TaxRate> {
        self.resolvers
            .iter()
            .find_map(|r| r.resolve(zone, item, order))
            .and_then(|resolution| match resolution {
                RateResolution::Rate(rate) => Some(rate),
                RateResolution::NoApplicableRate => None,
            })
    }
}

impl Default for ChainTaxRateResolver {
    fn default() -> Self {
        ChainTaxRateResolver::new(vec![Box::new(DefaultTaxRateResolver)])
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
