//! # Pricing Runtime
//!
//! Turns a [`PricingConfig`] into a ready [`PriceCalculator`].
//!
//! ## Wiring
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PricingConfig                                                          │
//! │      │                                                                  │
//! │      ├── promotions ──► InMemoryPromotionStorage ──┐                    │
//! │      ├── tax_types  ──► TaxTypeStore ──────────────┤                    │
//! │      ├── fee        ──► FeeProcessor ──────────────┤                    │
//! │      │                                             ▼                    │
//! │      │                     ProcessorRegistry { promotion, tax, fee }    │
//! │      │                                             │                    │
//! │      └── processors ──────────────► registry.build(entries)             │
//! │                                                    │                    │
//! │                                                    ▼                    │
//! │                                            PriceCalculator              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Zone alterers are passed in by the host; they are code, not catalog data.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use tally_core::processors::{FeeProcessor, PromotionProcessor, TaxProcessor};
use tally_core::{
    ChainTaxRateResolver, CoreResult, Order, OrderProcessor, PriceCalculator, ProcessorRegistry,
    TaxZoneResolver, ZoneAlterer,
};
use tracing::info;

use crate::config::PricingConfig;
use crate::error::ConfigResult;
use crate::store::{InMemoryPromotionStorage, TaxTypeStore};

/// Processor ids the runtime registers.
pub const PROMOTION_PROCESSOR: &str = "promotion";
pub const TAX_PROCESSOR: &str = "tax";
pub const FEE_PROCESSOR: &str = "fee";

/// The assembled pricing pipeline and the stores behind it.
#[derive(Debug)]
pub struct PricingRuntime {
    default_currency: String,
    promotions: Arc<InMemoryPromotionStorage>,
    tax_types: TaxTypeStore,
    calculator: PriceCalculator,
}

impl PricingRuntime {
    /// Validates `config`, builds the stores and assembles the chain.
    ///
    /// ## Errors
    /// - `ConfigError::Core` / `InvalidConfig` - a catalog record is invalid
    /// - `ConfigError::Pipeline` - `[[processors]]` names an unregistered id
    ///   (including `fee` without a `[fee]` section) or omits an
    ///   adjustment type
    pub fn from_config(
        config: &PricingConfig,
        alterers: Vec<Box<dyn ZoneAlterer>>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        let scale = config.rounding_scale();

        let promotions = Arc::new(InMemoryPromotionStorage::new(config.promotions.clone())?);
        let tax_types = TaxTypeStore::from_config(&config.tax_types)?;

        let mut zone_resolver = TaxZoneResolver::new();
        for alterer in alterers {
            zone_resolver.add_alterer(alterer);
        }
        let zone_resolver = Arc::new(zone_resolver);
        let rate_resolver = Arc::new(ChainTaxRateResolver::default());

        let mut registry = ProcessorRegistry::new();

        let storage = Arc::clone(&promotions);
        registry.register(PROMOTION_PROCESSOR, move || -> Box<dyn OrderProcessor> {
            Box::new(PromotionProcessor::new(storage.clone(), scale))
        })?;

        let all_tax_types = tax_types.all();
        registry.register(TAX_PROCESSOR, move || -> Box<dyn OrderProcessor> {
            Box::new(TaxProcessor::new(
                all_tax_types.clone(),
                Arc::clone(&zone_resolver),
                Arc::clone(&rate_resolver),
                scale,
            ))
        })?;

        if let Some(fee) = &config.fee {
            let processor = FeeProcessor::new(&fee.id, &fee.label, fee.percentage, scale)?;
            registry.register(FEE_PROCESSOR, move || -> Box<dyn OrderProcessor> {
                Box::new(processor.clone())
            })?;
        }

        let calculator = registry.build(&config.processor_entries())?;

        info!(
            promotions = promotions.len(),
            tax_types = tax_types.len(),
            processors = calculator.processors().len(),
            "Pricing runtime ready"
        );

        Ok(Self {
            default_currency: config.default_currency().to_string(),
            promotions,
            tax_types,
            calculator,
        })
    }

    /// Loads the config (see [`PricingConfig::load`]) and wires it.
    pub fn load(
        config_path: Option<PathBuf>,
        alterers: Vec<Box<dyn ZoneAlterer>>,
    ) -> ConfigResult<Self> {
        let config = PricingConfig::load(config_path)?;
        Self::from_config(&config, alterers)
    }

    pub fn calculator(&self) -> &PriceCalculator {
        &self.calculator
    }

    pub fn promotions(&self) -> &InMemoryPromotionStorage {
        &self.promotions
    }

    pub fn tax_types(&self) -> &TaxTypeStore {
        &self.tax_types
    }

    /// Creates an empty order in the configured default currency.
    pub fn new_order(
        &self,
        order_type_id: &str,
        store_id: &str,
        calculation_date: NaiveDate,
    ) -> CoreResult<Order> {
        Order::new(
            order_type_id,
            store_id,
            self.default_currency.clone(),
            calculation_date,
        )
    }

    /// Recomputes every managed adjustment of `order`.
    ///
    /// Any error means the order totals are unknown; do not save the order.
    pub fn process(&self, order: &mut Order) -> CoreResult<()> {
        self.calculator.process(order)
    }
}
