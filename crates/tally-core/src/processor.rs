//! # Order Processor Chain
//!
//! The [`PriceCalculator`] runs registered order processors, highest
//! priority first, each owning one adjustment type.
//!
//! ## Execution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PriceCalculator::process(order)                                        │
//! │                                                                         │
//! │  for processor in [promotion(300), fee(200), tax(100)]:                 │
//! │      order.clear_adjustments_by_type(processor.type)   ← idempotent     │
//! │      processor.process(order)?                         ← fail-fast      │
//! │                                                                         │
//! │  Later processors see what earlier ones wrote: the fee is computed on   │
//! │  the subtotal after promotions, tax on item totals after promotions.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Assembly
//! 1. Registrations without an adjustment type are left out (they belong to
//!    another pipeline).
//! 2. Duplicate service ids are a [`ConfigurationError`].
//! 3. Stable sort by priority, descending. Ties keep registration order.
//!
//! The order is fixed at assembly and never re-sorted.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{debug, info, warn};

use crate::adjustment::AdjustmentType;
use crate::error::{ConfigurationError, CoreError, CoreResult};
use crate::order::Order;

// =============================================================================
// Processor Trait
// =============================================================================

/// A unit of adjustment computation.
///
/// Before `process` runs, the chain has already removed the unlocked
/// adjustments of the processor's type, so implementations only add.
pub trait OrderProcessor: Send + Sync {
    fn process(&self, order: &mut Order) -> CoreResult<()>;
}

impl<F> OrderProcessor for F
where
    F: Fn(&mut Order) -> CoreResult<()> + Send + Sync,
{
    fn process(&self, order: &mut Order) -> CoreResult<()> {
        self(order)
    }
}

// =============================================================================
// Registration
// =============================================================================

/// A processor with its chain metadata.
pub struct ProcessorRegistration {
    pub service_id: String,
    pub priority: i32,
    pub adjustment_type: Option<AdjustmentType>,
    pub processor: Box<dyn OrderProcessor>,
}

impl ProcessorRegistration {
    /// Priority 0, no adjustment type.
    pub fn new(service_id: impl Into<String>, processor: impl OrderProcessor + 'static) -> Self {
        ProcessorRegistration {
            service_id: service_id.into(),
            priority: 0,
            adjustment_type: None,
            processor: Box::new(processor),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_adjustment_type(mut self, adjustment_type: AdjustmentType) -> Self {
        self.adjustment_type = Some(adjustment_type);
        self
    }
}

impl fmt::Debug for ProcessorRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistration")
            .field("service_id", &self.service_id)
            .field("priority", &self.priority)
            .field("adjustment_type", &self.adjustment_type)
            .finish()
    }
}

/// A processor bound to the adjustment type it clears and rewrites.
struct BoundProcessor {
    service_id: String,
    priority: i32,
    adjustment_type: AdjustmentType,
    processor: Box<dyn OrderProcessor>,
}

// =============================================================================
// Price Calculator
// =============================================================================

/// The assembled, priority-ordered processor chain.
pub struct PriceCalculator {
    processors: Vec<BoundProcessor>,
}

impl PriceCalculator {
    /// Builds the chain from registrations.
    ///
    /// ## Errors
    /// `ConfigurationError::DuplicateProcessor` when a service id repeats.
    pub fn assemble(registrations: Vec<ProcessorRegistration>) -> Result<Self, ConfigurationError> {
        let mut seen = HashSet::new();
        let mut processors = Vec::with_capacity(registrations.len());

        for registration in registrations {
            if !seen.insert(registration.service_id.clone()) {
                return Err(ConfigurationError::DuplicateProcessor {
                    processor: registration.service_id,
                });
            }

            let Some(adjustment_type) = registration.adjustment_type else {
                debug!(
                    processor = %registration.service_id,
                    "Processor declares no adjustment type, leaving it out of the price calculator"
                );
                continue;
            };

            processors.push(BoundProcessor {
                service_id: registration.service_id,
                priority: registration.priority,
                adjustment_type,
                processor: registration.processor,
            });
        }

        // Vec::sort_by_key is stable: equal priorities keep registration order.
        processors.sort_by_key(|p| Reverse(p.priority));

        info!(
            processors = ?processors.iter().map(|p| p.service_id.as_str()).collect::<Vec<_>>(),
            "Price calculator assembled"
        );

        Ok(PriceCalculator { processors })
    }

    /// `(service_id, priority, adjustment_type)` in execution order.
    pub fn processors(&self) -> Vec<(&str, i32, AdjustmentType)> {
        self.processors
            .iter()
            .map(|p| (p.service_id.as_str(), p.priority, p.adjustment_type))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Recomputes every managed adjustment type on `order`.
    ///
    /// ## Errors
    /// The first processor error stops the chain and is returned as
    /// `CoreError::Processor`. Adjustments written by processors that already
    /// ran stay on the order; the caller must not finalize it.
    pub fn process(&self, order: &mut Order) -> CoreResult<()> {
        for bound in &self.processors {
            let removed = order.clear_adjustments_by_type(bound.adjustment_type);
            debug!(
                order_id = %order.id,
                processor = %bound.service_id,
                adjustment_type = %bound.adjustment_type,
                removed,
                "Running order processor"
            );

            if let Err(e) = bound.processor.process(order) {
                warn!(
                    order_id = %order.id,
                    processor = %bound.service_id,
                    error = %e,
                    "Order processor failed, halting price calculation"
                );
                return Err(CoreError::processor(bound.service_id.clone(), e));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for PriceCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriceCalculator")
            .field("processors", &self.processors())
            .finish()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Factory producing a processor instance.
pub type ProcessorFactory = Box<dyn Fn() -> Box<dyn OrderProcessor> + Send + Sync>;

/// A configured chain entry, usually read from pricing.toml.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorEntry {
    pub id: String,
    pub priority: i32,
    pub adjustment_type: Option<AdjustmentType>,
}

/// Maps processor ids to factories, populated at startup.
#[derive(Default)]
pub struct ProcessorRegistry {
    factories: HashMap<String, ProcessorFactory>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `id`.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F) -> Result<(), ConfigurationError>
    where
        F: Fn() -> Box<dyn OrderProcessor> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.factories.contains_key(&id) {
            return Err(ConfigurationError::DuplicateProcessor { processor: id });
        }
        self.factories.insert(id, Box::new(factory));
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Instantiates `entries` in order and assembles the chain.
    ///
    /// ## Errors
    /// - `UnknownProcessor` - no factory for an entry id
    /// - `MissingAdjustmentType` - an entry declares no adjustment type
    /// - `DuplicateProcessor` - an id is configured twice
    pub fn build(&self, entries: &[ProcessorEntry]) -> Result<PriceCalculator, ConfigurationError> {
        let mut registrations = Vec::with_capacity(entries.len());
        for entry in entries {
            let factory =
                self.factories
                    .get(&entry.id)
                    .ok_or_else(|| ConfigurationError::UnknownProcessor {
                        processor: entry.id.clone(),
                    })?;
            let adjustment_type =
                entry
                    .adjustment_type
                    .ok_or_else(|| ConfigurationError::MissingAdjustmentType {
                        processor: entry.id.clone(),
                    })?;

            registrations.push(ProcessorRegistration {
                service_id: entry.id.clone(),
                priority: entry.priority,
                adjustment_type: Some(adjustment_type),
                processor: factory(),
            });
        }
        PriceCalculator::assemble(registrations)
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.factories.keys().collect();
        ids.sort();
        f.debug_struct("ProcessorRegistry").field("factories", &ids).finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
