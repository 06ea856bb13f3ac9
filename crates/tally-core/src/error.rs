//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError           - Pricing/tax/chain failures                  │
//! │  ├── ConfigurationError  - Pipeline assembly failures                  │
//! │  └── ValidationError     - Input validation failures                   │
//! │                                                                         │
//! │  tally-config errors (separate crate)                                  │
//! │  └── ConfigError         - pricing.toml load/save/parse failures       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ConfigError → host application    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (zone, rate, processor id)
//! 3. Errors are enum variants, never String
//! 4. A missing tax percentage is an error, never a silent 0%

use chrono::NaiveDate;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core pricing errors.
///
/// Any `CoreError` coming out of [`crate::PriceCalculator::process`] means the
/// order totals could not be computed. The caller must not finalize or save
/// the order.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A tax rate exists but no percentage applies on the requested date.
    ///
    /// ## When This Occurs
    /// - Every percentage of the rate starts after the evaluation date
    /// - The rate has no percentages at all
    ///
    /// Never the same as a rate whose percentage is 0%.
    #[error("Tax rate {rate} in zone {zone} has no percentage applicable on {date}")]
    PercentageNotFound {
        zone: String,
        rate: String,
        date: NaiveDate,
    },

    /// The requested rate id does not exist in the zone.
    #[error("Tax rate {rate} not found in zone {zone}")]
    TaxRateNotFound { zone: String, rate: String },

    /// Arithmetic between prices of different currencies.
    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: String, found: String },

    /// Two adjustments that cannot be combined (different type or source).
    #[error("Cannot combine adjustments: {reason}")]
    IncompatibleAdjustments { reason: String },

    /// A processor in the chain failed.
    ///
    /// ## User Workflow
    /// ```text
    /// PriceCalculator::process(order)
    ///      │
    ///      ├── promotion ✓ (adjustments stay on the order)
    ///      │
    ///      ├── tax ✗ → Processor { processor: "tax", .. }
    ///      │
    ///      └── fee (never runs)
    /// ```
    #[error("Order processor '{processor}' failed: {source}")]
    Processor {
        processor: String,
        #[source]
        source: Box<CoreError>,
    },

    /// Failure raised by processor code that is not a pricing error
    /// (e.g. a remote verification the processor gave up on).
    #[error("{0}")]
    External(String),

    /// Pipeline assembly error.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Wraps an error raised inside a processor.
    pub fn processor(processor: impl Into<String>, source: CoreError) -> Self {
        CoreError::Processor {
            processor: processor.into(),
            source: Box::new(source),
        }
    }

    /// Returns true for the "no applicable percentage" case.
    pub fn is_percentage_not_found(&self) -> bool {
        matches!(self, CoreError::PercentageNotFound { .. })
    }
}

// =============================================================================
// Configuration Error
// =============================================================================

/// Errors detected while assembling the processor pipeline.
///
/// These surface at startup, never while processing an order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The same processor id was registered twice.
    #[error("Processor '{processor}' is registered more than once")]
    DuplicateProcessor { processor: String },

    /// A configured processor id has no registered factory.
    #[error("Unknown processor '{processor}'")]
    UnknownProcessor { processor: String },

    /// A configured price-calculator entry declares no adjustment type.
    #[error("Processor '{processor}' declares no adjustment type")]
    MissingAdjustmentType { processor: String },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },

    /// Invalid format (e.g., invalid currency code, invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A date window whose end precedes its start.
    #[error("{field} ends ({end}) before it starts ({start})")]
    InvalidDateWindow {
        field: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
