//! # tally-core: Pure Pricing Logic for Tally
//!
//! This crate computes order adjustments (promotions, fees, taxes) as pure
//! functions over values handed in by the host application. It has zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Host application (order save flow)              │   │
//! │  │        builds Order ──► PriceCalculator::process ──► saves      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   price   │  │ promotion │  │    tax    │  │ processor │  │   │
//! │  │   │ adjustment│  │ eligibility│ │ zones     │  │   chain   │  │   │
//! │  │   │   order   │  │  storage  │  │ rates     │  │ registry  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tally-config (pricing.toml, stores)             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`price`] - Decimal amount + currency
//! - [`adjustment`] - Adjustment value type and types
//! - [`transformer`] - Combining, sorting, rounding adjustments
//! - [`order`] - The order contract processors read and write
//! - [`promotion`] - Promotion records and eligibility filter
//! - [`tax`] - Tax zones, rate schedules, zone alterers, rate resolvers
//! - [`processor`] - The priority-ordered chain and processor registry
//! - [`processors`] - Built-in promotion, fee and tax processors
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same order + same records = same adjustments
//! 2. **No I/O**: Storage is a trait the host implements
//! 3. **Decimal Money**: Every amount is a `rust_decimal::Decimal`
//! 4. **Fail Fast**: A failing processor stops the chain; never save partial totals
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use rust_decimal::Decimal;
//! use tally_core::{
//!     Adjustment, AdjustmentType, CoreResult, Order, OrderItem, Price, PriceCalculator,
//!     ProcessorRegistration,
//! };
//!
//! let calculator = PriceCalculator::assemble(vec![ProcessorRegistration::new(
//!     "gift_wrap",
//!     |order: &mut Order| -> CoreResult<()> {
//!         let fee = Price::new(Decimal::new(250, 2), order.currency_code.clone())?;
//!         order.add_adjustment(Adjustment::new(AdjustmentType::Fee, "Gift wrap", fee))
//!     },
//! )
//! .with_adjustment_type(AdjustmentType::Fee)])
//! .unwrap();
//!
//! let mut order = Order::new("default", "1", "USD", NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()).unwrap();
//! order
//!     .add_item(OrderItem::new("a", "Mug", Decimal::ONE, Price::new(Decimal::TEN, "USD").unwrap()))
//!     .unwrap();
//!
//! calculator.process(&mut order).unwrap();
//! calculator.process(&mut order).unwrap(); // recalculating never duplicates
//! assert_eq!(order.total_price().unwrap().number(), Decimal::new(1250, 2));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod adjustment;
pub mod error;
pub mod order;
pub mod price;
pub mod processor;
pub mod processors;
pub mod promotion;
pub mod tax;
pub mod transformer;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use adjustment::{Adjustment, AdjustmentType};
pub use error::{ConfigurationError, CoreError, CoreResult, ValidationError};
pub use order::{Order, OrderItem};
pub use price::Price;
pub use processor::{
    OrderProcessor, PriceCalculator, ProcessorEntry, ProcessorFactory, ProcessorRegistration,
    ProcessorRegistry,
};
pub use promotion::{Compatibility, Promotion, PromotionOffer, PromotionStorage};
pub use tax::{
    resolve_rate, ChainTaxRateResolver, DefaultTaxRateResolver, RateResolution, TaxRate,
    TaxRatePercentage, TaxRateResolver, TaxType, TaxZone, TaxZoneResolver, ZoneAlterer,
};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Decimal places amounts are rounded to when nothing else is configured.
pub const DEFAULT_ROUNDING_SCALE: u32 = 2;

/// Maximum length of any identifier (promotion, zone, rate, processor).
pub const MAX_IDENTIFIER_LENGTH: usize = 128;
