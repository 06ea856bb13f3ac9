//! # tally-config: Pricing Catalog for Tally
//!
//! Loads `pricing.toml`, builds the in-memory promotion and tax stores, and
//! wires the built-in processors into a [`tally_core::PriceCalculator`].
//!
//! ## Startup Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. PricingConfig::load(path)      defaults → file → env → validate     │
//! │  2. PricingRuntime::from_config    stores + registry + chain            │
//! │  3. runtime.process(&mut order)    per order, synchronous               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use tally_config::{PricingConfig, PricingRuntime};
//!
//! let runtime = PricingRuntime::from_config(&PricingConfig::default(), Vec::new()).unwrap();
//! assert_eq!(runtime.calculator().processors().len(), 2);
//! ```

pub mod config;
pub mod error;
pub mod runtime;
pub mod store;

pub use config::{FeeConfig, PricingConfig, PricingSettings, ProcessorConfig, TaxTypeConfig};
pub use error::{ConfigError, ConfigResult};
pub use runtime::PricingRuntime;
pub use store::{InMemoryPromotionStorage, TaxTypeStore};
