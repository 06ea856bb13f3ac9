//! # Pricing Configuration
//!
//! The static pricing catalog: rounding settings, the processor chain,
//! promotions and tax types.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_DEFAULT_CURRENCY=EUR                                         │
//! │     TALLY_ROUNDING_SCALE=2                                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     explicit path, else $TALLY_PRICING_CONFIG, else                    │
//! │     ~/.config/tally/pricing.toml (Linux)                               │
//! │     ~/Library/Application Support/com.tally.pricing/pricing.toml       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     USD, scale 2, promotion(300) → tax(100)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # pricing.toml
//! [pricing]
//! default_currency = "EUR"
//! rounding_scale = 2
//!
//! [[processors]]
//! id = "promotion"
//! priority = 300
//! adjustment_type = "promotion"
//!
//! [[processors]]
//! id = "tax"
//! priority = 100
//! adjustment_type = "tax"
//!
//! [[promotions]]
//! id = "spring"
//! name = "Spring sale"
//! store_ids = ["1"]
//! order_type_ids = ["default"]
//! start_date = "2024-01-01"
//! end_date = "2024-12-31"
//! status = true
//! offer = { kind = "order_percentage_off", percentage = "0.10" }
//!
//! [[tax_types]]
//! id = "eu_vat"
//! label = "VAT"
//! display_inclusive = true
//!
//! [[tax_types.zones]]
//! id = "fr"
//! label = "France"
//! territories = ["FR"]
//!
//! [[tax_types.zones.rates]]
//! id = "standard"
//! label = "Standard"
//! default = true
//! percentages = [{ number = "0.2", start_date = "2014-01-01" }]
//! ```
//!
//! Dates are quoted strings; TOML date literals are not accepted.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use rust_decimal::Decimal;
use tally_core::validation::{validate_currency_code, validate_identifier, validate_percentage};
use tally_core::{
    AdjustmentType, ProcessorEntry, Promotion, PromotionOffer, TaxRate, TaxType, TaxZone,
};

use crate::error::{ConfigError, ConfigResult};

/// Largest accepted rounding scale.
const MAX_ROUNDING_SCALE: u32 = 10;

// =============================================================================
// Pricing Settings
// =============================================================================

/// Global calculation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSettings {
    /// Currency of orders created through the runtime.
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Decimal places processors round their adjustments to.
    #[serde(default = "default_rounding_scale")]
    pub rounding_scale: u32,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_rounding_scale() -> u32 {
    tally_core::DEFAULT_ROUNDING_SCALE
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            rounding_scale: default_rounding_scale(),
        }
    }
}

// =============================================================================
// Processor Chain
// =============================================================================

/// One entry of the price calculator chain.
///
/// An entry without `adjustment_type` is rejected when the chain is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Registered processor id (`promotion`, `tax`, `fee`).
    pub id: String,

    /// Higher runs first.
    #[serde(default)]
    pub priority: i32,

    /// Adjustment type the processor owns.
    #[serde(default)]
    pub adjustment_type: Option<AdjustmentType>,
}

impl From<&ProcessorConfig> for ProcessorEntry {
    fn from(config: &ProcessorConfig) -> Self {
        ProcessorEntry {
            id: config.id.clone(),
            priority: config.priority,
            adjustment_type: config.adjustment_type,
        }
    }
}

fn default_processors() -> Vec<ProcessorConfig> {
    vec![
        ProcessorConfig {
            id: "promotion".to_string(),
            priority: 300,
            adjustment_type: Some(AdjustmentType::Promotion),
        },
        ProcessorConfig {
            id: "tax".to_string(),
            priority: 100,
            adjustment_type: Some(AdjustmentType::Tax),
        },
    ]
}

/// Settings for the `fee` processor. Without this section the `fee`
/// processor is not registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Source id written on fee adjustments.
    pub id: String,
    pub label: String,
    /// Fraction of the discounted subtotal (`0.03` = 3%).
    pub percentage: Decimal,
}

// =============================================================================
// Tax Types
// =============================================================================

/// A tax type record as written in pricing.toml.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxTypeConfig {
    pub id: String,
    pub label: String,

    /// Prices already include this tax.
    #[serde(default)]
    pub display_inclusive: bool,

    #[serde(default)]
    pub zones: Vec<TaxZone>,
}

impl TaxTypeConfig {
    /// Converts the record into a core [`TaxType`].
    ///
    /// Rates are rebuilt through [`TaxRate::new`] so their schedules are
    /// validated and sorted regardless of the order they were written in.
    pub fn to_tax_type(&self) -> ConfigResult<TaxType> {
        validate_identifier("tax type id", &self.id)?;

        let mut zones = Vec::with_capacity(self.zones.len());
        for zone in &self.zones {
            validate_identifier("tax zone id", &zone.id)?;

            let mut rates = Vec::with_capacity(zone.rates.len());
            for rate in &zone.rates {
                rates.push(
                    TaxRate::new(rate.id.clone(), rate.label.clone(), rate.percentages.clone())?
                        .with_default(rate.default),
                );
            }

            zones.push(Arc::new(TaxZone {
                id: zone.id.clone(),
                label: zone.label.clone(),
                territories: zone.territories.clone(),
                rates,
            }));
        }

        Ok(TaxType {
            id: self.id.clone(),
            label: self.label.clone(),
            display_inclusive: self.display_inclusive,
            zones,
        })
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete pricing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Currency and rounding.
    #[serde(default)]
    pub pricing: PricingSettings,

    /// Price calculator chain, in any order; priorities decide.
    #[serde(default = "default_processors")]
    pub processors: Vec<ProcessorConfig>,

    /// Fee processor settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<FeeConfig>,

    /// Promotion catalog.
    #[serde(default)]
    pub promotions: Vec<Promotion>,

    /// Tax catalog.
    #[serde(default)]
    pub tax_types: Vec<TaxTypeConfig>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            pricing: PricingSettings::default(),
            processors: default_processors(),
            fee: None,
            promotions: Vec::new(),
            tax_types: Vec::new(),
        }
    }
}

impl PricingConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, `$TALLY_PRICING_CONFIG`, or the
    ///    platform config dir)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::resolve_path(config_path) {
            if path.exists() {
                info!(?path, "Loading pricing config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Pricing config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load pricing config, using defaults");
            Self::default()
        })
    }

    /// Saves configuration to file.
    ///
    /// Without `config_path`, writes where [`PricingConfig::load`] would read.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = Self::resolve_path(config_path)
            .ok_or_else(|| ConfigError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .map_err(|e| ConfigError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Pricing config saved");
        Ok(())
    }

    /// Validates the configuration.
    ///
    /// Catches bad catalog records at startup instead of at pricing time.
    /// Processor ids are only checked for shape here; unknown ids are
    /// reported when the chain is built.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_currency_code(&self.pricing.default_currency)?;

        if self.pricing.rounding_scale > MAX_ROUNDING_SCALE {
            return Err(ConfigError::InvalidConfig(format!(
                "rounding_scale must be at most {}, got {}",
                MAX_ROUNDING_SCALE, self.pricing.rounding_scale
            )));
        }

        for processor in &self.processors {
            validate_identifier("processor id", &processor.id)?;
        }

        if let Some(fee) = &self.fee {
            validate_identifier("fee id", &fee.id)?;
            validate_percentage("fee percentage", fee.percentage)?;
        }

        let mut promotion_ids = HashSet::new();
        for promotion in &self.promotions {
            promotion.validate()?;
            if let PromotionOffer::OrderFixedAmountOff { amount } = &promotion.offer {
                if amount.currency_code() != self.pricing.default_currency {
                    return Err(ConfigError::InvalidConfig(format!(
                        "promotion '{}' amount is in {}, expected {}",
                        promotion.id,
                        amount.currency_code(),
                        self.pricing.default_currency
                    )));
                }
            }
            if !promotion_ids.insert(promotion.id.as_str()) {
                return Err(ConfigError::InvalidConfig(format!(
                    "promotion '{}' is defined more than once",
                    promotion.id
                )));
            }
        }

        let mut tax_type_ids = HashSet::new();
        for tax_type in &self.tax_types {
            tax_type.to_tax_type()?;
            if !tax_type_ids.insert(tax_type.id.as_str()) {
                return Err(ConfigError::InvalidConfig(format!(
                    "tax type '{}' is defined more than once",
                    tax_type.id
                )));
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(currency) = std::env::var("TALLY_DEFAULT_CURRENCY") {
            debug!(currency = %currency, "Overriding default currency from environment");
            self.pricing.default_currency = currency;
        }

        if let Ok(scale) = std::env::var("TALLY_ROUNDING_SCALE") {
            match scale.parse::<u32>() {
                Ok(s) => {
                    debug!(scale = s, "Overriding rounding scale from environment");
                    self.pricing.rounding_scale = s;
                }
                Err(_) => warn!(scale = %scale, "Invalid rounding scale in environment"),
            }
        }
    }

    /// Explicit path, then `$TALLY_PRICING_CONFIG`, then the platform default.
    fn resolve_path(config_path: Option<PathBuf>) -> Option<PathBuf> {
        config_path
            .or_else(Self::env_config_path)
            .or_else(Self::default_config_path)
    }

    fn env_config_path() -> Option<PathBuf> {
        std::env::var("TALLY_PRICING_CONFIG").ok().map(PathBuf::from)
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "pricing")
            .map(|dirs| dirs.config_dir().join("pricing.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Chain entries in configuration order.
    pub fn processor_entries(&self) -> Vec<ProcessorEntry> {
        self.processors.iter().map(ProcessorEntry::from).collect()
    }

    /// All tax types converted to core types.
    pub fn tax_types(&self) -> ConfigResult<Vec<TaxType>> {
        self.tax_types.iter().map(TaxTypeConfig::to_tax_type).collect()
    }

    pub fn rounding_scale(&self) -> u32 {
        self.pricing.rounding_scale
    }

    pub fn default_currency(&self) -> &str {
        &self.pricing.default_currency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    const CATALOG: &str = r#"
[pricing]
default_currency = "EUR"

[[processors]]
id = "promotion"
priority = 300
adjustment_type = "promotion"

[[processors]]
id = "fee"
priority = 200
adjustment_type = "fee"

[fee]
id = "service"
label = "Service charge"
percentage = "0.05"

[[promotions]]
id = "spring"
name = "Spring sale"
store_ids = ["1"]
order_type_ids = ["default"]
start_date = "2024-01-01"
end_date = "2024-12-31"
status = true
offer = { kind = "order_percentage_off", percentage = "0.10" }

[[tax_types]]
id = "eu_vat"
label = "VAT"
display_inclusive = true

[[tax_types.zones]]
id = "fr"
label = "France"
territories = ["FR"]

[[tax_types.zones.rates]]
id = "standard"
label = "Standard"
default = true
percentages = [
    { number = "0.2", start_date = "2014-01-01" },
    { number = "0.196", start_date = "2000-04-01" },
]
"#;

    #[test]
    fn test_default_config() {
        let config = PricingConfig::default();
        assert_eq!(config.default_currency(), "USD");
        assert_eq!(config.rounding_scale(), 2);
        assert_eq!(config.processors.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_catalog() {
        let config: PricingConfig = toml::from_str(CATALOG).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.default_currency(), "EUR");
        assert_eq!(config.rounding_scale(), 2);
        assert_eq!(
            config.processor_entries()[1],
            ProcessorEntry {
                id: "fee".to_string(),
                priority: 200,
                adjustment_type: Some(AdjustmentType::Fee),
            }
        );
        assert_eq!(config.fee.as_ref().unwrap().percentage, dec!(0.05));

        let promotion = &config.promotions[0];
        assert_eq!(promotion.end_date, NaiveDate::from_ymd_opt(2024, 12, 31));
        assert_eq!(
            promotion.offer,
            PromotionOffer::OrderPercentageOff {
                percentage: dec!(0.10)
            }
        );
    }

    #[test]
    fn test_tax_schedule_is_sorted() {
        let config: PricingConfig = toml::from_str(CATALOG).unwrap();
        let tax_types = config.tax_types().unwrap();
        let rate = &tax_types[0].zones[0].rates[0];

        assert!(rate.default);
        assert_eq!(rate.percentages[0].number, dec!(0.196));
        assert_eq!(rate.percentages[1].number, dec!(0.2));
    }

    #[test]
    fn test_processor_without_type_parses() {
        let config: PricingConfig = toml::from_str(
            r#"
[[processors]]
id = "refresh"
"#,
        )
        .unwrap();
        assert_eq!(config.processors[0].adjustment_type, None);
        assert_eq!(config.processors[0].priority, 0);
    }

    #[test]
    fn test_config_validation() {
        let mut config = PricingConfig::default();
        assert!(config.validate().is_ok());

        config.pricing.default_currency = "euro".to_string();
        assert!(config.validate().is_err());

        config.pricing.default_currency = "EUR".to_string();
        config.pricing.rounding_scale = 20;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));

        config.pricing.rounding_scale = 2;
        config.fee = Some(FeeConfig {
            id: "service".to_string(),
            label: "Service".to_string(),
            percentage: dec!(1.5),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_promotion_rejected() {
        let mut config: PricingConfig = toml::from_str(CATALOG).unwrap();
        let duplicate = config.promotions[0].clone();
        config.promotions.push(duplicate);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_inverted_promotion_window_rejected() {
        let mut config: PricingConfig = toml::from_str(CATALOG).unwrap();
        config.promotions[0].end_date = NaiveDate::from_ymd_opt(2023, 12, 31);
        assert!(matches!(config.validate(), Err(ConfigError::Core(_))));
    }

    #[test]
    fn test_unknown_adjustment_type_fails_to_parse() {
        let result = toml::from_str::<PricingConfig>(
            r#"
[[processors]]
id = "shipping"
adjustment_type = "freight"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pricing.toml");

        let mut config: PricingConfig = toml::from_str(CATALOG).unwrap();
        config.pricing.rounding_scale = 3;
        config.save(Some(path.clone())).unwrap();

        let loaded = PricingConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.rounding_scale(), 3);
        assert_eq!(loaded.promotions, config.promotions);
        assert_eq!(loaded.processors, config.processors);
        assert_eq!(loaded.fee, config.fee);
    }

    #[test]
    fn test_fixed_amount_promotion_checked() {
        let with_amount = |currency: &str| {
            toml::from_str::<PricingConfig>(&format!(
                r#"
[pricing]
default_currency = "EUR"

[[promotions]]
id = "five_off"
name = "Five off"
store_ids = ["1"]
order_type_ids = ["default"]
start_date = "2024-01-01"
status = true
offer = {{ kind = "order_fixed_amount_off", amount = {{ number = "5", currency_code = "{}" }} }}
"#,
                currency
            ))
            .unwrap()
        };

        assert!(with_amount("EUR").validate().is_ok());
        assert!(matches!(
            with_amount("eur").validate(),
            Err(ConfigError::Core(_))
        ));
        assert!(matches!(
            with_amount("USD").validate(),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_save_failure_is_reported_as_save() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let err = PricingConfig::default()
            .save(Some(blocker.join("pricing.toml")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ConfigSaveFailed(_)));
        assert!(err.is_file_error());
    }

    #[test]
    fn test_save_and_load_follow_env_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("from_env.toml");
        std::env::set_var("TALLY_PRICING_CONFIG", &path);

        let mut config = PricingConfig::default();
        config.pricing.rounding_scale = 4;
        let saved = config.save(None);
        let loaded = PricingConfig::load(None);
        std::env::remove_var("TALLY_PRICING_CONFIG");

        saved.unwrap();
        assert!(path.exists());
        assert_eq!(loaded.unwrap().rounding_scale(), 4);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PricingConfig::load(Some(dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.processors, default_processors());
    }
}
