//! # Config Error Types
//!
//! Errors raised while loading, validating, saving or wiring the pricing
//! catalog.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Config Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │      File       │  │    Catalog      │  │       Pipeline          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  LoadFailed     │  │  InvalidConfig  │  │  Pipeline               │ │
//! │  │  SaveFailed     │  │  Core           │  │  (unknown / duplicate / │ │
//! │  │                 │  │                 │  │   untyped processor)    │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All of these surface at startup. None of them is raised while an order
//! is being priced.

use tally_core::{ConfigurationError, CoreError, ValidationError};
use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A catalog value is out of range or inconsistent.
    #[error("Invalid pricing configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to write the config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// A catalog record was rejected by the core types.
    #[error("Invalid catalog record: {0}")]
    Core(#[from] CoreError),

    /// The processor chain could not be assembled.
    #[error("Invalid processor chain: {0}")]
    Pipeline(#[from] ConfigurationError),
}

impl ConfigError {
    /// Returns true if the error comes from the file system or TOML syntax
    /// rather than from the catalog contents.
    pub fn is_file_error(&self) -> bool {
        matches!(
            self,
            ConfigError::ConfigLoadFailed(_) | ConfigError::ConfigSaveFailed(_)
        )
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ConfigError {
    fn from(err: ValidationError) -> Self {
        ConfigError::Core(CoreError::Validation(err))
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::ConfigSaveFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::InvalidConfig("rounding_scale must be at most 10".into());
        assert_eq!(
            err.to_string(),
            "Invalid pricing configuration: rounding_scale must be at most 10"
        );
    }

    #[test]
    fn test_pipeline_error_conversion() {
        let err: ConfigError = ConfigurationError::UnknownProcessor {
            processor: "shipping".into(),
        }
        .into();
        assert!(matches!(err, ConfigError::Pipeline(_)));
        assert!(!err.is_file_error());
    }

    #[test]
    fn test_validation_error_conversion() {
        let err: ConfigError = ValidationError::Required {
            field: "default_currency".into(),
        }
        .into();
        assert!(matches!(err, ConfigError::Core(CoreError::Validation(_))));
    }

    #[test]
    fn test_toml_error_is_load_failure() {
        let err: ConfigError = toml::from_str::<toml::Value>("[pricing").unwrap_err().into();
        assert!(err.is_file_error());
    }
}
