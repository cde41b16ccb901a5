// Storefront configuration: pricing, simulated backend timings and retry policy

use crate::locale;
use crate::pricing::{DEFAULT_FEE_RATE, DEFAULT_NIGHTLY_RATE, MAX_FEE_PERCENT, MIN_FEE_PERCENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    pub currency_symbol: String,
    pub pricing: PricingConfig,
    pub confirmation: ConfirmationConfig,
    pub backend: BackendConfig,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "€".to_string(),
            pricing: PricingConfig::default(),
            confirmation: ConfirmationConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub nightly_rate: f64,
    pub fee_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            nightly_rate: DEFAULT_NIGHTLY_RATE,
            fee_rate: DEFAULT_FEE_RATE,
        }
    }
}

// Simulated backend behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub booking_delay_ms: u64,
    pub payment_delay_ms: u64,
    pub max_reference_attempts: u32,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            booking_delay_ms: 1500,
            payment_delay_ms: 2000,
            max_reference_attempts: 16,
        }
    }
}

impl ConfirmationConfig {
    /// No simulated latency, for tests and scripted flows.
    pub fn instant() -> Self {
        Self {
            booking_delay_ms: 0,
            payment_delay_ms: 0,
            ..Self::default()
        }
    }
}

// Settings for a real HTTP confirmation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub retry: RetryConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_ms: 5000,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl StorefrontConfig {
    /// Parses a JSON document; omitted fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: StorefrontConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::JsonParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Renders an amount with the configured currency symbol.
    pub fn format_amount(&self, amount: f64) -> String {
        locale::format_amount(amount, &self.currency_symbol)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.currency_symbol.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "currency_symbol",
                reason: "must not be empty".to_string(),
            });
        }

        if !self.pricing.nightly_rate.is_finite() || self.pricing.nightly_rate <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "pricing.nightly_rate",
                reason: format!("{} is not positive", self.pricing.nightly_rate),
            });
        }

        let min = MIN_FEE_PERCENT as f64 / 100.0;
        let max = MAX_FEE_PERCENT as f64 / 100.0;
        if !(min..=max).contains(&self.pricing.fee_rate) {
            return Err(ConfigError::InvalidValue {
                field: "pricing.fee_rate",
                reason: format!("{} is outside {}..={}", self.pricing.fee_rate, min, max),
            });
        }

        let retry = &self.backend.retry;
        if retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "backend.retry.backoff_multiplier",
                reason: format!("{} is below 1.0", retry.backoff_multiplier),
            });
        }
        if !(0.0..=1.0).contains(&retry.jitter_factor) {
            return Err(ConfigError::InvalidValue {
                field: "backend.retry.jitter_factor",
                reason: format!("{} is outside 0..=1", retry.jitter_factor),
            });
        }

        Ok(())
    }
}
