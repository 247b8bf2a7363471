//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::sync::Arc;

use domain::{FlatRateShipping, FreeShipping, Money, PricingCalculator, ShippingPolicy};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid PORT value: {0}")]
    InvalidPort(String),

    #[error("invalid LOG_FORMAT value: {0} (expected text or json)")]
    InvalidLogFormat(String),

    #[error("invalid SHIPPING_FLAT_FEE value: {0}")]
    InvalidShippingFee(String),
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::InvalidLogFormat(s.to_string())),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default `"0.0.0.0"`)
/// - `PORT`: listen port (default `3000`)
/// - `RUST_LOG`: tracing filter directive (default `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default `text`)
/// - `DATABASE_URL`: PostgreSQL event store; in-memory when unset
/// - `SHIPPING_FLAT_FEE`: per-order shipping fee (default `0`, free shipping)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub shipping_flat_fee: Money,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`; unset or blank keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => defaults.port,
        };
        let log_format = match get("LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => defaults.log_format,
        };
        let shipping_flat_fee = match get("SHIPPING_FLAT_FEE") {
            Some(raw) => Decimal::from_str(raw.trim())
                .ok()
                .and_then(|d| Money::from_decimal(d).ok())
                .filter(|m| !m.is_negative())
                .ok_or(ConfigError::InvalidShippingFee(raw))?,
            None => defaults.shipping_flat_fee,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port,
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            database_url: get("DATABASE_URL"),
            shipping_flat_fee,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pricing with the configured shipping policy.
    pub fn pricing(&self) -> PricingCalculator {
        let policy: Arc<dyn ShippingPolicy> = if self.shipping_flat_fee.is_zero() {
            Arc::new(FreeShipping)
        } else {
            Arc::new(FlatRateShipping {
                fee: self.shipping_flat_fee,
            })
        };
        PricingCalculator::new(policy)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            shipping_flat_fee: Money::zero(),
        }
    }
}
