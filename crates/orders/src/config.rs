//! Retrieval configuration
//!
//! Every tuning knob of the optimizer can be set from the environment, so
//! batch sizes and ceilings change without a rebuild.

use crate::loading::batch_loader::{BatchConfig, MAX_BIND_PARAMETERS};
use crate::loading::Strategy;
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const ENV_BATCH_SIZE: &str = "ORDER_QUERY_BATCH_SIZE";
pub const ENV_PARALLEL_BATCHES: &str = "ORDER_QUERY_PARALLEL_BATCHES";
pub const ENV_DEFAULT_STRATEGY: &str = "ORDER_QUERY_DEFAULT_STRATEGY";
pub const ENV_FLAT_ROW_CEILING: &str = "ORDER_QUERY_FLAT_ROW_CEILING";
pub const ENV_IN_MEMORY_PAGINATION: &str = "ORDER_QUERY_IN_MEMORY_PAGINATION";
pub const ENV_TIMEOUT_MS: &str = "ORDER_QUERY_TIMEOUT_MS";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Configuration validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Order retrieval configuration
#[derive(Debug, Clone, PartialEq)]
pub struct OrderQueryConfig {
    pub batch: BatchConfig,
    /// Strategy used for unpaginated retrievals that include lines
    pub default_strategy: Strategy,
    /// Maximum raw rows a flat projection may return; `None` disables it
    pub flat_row_ceiling: Option<usize>,
    /// Let the flat projection page its regrouped orders in memory
    pub in_memory_pagination: bool,
    /// Deadline applied when the caller does not supply one
    pub query_timeout_ms: Option<u64>,
}

impl Default for OrderQueryConfig {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            default_strategy: Strategy::DtoBatched,
            flat_row_ceiling: Some(1000),
            in_memory_pagination: false,
            query_timeout_ms: Some(30_000),
        }
    }
}

impl OrderQueryConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup, falling back to
    /// defaults for absent keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_BATCH_SIZE) {
            config.batch.max_batch_size = parse_number(ENV_BATCH_SIZE, &value)?;
        }

        if let Some(value) = lookup(ENV_PARALLEL_BATCHES) {
            let in_flight: usize = parse_number(ENV_PARALLEL_BATCHES, &value)?;
            config.batch.parallel_execution = in_flight > 1;
            config.batch.max_parallel_batches = in_flight.max(1);
        }

        if let Some(value) = lookup(ENV_DEFAULT_STRATEGY) {
            config.default_strategy = value.parse().map_err(|_| ConfigError::InvalidValue {
                field: ENV_DEFAULT_STRATEGY.to_string(),
                value: value.clone(),
                expected: "fetch_join, to_one_fetch, dto_per_order, dto_batched or flat".to_string(),
            })?;
        }

        if let Some(value) = lookup(ENV_FLAT_ROW_CEILING) {
            config.flat_row_ceiling = match value.trim().to_lowercase().as_str() {
                "none" | "off" | "" => None,
                _ => Some(parse_number(ENV_FLAT_ROW_CEILING, &value)?),
            };
        }

        if let Some(value) = lookup(ENV_IN_MEMORY_PAGINATION) {
            config.in_memory_pagination =
                value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: ENV_IN_MEMORY_PAGINATION.to_string(),
                    value: value.clone(),
                    expected: "true or false".to_string(),
                })?;
        }

        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            config.query_timeout_ms = match parse_number::<u64>(ENV_TIMEOUT_MS, &value)? {
                0 => None,
                ms => Some(ms),
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.max_batch_size == 0 {
            return Err(ConfigError::ValidationFailed {
                message: "batch size must be at least 1".to_string(),
            });
        }
        if self.batch.max_batch_size > MAX_BIND_PARAMETERS {
            return Err(ConfigError::ValidationFailed {
                message: format!(
                    "batch size {} exceeds the {} bind parameter limit",
                    self.batch.max_batch_size, MAX_BIND_PARAMETERS
                ),
            });
        }
        if self.flat_row_ceiling == Some(0) {
            return Err(ConfigError::ValidationFailed {
                message: "flat row ceiling must be at least 1".to_string(),
            });
        }
        if self.default_strategy == Strategy::FlatProjection && self.flat_row_ceiling.is_none() {
            return Err(ConfigError::ValidationFailed {
                message: "flat default strategy requires a flat row ceiling".to_string(),
            });
        }
        if self.in_memory_pagination && self.flat_row_ceiling.is_none() {
            return Err(ConfigError::ValidationFailed {
                message: "in-memory pagination requires a flat row ceiling".to_string(),
            });
        }
        Ok(())
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        expected: "a non-negative integer".to_string(),
    })
}
