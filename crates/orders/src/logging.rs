//! # Structured Logging
//!
//! Subscriber setup for binaries, demos and benchmarks. The library itself
//! only emits `tracing` events; installing a subscriber is up to the caller.
//!
//! What the crate emits, by level:
//!
//! - `info`: one summary per completed retrieval (strategy, queries, rows)
//! - `warn`: rejected plans, aborted retrievals, exceeded row ceilings
//! - `debug`: every issued query, plan choices and line batches
//! - `trace`: regrouping details

use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CRATE_TARGET: &str = "jpashop_orders";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level for retrieval summaries and warnings
    pub level: String,
    /// Log every issued query at debug, regardless of `level`
    pub log_queries: bool,
    /// Level for the database driver
    pub driver_level: String,
    /// JSON lines instead of plain text
    pub json_format: bool,
    /// Include file and line number information
    pub include_location: bool,
    /// Reported once at initialization
    pub service_name: Option<String>,
    /// Raw filter directives; replaces everything derived above
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_queries: false,
            driver_level: "warn".to_string(),
            json_format: false,
            include_location: false,
            service_name: None,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Retrieval summaries as JSON, driver noise suppressed
    pub fn production() -> Self {
        Self {
            json_format: true,
            ..Self::default()
        }
    }

    /// Every issued query, so strategies can be compared by eye
    pub fn development() -> Self {
        Self {
            log_queries: true,
            driver_level: "info".to_string(),
            include_location: true,
            ..Self::default()
        }
    }

    /// Only failures that would be invisible in assertions
    pub fn test() -> Self {
        Self {
            level: "warn".to_string(),
            driver_level: "error".to_string(),
            ..Self::default()
        }
    }

    pub fn with_service_name<S: Into<String>>(mut self, name: S) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Set environment filter
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn filter_directives(&self) -> String {
        if let Some(filter) = &self.env_filter {
            return filter.clone();
        }
        let mut directives = format!("{}={},sqlx={}", CRATE_TARGET, self.level, self.driver_level);
        if self.log_queries {
            directives.push_str(&format!(",{}::loading=debug,{}::backends=debug", CRATE_TARGET, CRATE_TARGET));
        }
        directives
    }
}

/// Initialize structured logging. `RUST_LOG` takes precedence over the
/// configured filter. Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let directives = config.filter_directives();
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&directives))?;

    let layer = Layer::new()
        .with_writer(io::stdout)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()?;
    }

    let service = config.service_name.as_deref().unwrap_or(CRATE_TARGET);
    tracing::info!(
        target: "jpashop_orders::logging",
        service,
        filter = %directives,
        json = config.json_format,
        "structured logging initialized"
    );

    Ok(())
}
