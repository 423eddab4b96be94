//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all application settings.
//! Configuration is loaded from a TOML file; Telegram credentials come from the
//! environment only.
//!
//! # Example
//!
//! ```no_run
//! use perpwatch::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use super::enrichment::EnrichmentConfig;
use super::logging::LoggingConfig;
use super::notifier::NotifierConfig;
use super::reconnection::ReconnectionConfig;
use super::source::{SourceConfig, SourceKind};
use super::store::StoreConfig;
use crate::error::{ConfigError, Result};

/// Main application configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Event source selection, endpoints and pacing.
    #[serde(default)]
    pub source: SourceConfig,

    /// Cursor store backend.
    #[serde(default)]
    pub store: StoreConfig,

    /// Position and price lookups, token names and explorer links.
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Notification sink.
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// WebSocket reconnection settings.
    ///
    /// Controls backoff delays and circuit breaker behavior.
    #[serde(default)]
    pub reconnection: ReconnectionConfig,

    /// Log notifications instead of sending them.
    #[serde(default)]
    pub dry_run: bool,
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}

fn require_url(value: Option<&str>, field: &'static str) -> Result<()> {
    let Some(raw) = value.filter(|v| !v.trim().is_empty()) else {
        return Err(ConfigError::MissingField { field }.into());
    };
    url::Url::parse(raw).map_err(|e| invalid(field, &e.to_string()))?;
    Ok(())
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    ///
    /// Checks that the endpoints the selected source needs are present and
    /// that pacing values are within acceptable ranges.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        let source = &self.source;
        match source.kind {
            SourceKind::Subgraph => {
                require_url(source.subgraph_url.as_deref(), "subgraph_url")?;
                if source.poll_interval_secs == 0 {
                    return Err(invalid("poll_interval_secs", "must be greater than 0"));
                }
            }
            SourceKind::Chain => {
                require_url(source.ws_url.as_deref(), "ws_url")?;
                if source.vault_address.is_zero() {
                    return Err(ConfigError::MissingField {
                        field: "vault_address",
                    }
                    .into());
                }
                if source.router_address.is_zero() {
                    return Err(ConfigError::MissingField {
                        field: "router_address",
                    }
                    .into());
                }
                if source.probe_interval_secs == 0 {
                    return Err(invalid("probe_interval_secs", "must be greater than 0"));
                }
                if source.probe_timeout_secs == 0 {
                    return Err(invalid("probe_timeout_secs", "must be greater than 0"));
                }
                if source.max_batch == 0 {
                    return Err(invalid("max_batch", "must be greater than 0"));
                }
                if source.channel_capacity == 0 {
                    return Err(invalid("channel_capacity", "must be greater than 0"));
                }
                if source.retry_interval_ms == 0 {
                    return Err(invalid("retry_interval_ms", "must be greater than 0"));
                }
            }
        }
        if let Some(rpc) = source.rpc_url.as_deref() {
            require_url(Some(rpc), "rpc_url")?;
        }
        if source.page_size == 0 {
            return Err(invalid("page_size", "must be greater than 0"));
        }
        if source.max_page_size < source.page_size {
            return Err(invalid("max_page_size", "must be >= page_size"));
        }
        if source.max_pages_per_cycle == 0 {
            return Err(invalid("max_pages_per_cycle", "must be greater than 0"));
        }
        if source.request_timeout_ms == 0 {
            return Err(invalid("request_timeout_ms", "must be greater than 0"));
        }

        if let Some(price_url) = self.enrichment.price_url.as_deref() {
            require_url(Some(price_url), "price_url")?;
        }
        if self.notifier.send_timeout_ms == 0 {
            return Err(invalid("send_timeout_ms", "must be greater than 0"));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(invalid("format", "must be \"pretty\" or \"json\""));
        }

        if self.reconnection.initial_delay_ms == 0 {
            return Err(invalid("initial_delay_ms", "must be greater than 0"));
        }
        if self.reconnection.max_delay_ms < self.reconnection.initial_delay_ms {
            return Err(invalid("max_delay_ms", "must be >= initial_delay_ms"));
        }
        if self.reconnection.backoff_multiplier < 1.0 {
            return Err(invalid("backoff_multiplier", "must be >= 1.0"));
        }
        if self.reconnection.max_consecutive_failures == 0 {
            return Err(invalid("max_consecutive_failures", "must be greater than 0"));
        }
        if self.reconnection.circuit_breaker_cooldown_ms == 0 {
            return Err(invalid("circuit_breaker_cooldown_ms", "must be greater than 0"));
        }
        Ok(())
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
