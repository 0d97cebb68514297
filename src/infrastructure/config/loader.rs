use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use std::path::Path;
use thiserror::Error;

use crate::adapters::postgis::is_sql_identifier;
use crate::domain::models::config::Config;

/// Project config file, read from the working directory
pub const CONFIG_FILE: &str = "address-sampler.yaml";

/// Local overrides, not meant to be committed
pub const LOCAL_CONFIG_FILE: &str = "address-sampler.local.yaml";

/// Prefix for environment overrides, `__` separates nested keys
pub const ENV_PREFIX: &str = "ADDRESS_SAMPLER_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_attempts: {0}. Must be at least 1")]
    InvalidMaxAttempts(u32),

    #[error("Invalid rate limit: min_interval_ms must be positive")]
    InvalidRateLimit,

    #[error("Invalid validator timeout: {0}s. Must be at least 1")]
    InvalidTimeout(u64),

    #[error("Validator base_url cannot be empty")]
    EmptyBaseUrl,

    #[error("Invalid max_concurrent: {0}. Must be at least 1")]
    InvalidMaxConcurrent(usize),

    #[error("Invalid event_channel_capacity: {0}. Must be at least 1")]
    InvalidChannelCapacity(usize),

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid projected_srid: {0}. Must be positive")]
    InvalidSrid(i32),

    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `OS_PLACES_API_KEY` / `DATABASE_URL` fallbacks
    /// 3. address-sampler.yaml
    /// 4. address-sampler.local.yaml (optional overrides)
    /// 5. Environment variables (`ADDRESS_SAMPLER_*`, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment(&[Path::new(CONFIG_FILE), Path::new(LOCAL_CONFIG_FILE)])
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Fallback and prefixed environment variables still apply.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Self::figment(&[path.as_ref()])
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(files: &[&Path]) -> Figment {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(
                Env::raw()
                    .only(&["OS_PLACES_API_KEY", "DATABASE_URL"])
                    .map(|key| {
                        if key.as_str().eq_ignore_ascii_case("OS_PLACES_API_KEY") {
                            "validator.api_key".into()
                        } else {
                            "database.url".into()
                        }
                    }),
            );

        for file in files {
            figment = figment.merge(Yaml::file(file));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.sampling.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(config.sampling.max_attempts));
        }

        if config.rate_limit.min_interval_ms == 0 {
            return Err(ConfigError::InvalidRateLimit);
        }

        if config.validator.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(config.validator.timeout_secs));
        }

        if config.validator.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }

        if config.jobs.max_concurrent == 0 {
            return Err(ConfigError::InvalidMaxConcurrent(config.jobs.max_concurrent));
        }

        if config.jobs.event_channel_capacity == 0 {
            return Err(ConfigError::InvalidChannelCapacity(
                config.jobs.event_channel_capacity,
            ));
        }

        // Validate database config
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        if config.database.projected_srid <= 0 {
            return Err(ConfigError::InvalidSrid(config.database.projected_srid));
        }

        for table in [&config.database.boundary_table, &config.database.address_table] {
            if !is_sql_identifier(table) {
                return Err(ConfigError::InvalidTableName(table.clone()));
            }
        }

        // Validate logging config
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(
                config.logging.rotation.clone(),
            ));
        }

        Ok(())
    }
}
