use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_attempts: {0}. Cannot be 0")]
    InvalidMaxAttempts(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(f64),

    #[error("Invalid call_timeout_secs: {0}. Must be at least 1")]
    InvalidCallTimeout(u64),

    #[error("Invalid max_in_flight_notifications: {0}. Must be between 1 and 64")]
    InvalidNotificationConcurrency(usize),

    #[error("Invalid max_description_chars: {0}. Must be at least 1")]
    InvalidDescriptionLimit(usize),

    #[error("Mail endpoint cannot be empty")]
    EmptyMailEndpoint,

    #[error("Reasoning base_url cannot be empty")]
    EmptyReasoningBaseUrl,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. .triago/config.yaml (project config, created by init)
    /// 3. .triago/local.yaml (project local overrides, optional)
    /// 4. Environment variables (TRIAGO_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".triago/config.yaml"))
            .merge(Yaml::file(".triago/local.yaml"))
            .merge(Env::prefixed("TRIAGO_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("TRIAGO_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(config.retry.max_attempts));
        }

        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        if config.reasoning.rate_limit_rps <= 0.0 {
            return Err(ConfigError::InvalidRateLimit(
                config.reasoning.rate_limit_rps,
            ));
        }

        if config.reasoning.base_url.is_empty() {
            return Err(ConfigError::EmptyReasoningBaseUrl);
        }

        if config.reasoning.max_description_chars == 0 {
            return Err(ConfigError::InvalidDescriptionLimit(
                config.reasoning.max_description_chars,
            ));
        }

        if config.workflow.call_timeout_secs == 0 {
            return Err(ConfigError::InvalidCallTimeout(
                config.workflow.call_timeout_secs,
            ));
        }

        let in_flight = config.workflow.max_in_flight_notifications;
        if in_flight == 0 || in_flight > 64 {
            return Err(ConfigError::InvalidNotificationConcurrency(in_flight));
        }

        if config.mail.endpoint.is_empty() {
            return Err(ConfigError::EmptyMailEndpoint);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
