use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use tracing::{info, warn};

use crate::models::MIN_EASE_FACTOR;

// Import logging macros
use crate::{log_system_event, log_validation};

/// Complete library configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub scheduler: SchedulerConfig,
    pub review: ReviewConfig,
    pub logging: LoggingConfig,
}

/// Durable snapshot store location
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub url: String,
}

/// Ease factor bounds used by the scheduler
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub min_ease: f64,
    pub max_ease: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewConfig {
    pub queue_limit: Option<usize>,
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_ease: MIN_EASE_FACTOR,
            max_ease: None,
        }
    }
}

impl Config {
    /// Read a `.env` file if present, then load from the environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading configuration from environment variables");

        let config = Config {
            storage: StorageConfig::from_env()?,
            scheduler: SchedulerConfig::from_env()?,
            review: ReviewConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        };

        log_system_event!(config, "Configuration loaded successfully");
        config.log_configuration_summary();

        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    fn log_configuration_summary(&self) {
        info!(
            storage_url_masked = %mask_sensitive_data(&self.storage.url),
            min_ease = self.scheduler.min_ease,
            max_ease = ?self.scheduler.max_ease,
            queue_limit = ?self.review.queue_limit,
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if let Err(e) = self.check_values() {
            log_validation!(failure, "configuration", error = e);
            return Err(e);
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.to_lowercase().as_str())
            && !self.logging.level.contains('=')
        {
            warn!("Invalid log level '{}', using 'info' as fallback", self.logging.level);
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }

    fn check_values(&self) -> Result<()> {
        if !self.storage.url.starts_with("sqlite:") {
            return Err(anyhow!("DATABASE_URL must start with 'sqlite:'"));
        }

        if self.scheduler.min_ease < MIN_EASE_FACTOR {
            return Err(anyhow!(
                "SCHEDULER_MIN_EASE must be at least {}, got {}",
                MIN_EASE_FACTOR,
                self.scheduler.min_ease
            ));
        }

        if let Some(max_ease) = self.scheduler.max_ease {
            if max_ease < self.scheduler.min_ease {
                return Err(anyhow!(
                    "SCHEDULER_MAX_EASE ({}) must not be below SCHEDULER_MIN_EASE ({})",
                    max_ease,
                    self.scheduler.min_ease
                ));
            }
        }

        if self.review.queue_limit == Some(0) {
            return Err(anyhow!("REVIEW_QUEUE_LIMIT must be greater than 0"));
        }

        Ok(())
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self> {
        let url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:memo_deck.db?mode=rwc".to_string());

        Ok(StorageConfig { url })
    }
}

impl SchedulerConfig {
    fn from_env() -> Result<Self> {
        let min_ease = match env::var("SCHEDULER_MIN_EASE") {
            Ok(value) => parse_ease("SCHEDULER_MIN_EASE", &value)?,
            Err(_) => MIN_EASE_FACTOR,
        };

        let max_ease = match env::var("SCHEDULER_MAX_EASE") {
            Ok(value) if !value.trim().is_empty() => Some(parse_ease("SCHEDULER_MAX_EASE", &value)?),
            _ => None,
        };

        Ok(SchedulerConfig { min_ease, max_ease })
    }
}

impl ReviewConfig {
    fn from_env() -> Result<Self> {
        let queue_limit = match env::var("REVIEW_QUEUE_LIMIT") {
            Ok(value) if !value.trim().is_empty() => Some(value.trim().parse::<usize>().map_err(|_| {
                anyhow!("Invalid REVIEW_QUEUE_LIMIT value: '{}'. Must be a positive integer", value)
            })?),
            _ => None,
        };

        Ok(ReviewConfig { queue_limit })
    }
}

impl LoggingConfig {
    fn from_env() -> Result<Self> {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info,memo_deck=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());

        Ok(LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        })
    }
}

fn parse_ease(name: &str, value: &str) -> Result<f64> {
    let parsed = value
        .trim()
        .parse::<f64>()
        .map_err(|_| anyhow!("Invalid {} value: '{}'. Must be a number", name, value))?;
    if !parsed.is_finite() {
        return Err(anyhow!("Invalid {} value: '{}'. Must be finite", name, value));
    }
    Ok(parsed)
}

/// Mask sensitive data in configuration for safe logging
fn mask_sensitive_data(data: &str) -> String {
    if data.len() <= 8 || !data.is_ascii() {
        "*".repeat(data.chars().count())
    } else {
        format!("{}***{}", &data[..4], &data[data.len() - 4..])
    }
}
