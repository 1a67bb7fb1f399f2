//! Service configuration
//!
//! Settings are read from environment variables on top of defaults and
//! validated before use.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicConfig {
    pub service: ServiceSettings,
    pub database: DatabaseSettings,
    pub clinic: ClinicSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Durable store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path
    pub path: String,
    /// How long a connection waits for another writer, in milliseconds
    pub busy_timeout_ms: u64,
}

/// Clinic-local settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicSettings {
    /// Offset of clinic-local time from UTC; defines the day window
    pub utc_offset_minutes: i32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "clinic-flow".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "clinic-flow.db".to_string(),
            busy_timeout_ms: 5_000,
        }
    }
}

impl ClinicConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("CLINIC_SERVICE_NAME") {
            config.service.name = name;
        }
        if let Some(log_level) = lookup("LOG_LEVEL") {
            config.service.log_level = log_level;
        }

        if let Some(path) = lookup("CLINIC_DB_PATH") {
            config.database.path = path;
        }
        if let Some(timeout) = lookup("CLINIC_DB_BUSY_TIMEOUT_MS") {
            config.database.busy_timeout_ms = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid CLINIC_DB_BUSY_TIMEOUT_MS value: {}", timeout))?;
        }

        if let Some(offset) = lookup("CLINIC_UTC_OFFSET_MINUTES") {
            config.clinic.utc_offset_minutes = offset
                .parse()
                .map_err(|_| anyhow!("Invalid CLINIC_UTC_OFFSET_MINUTES value: {}", offset))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.database.busy_timeout_ms)
    }
}

/// Validate configuration values
pub fn validate_config(config: &ClinicConfig) -> Result<()> {
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.database.path.is_empty() {
        return Err(anyhow!("Database path cannot be empty"));
    }
    if config.database.busy_timeout_ms == 0 {
        return Err(anyhow!("Database busy timeout must be greater than 0"));
    }

    // Real-world offsets span UTC-12:00 to UTC+14:00
    if !(-12 * 60..=14 * 60).contains(&config.clinic.utc_offset_minutes) {
        return Err(anyhow!(
            "UTC offset out of range: {} minutes",
            config.clinic.utc_offset_minutes
        ));
    }

    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Calling this more than once is
/// harmless; later calls leave the first subscriber in place.
pub fn init_tracing(log_level: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_line_number(true)
        .try_init()
        .is_ok()
}
