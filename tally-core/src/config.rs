//! Configuration management
//!
//! Settings live in `settings.json` inside the tally directory:
//! ```json
//! {
//!   "database": { "file": "tally.duckdb" },
//!   "transfer": { "maxAttempts": 5, "initialBackoffMs": 20, "maxBackoffMs": 500, "timeoutMs": 5000 },
//!   "logging": { "level": "info", "json": false }
//! }
//! ```
//! Every key is optional. Unknown keys are kept when saving.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::services::RetryPolicy;

pub const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    database: DatabaseConfig,
    #[serde(default)]
    transfer: TransferConfig,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseConfig {
    /// Database file name, relative to the tally directory
    pub file: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            file: "tally.duckdb".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Lifetime of one transactional scope
    pub timeout_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 20,
            max_backoff_ms: 500,
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `tally_core=debug`
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Tally configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub transfer: TransferConfig,
    pub logging: LoggingConfig,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Config {
    /// Load config from the tally directory, then apply environment overrides
    ///
    /// Overrides: `TALLY_TRANSFER_MAX_ATTEMPTS`, `TALLY_TRANSFER_TIMEOUT_MS`,
    /// `TALLY_LOG`, `TALLY_LOG_JSON`.
    pub fn load(tally_dir: &Path) -> Result<Self> {
        let mut config = Self::load_file(tally_dir)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from settings.json only
    pub fn load_file(tally_dir: &Path) -> Result<Self> {
        let settings_path = tally_dir.join(SETTINGS_FILE);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).map_err(|e| {
                Error::config(format!("{}: {}", settings_path.display(), e))
            })?
        } else {
            SettingsFile::default()
        };

        Ok(Self {
            database: raw.database.clone(),
            transfer: raw.transfer.clone(),
            logging: raw.logging.clone(),
            _raw_settings: raw,
        })
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// [`Config::load`])
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("TALLY_TRANSFER_MAX_ATTEMPTS") {
            self.transfer.max_attempts = parse_number("TALLY_TRANSFER_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("TALLY_TRANSFER_TIMEOUT_MS") {
            self.transfer.timeout_ms = parse_number("TALLY_TRANSFER_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("TALLY_LOG") {
            self.logging.level = value;
        }
        if let Some(value) = lookup("TALLY_LOG_JSON") {
            self.logging.json = match value.as_str() {
                "true" | "1" | "yes" | "TRUE" | "YES" => true,
                "false" | "0" | "no" | "FALSE" | "NO" => false,
                other => {
                    return Err(Error::config(format!(
                        "TALLY_LOG_JSON: expected a boolean, got {:?}",
                        other
                    )))
                }
            };
        }
        Ok(())
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.transfer.max_attempts == 0 {
            return Err(Error::config("transfer.maxAttempts must be at least 1"));
        }
        if self.transfer.timeout_ms == 0 {
            return Err(Error::config("transfer.timeoutMs must be at least 1"));
        }
        if self.transfer.initial_backoff_ms > self.transfer.max_backoff_ms {
            return Err(Error::config(
                "transfer.initialBackoffMs must not exceed transfer.maxBackoffMs",
            ));
        }
        if self.database.file.trim().is_empty() {
            return Err(Error::config("database.file must not be empty"));
        }
        Ok(())
    }

    /// Save config to the tally directory
    /// Preserves other settings that tally doesn't manage
    pub fn save(&self, tally_dir: &Path) -> Result<()> {
        let settings_path = tally_dir.join(SETTINGS_FILE);

        // Load existing settings to preserve fields we don't manage
        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).map_err(|e| {
                Error::config(format!("{}: {}", settings_path.display(), e))
            })?
        } else {
            self._raw_settings.clone()
        };

        // Update only the fields we manage
        settings.database = self.database.clone();
        settings.transfer = self.transfer.clone();
        settings.logging = self.logging.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Absolute path of the database file
    pub fn database_path(&self, tally_dir: &Path) -> PathBuf {
        tally_dir.join(&self.database.file)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.transfer.max_attempts)
            .with_initial_backoff(Duration::from_millis(self.transfer.initial_backoff_ms))
            .with_max_backoff(Duration::from_millis(self.transfer.max_backoff_ms))
    }

    pub fn scope_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer.timeout_ms)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{}: expected a number, got {:?}", name, value)))
}
