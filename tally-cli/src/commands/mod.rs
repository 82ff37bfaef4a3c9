//! CLI command implementations

pub mod account;
pub mod balance;
pub mod doctor;
pub mod transfer;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use tally_core::config::{Config, LoggingConfig};
use tally_core::{AccountId, TallyContext};

/// Get the tally directory from environment or default
pub fn get_tally_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TALLY_DIR") {
        Ok(PathBuf::from(dir))
    } else {
        dirs::home_dir()
            .map(|home| home.join(".tally"))
            .ok_or_else(|| anyhow!("Could not find home directory, set TALLY_DIR"))
    }
}

/// Get or create tally context
pub fn get_context() -> Result<TallyContext> {
    let tally_dir = get_tally_dir()?;

    // Create directory if it doesn't exist
    std::fs::create_dir_all(&tally_dir)
        .with_context(|| format!("Failed to create tally directory: {:?}", tally_dir))?;

    TallyContext::new(&tally_dir).context("Failed to initialize tally context")
}

/// Install the tracing subscriber from settings.json and the environment
///
/// Falls back to the default logging config when settings cannot be read;
/// the command itself reports the configuration error.
pub fn init_logging() {
    let config = get_tally_dir()
        .ok()
        .and_then(|dir| Config::load(&dir).ok())
        .map(|config| config.logging)
        .unwrap_or_default();

    if tally_core::logging::init(&config).is_err() {
        let _ = tally_core::logging::init(&LoggingConfig::default());
    }
}

/// Parse an account id argument
pub fn parse_account_id(raw: &str) -> Result<AccountId> {
    raw.parse::<AccountId>()
        .with_context(|| format!("Invalid account id: {}", raw))
}
