//! Tracing subscriber setup
//!
//! Installed once by the binary at start-up. Library code only emits events.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;
use crate::domain::result::{Error, Result};

/// Build the filter for a logging config
pub fn filter(config: &LoggingConfig) -> Result<EnvFilter> {
    EnvFilter::try_new(&config.level)
        .map_err(|e| Error::config(format!("logging.level {:?}: {}", config.level, e)))
}

/// Install the global subscriber
///
/// Logs go to stderr so command output on stdout stays machine-readable.
/// Calling this again after a subscriber is installed is a no-op.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(filter(config)?);

    // A second install fails; the first subscriber stays in place.
    let _ = if config.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts_directives() {
        for level in ["info", "warn", "tally_core=debug,info"] {
            let config = LoggingConfig {
                level: level.to_string(),
                json: false,
            };
            assert!(filter(&config).is_ok(), "level {:?}", level);
        }
    }

    #[test]
    fn test_filter_rejects_garbage() {
        let config = LoggingConfig {
            level: "tally_core=verbose".to_string(),
            json: false,
        };
        assert!(filter(&config).is_err());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LoggingConfig::default();
        assert!(init(&config).is_ok());
        assert!(init(&config).is_ok());
    }
}
