//! Configuration management for relaybox
//!
//! Settings are layered from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use relaybox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Ledger TTL: {}", config.retention.ledger_ttl);
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `RELAYBOX__<section>__<key>`:
//! - `RELAYBOX__STORE__PATH=/var/lib/relaybox`
//! - `RELAYBOX__RETENTION__LEDGER_TTL=3d`
//! - `RELAYBOX__TELEMETRY__JSON=true`
//!
//! # Configuration File
//!
//! By default the file is `config/relaybox.toml`; set `RELAYBOX_CONFIG` to
//! point elsewhere.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{Config, RetentionConfig, ServerConfig, StoreConfig, TelemetryConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// The configuration file [`Config::load`] reads, whether or not it exists
    pub fn source_path() -> std::path::PathBuf {
        sources::config_path()
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
