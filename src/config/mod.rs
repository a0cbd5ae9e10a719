//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `DISPATCH_HUB` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use dispatch_hub::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Hub listening on port {}", config.server.port);
//! ```

mod error;
mod hub;
mod server;

pub use error::{ConfigError, ValidationError};
pub use hub::{HubConfig, MAX_OUTBOUND_QUEUE_CAPACITY};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Legacy variable naming the listen port directly.
pub const LEGACY_PORT_VAR: &str = "WS_PORT";

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a runnable
/// development hub on port 3001.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Connection hub tuning (queue sizes, heartbeat)
    #[serde(default)]
    pub hub: HubConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `DISPATCH_HUB` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Lets `WS_PORT`, when set, override `server.port`
    ///
    /// # Environment Variable Format
    ///
    /// - `DISPATCH_HUB__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `DISPATCH_HUB__HUB__OUTBOUND_QUEUE_CAPACITY=128` -> `hub.outbound_queue_capacity = 128`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let legacy_port = std::env::var(LEGACY_PORT_VAR)
            .ok()
            .filter(|port| !port.trim().is_empty());

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("DISPATCH_HUB")
                    .separator("__"),
            )
            .set_override_option("server.port", legacy_port)?
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.hub.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
