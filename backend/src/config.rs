//! Configuration management for the depot ledger server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with DEPOT_ prefix and `__` between keys,
//!    e.g. `DEPOT_DATABASE__URL` or `DEPOT_SERVER__PORT`

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Report export configuration
    pub reporting: ReportingConfig,

    /// Initial catalog data
    pub seed: SeedConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportingConfig {
    /// Company name printed in report headers
    pub company_name: String,

    /// Prefix for money amounts (Zambian kwacha)
    pub currency_symbol: String,

    /// Length of the default report window ending today
    pub default_window_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedConfig {
    /// Upsert the initial depots and products at startup
    pub on_startup: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("DEPOT_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("reporting.company_name", "CMM Chronos Ltd")?
            .set_default("reporting.currency_symbol", "K")?
            .set_default("reporting.default_window_days", 30)?
            .set_default("seed.on_startup", false)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (DEPOT_ prefix)
            .add_source(env_overrides())
            .build()?;

        config.try_deserialize()
    }
}

/// `DEPOT_DATABASE__URL` overrides `database.url`
fn env_overrides() -> Environment {
    Environment::with_prefix("DEPOT")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            company_name: "CMM Chronos Ltd".to_string(),
            currency_symbol: "K".to_string(),
            default_window_days: 30,
        }
    }
}
