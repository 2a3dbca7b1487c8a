//! Application configuration
//!
//! Layered from built-in defaults, an optional `config/campaign.toml` and
//! `CAMPAIGN_*` environment variables, later sources winning.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Process-level configuration; game rules live in `AppSettings`
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// SQLite connection string
    pub database_url: String,
    pub database_max_connections: u32,

    pub server_host: String,
    pub server_port: u16,
}

impl AppConfig {
    /// Load configuration from the config file and the process environment
    pub fn load() -> Result<Self> {
        Self::from_environment(Environment::with_prefix("CAMPAIGN"))
    }

    fn from_environment(environment: Environment) -> Result<Self> {
        Config::builder()
            .set_default("database_url", "sqlite://campaign.db?mode=rwc")?
            .set_default("database_max_connections", 5)?
            .set_default("server_host", "0.0.0.0")?
            .set_default("server_port", 3000)?
            .add_source(File::with_name("config/campaign").required(false))
            .add_source(environment.try_parsing(true))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Environment {
        let source = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix("CAMPAIGN").source(Some(source))
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_environment(env(&[])).unwrap();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.database_url, "sqlite://campaign.db?mode=rwc");
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let config = AppConfig::from_environment(env(&[
            ("CAMPAIGN_SERVER_PORT", "8080"),
            ("CAMPAIGN_DATABASE_URL", "sqlite::memory:"),
        ]))
        .unwrap();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.database_url, "sqlite::memory:");
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let result = AppConfig::from_environment(env(&[("CAMPAIGN_SERVER_PORT", "harbor")]));
        assert!(result.is_err());
    }
}
