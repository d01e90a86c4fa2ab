//! Configuration management

use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub collector: CollectorConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Traffic report endpoints, one per router
    pub traffic_urls: Vec<String>,
    /// DHCP lease endpoints (primary router only)
    #[serde(default)]
    pub lease_urls: Vec<String>,
    /// How many days of per-day samples to keep
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Hour of day (0-23) in which lease collection runs
    #[serde(default = "default_daily_hour")]
    pub daily_hour: u32,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_retention_days() -> u32 {
    30
}

fn default_daily_hour() -> u32 {
    3
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";

        let builder = config::Config::builder()
            .add_source(config::File::with_name(config_path))
            .add_source(config::Environment::with_prefix("NETWATCH"));

        let settings = builder.build()?;
        let config: Config = settings.try_deserialize()?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate collector config
        if self.collector.traffic_urls.is_empty() {
            anyhow::bail!("At least one traffic endpoint must be configured");
        }
        for url in self
            .collector
            .traffic_urls
            .iter()
            .chain(self.collector.lease_urls.iter())
        {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("Invalid router endpoint '{}': must be an http(s) URL", url);
            }
        }
        if self.collector.retention_days == 0 {
            anyhow::bail!("retention_days must be at least 1");
        }
        if self.collector.daily_hour > 23 {
            anyhow::bail!(
                "Invalid daily_hour {}: must be between 0 and 23",
                self.collector.daily_hour
            );
        }
        if self.collector.fetch_timeout_secs == 0 {
            anyhow::bail!("fetch_timeout_secs must be at least 1");
        }

        // Validate database config
        if self.database.url.is_empty() {
            anyhow::bail!("Database path cannot be empty");
        }

        // Validate server config
        if self.server.port == 0 {
            anyhow::bail!("Invalid server port: 0 is not allowed");
        }
        if self.server.host.is_empty() {
            anyhow::bail!("Server host cannot be empty");
        }

        // Validate logging level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid logging level '{}'. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        Ok(())
    }
}
