//! Service configuration management
//!
//! Layers, later ones winning: built-in defaults, an optional TOML file, then
//! `PRICE_TRACKER_*` environment variables where `__` separates nested keys
//! (`PRICE_TRACKER_ENGINE__WORKER_COUNT=4`). `DATABASE_URL` overrides the
//! database url when set.

use anyhow::{Context, Result};
use binance_client::BinanceConfig;
use config::{Config, Environment, File};
use price_store::DatabaseConfig;
use price_tracker::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix of the environment variables read by [`load_config`]
pub const ENV_PREFIX: &str = "PRICE_TRACKER";

/// Main service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Polling engine configuration
    pub engine: EngineConfig,

    /// Postgres configuration
    pub database: DatabaseConfig,

    /// Binance client configuration
    pub binance: BinanceConfig,

    /// REST API configuration
    pub http: HttpConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Service-level settings
    pub service: ServiceSettings,
}

/// REST API listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty)
    pub format: String,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Keep coins and history in memory instead of Postgres
    pub in_memory: bool,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self { in_memory: false, shutdown_timeout_secs: 10 }
    }
}

impl ServiceConfig {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn with_overrides(mut self, in_memory: bool, port: Option<u16>) -> Self {
        if in_memory {
            self.service.in_memory = true;
        }
        if let Some(port) = port {
            self.http.port = port;
        }
        self
    }
}

impl ServiceSettings {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Load configuration from an optional file and the environment.
///
/// The result is not validated; callers apply their overrides first and then
/// run [`validate_config`].
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    load_config_with_prefix(path, ENV_PREFIX)
}

fn load_config_with_prefix(path: Option<&Path>, prefix: &str) -> Result<ServiceConfig> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        tracing::debug!("Loading configuration from file: {:?}", path);
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(prefix).prefix_separator("_").separator("__").try_parsing(true),
    );

    let mut config: ServiceConfig = builder
        .build()
        .context("Failed to read configuration sources")?
        .try_deserialize()
        .context("Failed to parse configuration")?;

    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database.url = url;
    }

    Ok(config)
}

/// Validate configuration
pub fn validate_config(config: &ServiceConfig) -> Result<()> {
    config.engine.validate().context("Invalid engine configuration")?;
    config.binance.validate().context("Invalid binance configuration")?;

    if !config.service.in_memory {
        config.database.validate().context("Invalid database configuration")?;
    }

    match config.logging.level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow::anyhow!("Invalid log level: {}", config.logging.level)),
    }

    match config.logging.format.as_str() {
        "json" | "pretty" => {}
        _ => return Err(anyhow::anyhow!("Invalid log format: {}", config.logging.format)),
    }

    if config.http.port == 0 {
        return Err(anyhow::anyhow!("Invalid http port: {}", config.http.port));
    }

    if config.service.shutdown_timeout_secs == 0 {
        return Err(anyhow::anyhow!("shutdown_timeout_secs must be greater than 0"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.service.shutdown_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[engine]
poll_interval_ms = 1000
worker_count = 4

[http]
port = 9000

[logging]
format = "json"

[service]
in_memory = true
"#
        )
        .unwrap();

        let config = load_config_with_prefix(Some(file.path()), "PT_TEST_FILE").unwrap();
        assert_eq!(config.engine.poll_interval_ms, 1000);
        assert_eq!(config.engine.worker_count, 4);
        assert_eq!(config.engine.queue_capacity, price_tracker::DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.http.port, 9000);
        assert_eq!(config.logging.format, "json");
        assert!(config.service.in_memory);
    }

    #[test]
    fn test_environment_overrides_nested_keys() {
        std::env::set_var("PT_TEST_ENV_ENGINE__WORKER_COUNT", "3");
        std::env::set_var("PT_TEST_ENV_LOGGING__LEVEL", "debug");

        let config = load_config_with_prefix(None, "PT_TEST_ENV").unwrap();
        assert_eq!(config.engine.worker_count, 3);
        assert_eq!(config.logging.level, "debug");

        std::env::remove_var("PT_TEST_ENV_ENGINE__WORKER_COUNT");
        std::env::remove_var("PT_TEST_ENV_LOGGING__LEVEL");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(load_config_with_prefix(Some(&missing), "PT_TEST_MISSING").is_err());
    }

    #[test]
    fn test_in_memory_override_skips_database_checks() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[database]
url = ""

[http]
port = 9000
"#
        )
        .unwrap();

        let mut loaded = load_config_with_prefix(Some(file.path()), "PT_TEST_OVERRIDE").unwrap();
        loaded.database.url.clear();
        assert!(validate_config(&loaded).is_err());

        let config = loaded.with_overrides(true, Some(7000));
        assert!(config.service.in_memory);
        assert_eq!(config.http.port, 7000);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_overrides_leave_unset_values_alone() {
        let config = ServiceConfig::default().with_overrides(false, None);
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut config = ServiceConfig::default();
        config.logging.format = "xml".into();
        assert!(validate_config(&config).is_err());

        let mut config = ServiceConfig::default();
        config.engine.worker_count = 0;
        assert!(validate_config(&config).is_err());
    }
}
