//! Configuration for the polling engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::EngineError;

/// Default interval between two dispatcher ticks (5 seconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Default number of workers draining the task queue
pub const DEFAULT_WORKER_COUNT: usize = 10;

/// Default capacity of the bounded task queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

/// Default deadline for a single outbound price request
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5_000;

/// Default deadline for a single history append
pub const DEFAULT_PERSIST_TIMEOUT_MS: u64 = 5_000;

/// Default deadline for loading the initial set of active coins
pub const DEFAULT_INITIAL_LOAD_TIMEOUT_MS: u64 = 5_000;

/// Quote currency every tracked symbol is priced in
pub const DEFAULT_QUOTE_CURRENCY: &str = "USDT";

/// Polling engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval between dispatcher ticks in milliseconds
    pub poll_interval_ms: u64,

    /// Number of concurrent workers
    pub worker_count: usize,

    /// Capacity of the task queue between dispatcher and workers
    pub queue_capacity: usize,

    /// Per-task price fetch deadline in milliseconds
    pub fetch_timeout_ms: u64,

    /// Per-task history append deadline in milliseconds
    pub persist_timeout_ms: u64,

    /// Deadline for the initial active-coin load in milliseconds
    pub initial_load_timeout_ms: u64,

    /// Quote currency passed to the price source (e.g. "USDT")
    pub quote_currency: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            persist_timeout_ms: DEFAULT_PERSIST_TIMEOUT_MS,
            initial_load_timeout_ms: DEFAULT_INITIAL_LOAD_TIMEOUT_MS,
            quote_currency: DEFAULT_QUOTE_CURRENCY.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }

    pub fn initial_load_timeout(&self) -> Duration {
        Duration::from_millis(self.initial_load_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.poll_interval_ms == 0 {
            return Err(EngineError::Config("poll_interval_ms must be greater than 0".into()));
        }

        if self.worker_count == 0 {
            return Err(EngineError::Config("worker_count must be at least 1".into()));
        }

        if self.queue_capacity == 0 {
            return Err(EngineError::Config("queue_capacity must be at least 1".into()));
        }

        if self.fetch_timeout_ms == 0 || self.persist_timeout_ms == 0 {
            return Err(EngineError::Config("per-task timeouts must be greater than 0".into()));
        }

        if self.initial_load_timeout_ms == 0 {
            return Err(EngineError::Config(
                "initial_load_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.quote_currency.trim().is_empty() {
            return Err(EngineError::Config("quote_currency must not be empty".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.worker_count, 10);
        assert_eq!(config.queue_capacity, 50);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(5));
        assert_eq!(config.persist_timeout(), Duration::from_secs(5));
        assert_eq!(config.initial_load_timeout(), Duration::from_secs(5));
        assert_eq!(config.quote_currency, "USDT");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_engine_config_rejects_zero_workers() {
        let config = EngineConfig { worker_count: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_engine_config_rejects_zero_capacity_and_interval() {
        let config = EngineConfig { queue_capacity: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = EngineConfig { poll_interval_ms: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = EngineConfig { quote_currency: " ".into(), ..Default::default() };
        assert!(config.validate().is_err());
    }
}
