use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::BinanceError;

/// Public REST endpoint of the Binance spot API
pub const DEFAULT_BASE_URL: &str = "https://api.binance.com/api/v3";

/// Default per-request timeout in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Binance client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinanceConfig {
    /// Base URL without a trailing slash
    pub base_url: String,

    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl BinanceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), BinanceError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(BinanceError::Config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }

        if self.request_timeout_ms == 0 {
            return Err(BinanceError::Config("request_timeout_ms must be greater than 0".into()));
        }

        Ok(())
    }
}
