//! Price Tracker Service Library
//!
//! Wires the polling engine to Postgres (or in-memory storage) and the Binance
//! price source, serves the REST API and shuts everything down gracefully.

use anyhow::{Context, Result};
use std::path::Path;

pub mod config;
pub mod logging;
pub mod rest_api;
pub mod service;
pub mod signals;

#[cfg(test)]
mod testing;

pub use config::ServiceConfig;
pub use logging::initialize_logging;
pub use rest_api::create_routes;
pub use service::{HealthStatus, ServiceState};
pub use signals::{graceful_shutdown, setup_signal_handlers};

/// Load configuration from an optional file and the environment
pub fn load_configuration(path: Option<&Path>) -> Result<ServiceConfig> {
    config::load_config(path).context("Failed to load service configuration")
}
