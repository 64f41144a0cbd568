//! Binance spot ticker client
//!
//! Implements [`price_tracker::PriceSource`] over the public
//! `GET /api/v3/ticker/price` endpoint.

pub mod client;
pub mod config;
pub mod error;

pub use client::{parse_ticker_price, BinanceClient, TickerPrice};
pub use config::{BinanceConfig, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT_MS};
pub use error::BinanceError;

/// Result type alias for Binance client operations
pub type Result<T> = std::result::Result<T, BinanceError>;
