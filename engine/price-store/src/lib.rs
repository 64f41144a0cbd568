//! Postgres persistence for the price tracker
//!
//! Three tables back the tracker: `cryptocurrencies` (unique on `symbol`),
//! `trackings` (one row per coin, holding the active flag) and `price_history`
//! (append-only samples indexed on `(cryptocurrency_id, timestamp)`).

pub mod coins;
pub mod config;
pub mod error;
pub mod history;
pub mod store;
pub mod trackings;

pub use coins::CoinRepository;
pub use config::DatabaseConfig;
pub use error::PgStoreError;
pub use history::HistoryRepository;
pub use store::PgStore;
pub use trackings::TrackingRepository;

/// Result type alias for Postgres store operations
pub type Result<T> = std::result::Result<T, PgStoreError>;
