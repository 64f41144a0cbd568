//! Price Tracker core
//!
//! This crate samples the spot price of a dynamic set of tracked symbols on a fixed
//! interval and stores every sample as an immutable time-series point. Stored points
//! answer "what was the price of X at time T" through nearest-neighbour resolution.
//!
//! ## Architecture
//!
//! - **CoinRegistry**: concurrent set of symbols currently being sampled
//! - **Dispatcher**: interval loop that turns every tick into one fetch task per coin
//! - **WorkerPool**: fixed set of workers draining the bounded task queue
//! - **PollingEngine**: start/stop lifecycle tying the pieces together
//! - **Resolver**: exact / before / after probes with closest-timestamp selection
//! - **TrackingService**: add/remove/price flow keeping durable state and the
//!   registry in sync
//!
//! Price quotes, history storage and coin metadata are reached through the traits in
//! [`source`], so the engine runs the same against Postgres, Binance or the in-memory
//! collaborators in [`memory`].

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod resolver;
pub mod source;
pub mod tracking;
pub mod worker;

#[cfg(test)]
mod testing;

pub use config::{
    EngineConfig, DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_INITIAL_LOAD_TIMEOUT_MS,
    DEFAULT_PERSIST_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_QUOTE_CURRENCY, DEFAULT_WORKER_COUNT,
};
pub use dispatcher::{Dispatcher, FetchTask};
pub use engine::{EngineState, PollingEngine};
pub use error::{EngineError, HistoryError, PriceSourceError, StoreError, TrackingError};
pub use memory::{InMemoryCatalog, InMemoryHistoryStore};
pub use metrics::{EngineMetrics, EngineMetricsSnapshot};
pub use models::{
    CoinId, CoinStatus, Cryptocurrency, NewCryptocurrency, NewPricePoint, PricePoint,
    TrackedCoin, Tracking,
};
pub use registry::CoinRegistry;
pub use resolver::{choose_nearest, resolve_nearest};
pub use source::{ActiveCoinSource, CoinCatalog, HistoryStore, PriceSource, TrackingStore};
pub use tracking::TrackingService;
pub use worker::WorkerPool;

/// Result type alias for engine lifecycle operations
pub type Result<T> = std::result::Result<T, EngineError>;
