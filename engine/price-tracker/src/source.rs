//! Collaborator traits the engine and the tracking flow depend on

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::DEFAULT_QUOTE_CURRENCY;
use crate::error::{HistoryError, PriceSourceError, StoreError};
use crate::models::{
    CoinId, Cryptocurrency, NewCryptocurrency, NewPricePoint, PricePoint, TrackedCoin, Tracking,
};
use crate::resolver;

/// Current spot price of a symbol/quote pair
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the current price of `symbol` quoted in `currency`
    async fn get_price(&self, symbol: &str, currency: &str) -> Result<f64, PriceSourceError>;

    /// Whether the exchange lists `symbol` against the default quote currency.
    ///
    /// `BadData` means the symbol is unknown and yields `Ok(false)`; every other
    /// error propagates.
    async fn symbol_exists(&self, symbol: &str) -> Result<bool, PriceSourceError> {
        match self.get_price(symbol, DEFAULT_QUOTE_CURRENCY).await {
            Ok(_) => Ok(true),
            Err(PriceSourceError::BadData { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Append-only store of price samples
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Store a new sample and return it with its assigned identity
    async fn append(&self, point: NewPricePoint) -> Result<PricePoint, HistoryError>;

    /// Sample recorded exactly at `timestamp`
    async fn find_exact(
        &self,
        coin_id: CoinId,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<PricePoint>, HistoryError>;

    /// Most recent sample with `timestamp <= target`
    async fn find_at_or_before(
        &self,
        coin_id: CoinId,
        target: DateTime<Utc>,
    ) -> Result<Option<PricePoint>, HistoryError>;

    /// Earliest sample with `timestamp > target`
    async fn find_after(
        &self,
        coin_id: CoinId,
        target: DateTime<Utc>,
    ) -> Result<Option<PricePoint>, HistoryError>;

    /// Sample closest in time to `timestamp`, see [`resolver::resolve_nearest`]
    async fn nearest_price(
        &self,
        coin_id: CoinId,
        timestamp: DateTime<Utc>,
    ) -> Result<PricePoint, HistoryError> {
        resolver::resolve_nearest(self, coin_id, timestamp).await
    }
}

/// Source of the coins whose tracking is active, read once at engine start
#[async_trait]
pub trait ActiveCoinSource: Send + Sync {
    async fn load_active_coins(&self) -> Result<Vec<TrackedCoin>, StoreError>;
}

/// Durable cryptocurrency records
#[async_trait]
pub trait CoinCatalog: Send + Sync {
    /// Insert a new record; an existing symbol yields `StoreError::AlreadyExists`
    async fn create(&self, coin: NewCryptocurrency) -> Result<Cryptocurrency, StoreError>;

    async fn get_by_symbol(&self, symbol: &str) -> Result<Option<Cryptocurrency>, StoreError>;

    async fn list(&self) -> Result<Vec<Cryptocurrency>, StoreError>;

    /// Insert the record, or return the stored one when the symbol already exists
    async fn create_or_get(&self, coin: NewCryptocurrency) -> Result<Cryptocurrency, StoreError> {
        let symbol = coin.symbol.clone();
        match self.create(coin).await {
            Ok(created) => Ok(created),
            Err(StoreError::AlreadyExists { .. }) => self
                .get_by_symbol(&symbol)
                .await?
                .ok_or(StoreError::NotFound { entity: "cryptocurrency" }),
            Err(e) => Err(e),
        }
    }
}

/// Durable tracking flags
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Insert a tracking row; a second row for the same coin yields `AlreadyExists`
    async fn create(&self, coin_id: CoinId, is_active: bool) -> Result<Tracking, StoreError>;

    async fn get_by_coin_id(&self, coin_id: CoinId) -> Result<Option<Tracking>, StoreError>;

    async fn update(&self, tracking: Tracking) -> Result<Tracking, StoreError>;
}
