// Test doubles shared by the unit and integration tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{HistoryError, PriceSourceError, StoreError};
use crate::models::{CoinId, NewPricePoint, PricePoint, TrackedCoin};
use crate::source::{ActiveCoinSource, HistoryStore, PriceSource};

/// Price source answering from a fixed table
#[derive(Debug, Default)]
pub struct ScriptedPriceSource {
    prices: HashMap<String, f64>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, price: f64) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    /// Every fetch of `symbol` fails with an unexpected error
    pub fn with_failure(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    /// Every fetch sleeps before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for ScriptedPriceSource {
    async fn get_price(&self, symbol: &str, currency: &str) -> Result<f64, PriceSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(symbol) {
            return Err(PriceSourceError::unexpected("connection refused"));
        }
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| PriceSourceError::bad_data(symbol, currency))
    }
}

/// History store whose appends never complete
pub struct StalledHistoryStore;

#[async_trait]
impl HistoryStore for StalledHistoryStore {
    async fn append(&self, _point: NewPricePoint) -> Result<PricePoint, HistoryError> {
        std::future::pending().await
    }

    async fn find_exact(
        &self,
        _coin_id: CoinId,
        _timestamp: DateTime<Utc>,
    ) -> Result<Option<PricePoint>, HistoryError> {
        Ok(None)
    }

    async fn find_at_or_before(
        &self,
        _coin_id: CoinId,
        _target: DateTime<Utc>,
    ) -> Result<Option<PricePoint>, HistoryError> {
        Ok(None)
    }

    async fn find_after(
        &self,
        _coin_id: CoinId,
        _target: DateTime<Utc>,
    ) -> Result<Option<PricePoint>, HistoryError> {
        Ok(None)
    }
}

/// Active coin source that fails or hangs instead of answering
pub enum BrokenCoinSource {
    Failing,
    Hanging,
}

#[async_trait]
impl ActiveCoinSource for BrokenCoinSource {
    async fn load_active_coins(&self) -> Result<Vec<TrackedCoin>, StoreError> {
        match self {
            BrokenCoinSource::Failing => Err(StoreError::backend("database is down")),
            BrokenCoinSource::Hanging => std::future::pending().await,
        }
    }
}
