//! In-memory collaborators
//!
//! Used by the test suites and by the service's in-memory mode. The history store
//! keeps one ordered map per coin so every resolver probe is a single range lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use crate::error::{HistoryError, StoreError};
use crate::models::{
    CoinId, Cryptocurrency, NewCryptocurrency, NewPricePoint, PricePoint, TrackedCoin, Tracking,
};
use crate::source::{ActiveCoinSource, CoinCatalog, HistoryStore, TrackingStore};

/// Ordering key of a stored sample; the id keeps samples sharing a timestamp apart
type SampleKey = (DateTime<Utc>, i64);

/// History store holding every sample in memory
#[derive(Debug)]
pub struct InMemoryHistoryStore {
    series: RwLock<HashMap<CoinId, BTreeMap<SampleKey, PricePoint>>>,
    next_id: AtomicI64,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self { series: RwLock::new(HashMap::new()), next_id: AtomicI64::new(1) }
    }

    /// All samples of a coin in timestamp order
    pub async fn points(&self, coin_id: CoinId) -> Vec<PricePoint> {
        let series = self.series.read().await;
        series.get(&coin_id).map(|s| s.values().cloned().collect()).unwrap_or_default()
    }

    /// Number of samples across all coins
    pub async fn total_points(&self) -> usize {
        self.series.read().await.values().map(BTreeMap::len).sum()
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, point: NewPricePoint) -> Result<PricePoint, HistoryError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let stored = point.into_point(id);

        let mut series = self.series.write().await;
        series.entry(stored.coin_id).or_default().insert((stored.timestamp, id), stored.clone());

        Ok(stored)
    }

    async fn find_exact(
        &self,
        coin_id: CoinId,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<PricePoint>, HistoryError> {
        let series = self.series.read().await;
        Ok(series.get(&coin_id).and_then(|s| {
            s.range((timestamp, i64::MIN)..=(timestamp, i64::MAX)).next().map(|(_, p)| p.clone())
        }))
    }

    async fn find_at_or_before(
        &self,
        coin_id: CoinId,
        target: DateTime<Utc>,
    ) -> Result<Option<PricePoint>, HistoryError> {
        let series = self.series.read().await;
        Ok(series
            .get(&coin_id)
            .and_then(|s| s.range(..=(target, i64::MAX)).next_back().map(|(_, p)| p.clone())))
    }

    async fn find_after(
        &self,
        coin_id: CoinId,
        target: DateTime<Utc>,
    ) -> Result<Option<PricePoint>, HistoryError> {
        let series = self.series.read().await;
        Ok(series.get(&coin_id).and_then(|s| {
            s.range((Bound::Excluded((target, i64::MAX)), Bound::Unbounded))
                .next()
                .map(|(_, p)| p.clone())
        }))
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    coins: BTreeMap<CoinId, Cryptocurrency>,
    by_symbol: HashMap<String, CoinId>,
    trackings: BTreeMap<CoinId, Tracking>,
    next_coin_id: i64,
    next_tracking_id: i64,
}

/// Coin and tracking metadata held in memory
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a coin with an active tracking row
    pub async fn insert_active(&self, symbol: &str) -> Cryptocurrency {
        let mut state = self.state.write().await;
        state.next_coin_id += 1;
        state.next_tracking_id += 1;

        let coin = Cryptocurrency {
            id: state.next_coin_id,
            symbol: symbol.to_string(),
            name: symbol.to_string(),
        };
        let tracking = Tracking { id: state.next_tracking_id, coin_id: coin.id, is_active: true };

        state.by_symbol.insert(coin.symbol.clone(), coin.id);
        state.coins.insert(coin.id, coin.clone());
        state.trackings.insert(coin.id, tracking);
        coin
    }
}

#[async_trait]
impl CoinCatalog for InMemoryCatalog {
    async fn create(&self, coin: NewCryptocurrency) -> Result<Cryptocurrency, StoreError> {
        let mut state = self.state.write().await;
        if state.by_symbol.contains_key(&coin.symbol) {
            return Err(StoreError::AlreadyExists { entity: "cryptocurrency" });
        }

        state.next_coin_id += 1;
        let created = Cryptocurrency { id: state.next_coin_id, symbol: coin.symbol, name: coin.name };
        state.by_symbol.insert(created.symbol.clone(), created.id);
        state.coins.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_symbol(&self, symbol: &str) -> Result<Option<Cryptocurrency>, StoreError> {
        let state = self.state.read().await;
        Ok(state.by_symbol.get(symbol).and_then(|id| state.coins.get(id)).cloned())
    }

    async fn list(&self) -> Result<Vec<Cryptocurrency>, StoreError> {
        Ok(self.state.read().await.coins.values().cloned().collect())
    }
}

#[async_trait]
impl TrackingStore for InMemoryCatalog {
    async fn create(&self, coin_id: CoinId, is_active: bool) -> Result<Tracking, StoreError> {
        let mut state = self.state.write().await;
        if state.trackings.contains_key(&coin_id) {
            return Err(StoreError::AlreadyExists { entity: "tracking" });
        }

        state.next_tracking_id += 1;
        let tracking = Tracking { id: state.next_tracking_id, coin_id, is_active };
        state.trackings.insert(coin_id, tracking);
        Ok(tracking)
    }

    async fn get_by_coin_id(&self, coin_id: CoinId) -> Result<Option<Tracking>, StoreError> {
        Ok(self.state.read().await.trackings.get(&coin_id).copied())
    }

    async fn update(&self, tracking: Tracking) -> Result<Tracking, StoreError> {
        let mut state = self.state.write().await;
        match state.trackings.get_mut(&tracking.coin_id) {
            Some(stored) if stored.id == tracking.id => {
                stored.is_active = tracking.is_active;
                Ok(*stored)
            }
            _ => Err(StoreError::NotFound { entity: "tracking" }),
        }
    }
}

#[async_trait]
impl ActiveCoinSource for InMemoryCatalog {
    async fn load_active_coins(&self) -> Result<Vec<TrackedCoin>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .trackings
            .values()
            .filter(|t| t.is_active)
            .filter_map(|t| state.coins.get(&t.coin_id))
            .map(Cryptocurrency::tracked)
            .collect())
    }
}
