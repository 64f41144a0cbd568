//! Add/remove/price flow
//!
//! Keeps the durable tracking flag and the engine registry in step: every
//! activation ends with `PollingEngine::add_coin`, every deactivation with
//! `PollingEngine::remove_coin`.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::engine::PollingEngine;
use crate::error::TrackingError;
use crate::models::{CoinStatus, Cryptocurrency, NewCryptocurrency, PricePoint};
use crate::source::{CoinCatalog, HistoryStore, PriceSource, TrackingStore};

pub struct TrackingService {
    catalog: Arc<dyn CoinCatalog>,
    trackings: Arc<dyn TrackingStore>,
    history: Arc<dyn HistoryStore>,
    prices: Arc<dyn PriceSource>,
    engine: Arc<PollingEngine>,
}

impl TrackingService {
    pub fn new(
        catalog: Arc<dyn CoinCatalog>,
        trackings: Arc<dyn TrackingStore>,
        history: Arc<dyn HistoryStore>,
        prices: Arc<dyn PriceSource>,
        engine: Arc<PollingEngine>,
    ) -> Self {
        Self { catalog, trackings, history, prices, engine }
    }

    /// Start tracking `symbol`, creating the coin and its tracking row on first use
    pub async fn add(&self, symbol: &str) -> Result<Cryptocurrency, TrackingError> {
        let symbol = normalize_symbol(symbol)?;

        if !self.prices.symbol_exists(&symbol).await? {
            return Err(TrackingError::SymbolNotFound);
        }

        let coin = self
            .catalog
            .create_or_get(NewCryptocurrency { symbol: symbol.clone(), name: symbol.clone() })
            .await?;

        match self.trackings.get_by_coin_id(coin.id).await? {
            None => {
                self.trackings.create(coin.id, true).await?;
            }
            Some(tracking) if !tracking.is_active => {
                let mut tracking = tracking;
                tracking.is_active = true;
                self.trackings.update(tracking).await?;
            }
            Some(_) => debug!(symbol = %symbol, "Tracking already active"),
        }

        self.engine.add_coin(coin.tracked());
        info!(symbol = %symbol, coin_id = coin.id, "Tracking activated");
        Ok(coin)
    }

    /// Stop tracking `symbol`; the coin and its history are kept
    /// Deactivate tracking of `symbol`, returning the coin with its new flag
    pub async fn remove(&self, symbol: &str) -> Result<CoinStatus, TrackingError> {
        let symbol = normalize_symbol(symbol)?;
        let coin = self.find_coin(&symbol).await?;

        let mut tracking = self
            .trackings
            .get_by_coin_id(coin.id)
            .await?
            .ok_or(TrackingError::TrackingNotFound)?;

        if tracking.is_active {
            tracking.is_active = false;
            self.trackings.update(tracking).await?;
        }

        self.engine.remove_coin(&coin.symbol);
        info!(symbol = %symbol, coin_id = coin.id, "Tracking deactivated");
        Ok(CoinStatus { coin, is_active: false })
    }

    /// Stored price of `symbol` closest in time to `timestamp`
    pub async fn price(
        &self,
        symbol: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<PricePoint, TrackingError> {
        let symbol = normalize_symbol(symbol)?;
        let coin = self.find_coin(&symbol).await?;

        Ok(self.history.nearest_price(coin.id, timestamp).await?)
    }

    /// Every known coin with its tracking flag
    pub async fn list(&self) -> Result<Vec<CoinStatus>, TrackingError> {
        let coins = self.catalog.list().await?;

        let mut statuses = Vec::with_capacity(coins.len());
        for coin in coins {
            let is_active =
                self.trackings.get_by_coin_id(coin.id).await?.is_some_and(|t| t.is_active);
            statuses.push(CoinStatus { coin, is_active });
        }
        Ok(statuses)
    }

    pub fn engine(&self) -> &Arc<PollingEngine> {
        &self.engine
    }

    async fn find_coin(&self, symbol: &str) -> Result<Cryptocurrency, TrackingError> {
        self.catalog.get_by_symbol(symbol).await?.ok_or(TrackingError::CoinNotFound)
    }
}

/// Upper-case a symbol and reject anything but non-empty ASCII alphanumerics
pub fn normalize_symbol(symbol: &str) -> Result<String, TrackingError> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(TrackingError::InvalidSymbol(symbol.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}
