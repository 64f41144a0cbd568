//! Domain models shared by the engine and its collaborators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a cryptocurrency record
pub type CoinId = i64;

/// A coin the engine samples on every tick
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackedCoin {
    pub id: CoinId,
    pub symbol: String,
}

impl TrackedCoin {
    pub fn new(id: CoinId, symbol: impl Into<String>) -> Self {
        Self { id, symbol: symbol.into() }
    }
}

/// Durable cryptocurrency record, unique on `symbol`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cryptocurrency {
    pub id: CoinId,
    pub symbol: String,
    pub name: String,
}

impl Cryptocurrency {
    /// Projection used by the registry and the dispatcher
    pub fn tracked(&self) -> TrackedCoin {
        TrackedCoin::new(self.id, self.symbol.clone())
    }
}

/// Cryptocurrency that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCryptocurrency {
    pub symbol: String,
    pub name: String,
}

/// Durable tracking flag of a cryptocurrency, unique on `coin_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracking {
    pub id: i64,
    pub coin_id: CoinId,
    pub is_active: bool,
}

/// A cryptocurrency together with its tracking state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinStatus {
    #[serde(flatten)]
    pub coin: Cryptocurrency,
    pub is_active: bool,
}

/// Price sample waiting to be appended to the history
#[derive(Debug, Clone, PartialEq)]
pub struct NewPricePoint {
    pub coin_id: CoinId,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl NewPricePoint {
    pub fn new(coin_id: CoinId, price: f64, timestamp: DateTime<Utc>) -> Self {
        Self { coin_id, price, timestamp }
    }

    /// Sample stamped with the current wall-clock time
    pub fn now(coin_id: CoinId, price: f64) -> Self {
        Self::new(coin_id, price, Utc::now())
    }

    /// Attach the identity assigned by a store
    pub fn into_point(self, id: i64) -> PricePoint {
        PricePoint { id, coin_id: self.coin_id, price: self.price, timestamp: self.timestamp }
    }
}

/// Immutable stored price sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub id: i64,
    pub coin_id: CoinId,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}
