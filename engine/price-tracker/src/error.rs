//! Error types for the price tracker core

use std::time::Duration;
use thiserror::Error;

use crate::engine::EngineState;

/// Errors reported by a price source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceSourceError {
    /// The exchange does not know the symbol/currency pair
    #[error("wrong symbol or currency: {symbol}/{currency}")]
    BadData { symbol: String, currency: String },

    /// Transport, status or parse failure
    #[error("unexpected price source error: {0}")]
    Unexpected(String),
}

impl PriceSourceError {
    pub fn bad_data(symbol: impl Into<String>, currency: impl Into<String>) -> Self {
        Self::BadData { symbol: symbol.into(), currency: currency.into() }
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }
}

/// Errors reported by a history store
#[derive(Error, Debug)]
pub enum HistoryError {
    /// No sample exists on either side of the requested time
    #[error("history not found")]
    NotFound,

    /// Infrastructure failure
    #[error("history storage error: {0}")]
    Storage(String),
}

impl HistoryError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// Errors reported by coin and tracking metadata stores
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} already exists")]
    AlreadyExists { entity: &'static str },

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("storage error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Errors surfaced by the polling engine lifecycle
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine is {actual}, expected {expected}")]
    InvalidState { expected: EngineState, actual: EngineState },

    #[error("Failed to load active coins: {0}")]
    InitialLoad(#[source] StoreError),

    #[error("Loading active coins timed out after {0:?}")]
    InitialLoadTimeout(Duration),

    #[error("Engine task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Errors of the add/remove/price tracking flow
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("symbol not found")]
    SymbolNotFound,

    #[error("cryptocurrency not found")]
    CoinNotFound,

    #[error("tracking not found")]
    TrackingNotFound,

    #[error("tracking already exists")]
    AlreadyExists,

    #[error("history not found")]
    HistoryNotFound,

    #[error(transparent)]
    PriceSource(#[from] PriceSourceError),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    History(HistoryError),
}

impl From<StoreError> for TrackingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists { .. } => TrackingError::AlreadyExists,
            other => TrackingError::Store(other),
        }
    }
}

impl From<HistoryError> for TrackingError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::NotFound => TrackingError::HistoryNotFound,
            other => TrackingError::History(other),
        }
    }
}

impl TrackingError {
    /// Whether the error is an expected "not found" outcome rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TrackingError::SymbolNotFound
                | TrackingError::CoinNotFound
                | TrackingError::TrackingNotFound
                | TrackingError::HistoryNotFound
        )
    }
}
