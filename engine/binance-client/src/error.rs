use price_tracker::PriceSourceError;
use thiserror::Error;

/// Failures of a single ticker request
#[derive(Error, Debug)]
pub enum BinanceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Binance answers 400 for symbols or currencies it does not list
    #[error("Bad request for {symbol}/{currency}")]
    BadRequest { symbol: String, currency: String },

    #[error("Unexpected status code: {0}")]
    Status(u16),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid price {value:?}: {source}")]
    InvalidPrice {
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },
}

impl From<BinanceError> for PriceSourceError {
    fn from(err: BinanceError) -> Self {
        match err {
            BinanceError::BadRequest { symbol, currency } => {
                PriceSourceError::bad_data(symbol, currency)
            }
            other => PriceSourceError::unexpected(other.to_string()),
        }
    }
}
