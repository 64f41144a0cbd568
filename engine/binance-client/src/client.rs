use async_trait::async_trait;
use price_tracker::{PriceSource, PriceSourceError};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::BinanceConfig;
use crate::error::BinanceError;
use crate::Result;

/// Body of `GET /ticker/price`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TickerPrice {
    #[serde(default)]
    pub symbol: String,
    /// Decimal price as sent by the exchange
    pub price: String,
}

/// Parse a ticker body into a float price
pub fn parse_ticker_price(body: &str) -> Result<f64> {
    let ticker: TickerPrice = serde_json::from_str(body)?;
    ticker
        .price
        .trim()
        .parse::<f64>()
        .map_err(|source| BinanceError::InvalidPrice { value: ticker.price.clone(), source })
}

/// Spot price client for the Binance REST API
#[derive(Debug, Clone)]
pub struct BinanceClient {
    config: BinanceConfig,
    client: Client,
}

impl BinanceClient {
    pub fn new(config: BinanceConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BinanceConfig {
        &self.config
    }

    fn ticker_url(&self) -> String {
        format!("{}/ticker/price", self.config.base_url.trim_end_matches('/'))
    }

    /// Current price of `symbol` quoted in `currency`, e.g. BTC in USDT
    pub async fn fetch_price(&self, symbol: &str, currency: &str) -> Result<f64> {
        let pair = format!("{symbol}{currency}");
        let response = self.client.get(self.ticker_url()).query(&[("symbol", &pair)]).send().await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::BAD_REQUEST => {
                return Err(BinanceError::BadRequest {
                    symbol: symbol.to_string(),
                    currency: currency.to_string(),
                });
            }
            status => return Err(BinanceError::Status(status.as_u16())),
        }

        let body = response.text().await?;
        let price = parse_ticker_price(&body)?;

        debug!(pair = %pair, price, "Fetched ticker price");
        Ok(price)
    }
}

#[async_trait]
impl PriceSource for BinanceClient {
    async fn get_price(
        &self,
        symbol: &str,
        currency: &str,
    ) -> std::result::Result<f64, PriceSourceError> {
        self.fetch_price(symbol, currency).await.map_err(|e| {
            error!(symbol, currency, "Failed to fetch price: {}", e);
            PriceSourceError::from(e)
        })
    }
}
