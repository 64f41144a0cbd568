// Test doubles for the service crate

use async_trait::async_trait;
use price_tracker::{PriceSource, PriceSourceError};
use std::collections::HashMap;
use std::time::Duration;

/// Price source answering from a fixed table; unknown symbols are bad data
pub struct StaticPriceSource {
    prices: HashMap<String, f64>,
    delay: Option<Duration>,
}

impl StaticPriceSource {
    pub fn new(prices: &[(&str, f64)]) -> Self {
        Self { prices: prices.iter().map(|(s, p)| (s.to_string(), *p)).collect(), delay: None }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn get_price(&self, symbol: &str, currency: &str) -> Result<f64, PriceSourceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.prices.get(symbol).copied().ok_or_else(|| PriceSourceError::bad_data(symbol, currency))
    }
}
