use async_trait::async_trait;
use chrono::{DateTime, Utc};
use price_tracker::{CoinId, HistoryError, HistoryStore, NewPricePoint, PricePoint};
use sqlx::PgPool;
use tracing::debug;

use crate::Result;

#[derive(Debug, sqlx::FromRow)]
struct PriceRow {
    id: i64,
    cryptocurrency_id: i64,
    price: f64,
    timestamp: DateTime<Utc>,
}

impl From<PriceRow> for PricePoint {
    fn from(row: PriceRow) -> Self {
        PricePoint {
            id: row.id,
            coin_id: row.cryptocurrency_id,
            price: row.price,
            timestamp: row.timestamp,
        }
    }
}

const SELECT_EXACT: &str = "SELECT id, cryptocurrency_id, price, timestamp FROM price_history \
     WHERE cryptocurrency_id = $1 AND timestamp = $2 ORDER BY id ASC LIMIT 1";

const SELECT_AT_OR_BEFORE: &str = "SELECT id, cryptocurrency_id, price, timestamp FROM price_history \
     WHERE cryptocurrency_id = $1 AND timestamp <= $2 ORDER BY timestamp DESC, id DESC LIMIT 1";

const SELECT_AFTER: &str = "SELECT id, cryptocurrency_id, price, timestamp FROM price_history \
     WHERE cryptocurrency_id = $1 AND timestamp > $2 ORDER BY timestamp ASC, id ASC LIMIT 1";

/// Append-only access to the `price_history` table
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    pool: PgPool,
}

impl HistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, point: &NewPricePoint) -> Result<PricePoint> {
        let row = sqlx::query_as::<_, PriceRow>(
            "INSERT INTO price_history (cryptocurrency_id, price, timestamp) VALUES ($1, $2, $3) \
             RETURNING id, cryptocurrency_id, price, timestamp",
        )
        .bind(point.coin_id)
        .bind(point.price)
        .bind(point.timestamp)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn probe(
        &self,
        query: &'static str,
        coin_id: CoinId,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<PricePoint>> {
        let row = sqlx::query_as::<_, PriceRow>(query)
            .bind(coin_id)
            .bind(timestamp)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(PricePoint::from))
    }
}

#[async_trait]
impl HistoryStore for HistoryRepository {
    async fn append(&self, point: NewPricePoint) -> std::result::Result<PricePoint, HistoryError> {
        let stored = self.insert(&point).await?;
        debug!(coin_id = stored.coin_id, id = stored.id, "Price sample stored");
        Ok(stored)
    }

    async fn find_exact(
        &self,
        coin_id: CoinId,
        timestamp: DateTime<Utc>,
    ) -> std::result::Result<Option<PricePoint>, HistoryError> {
        Ok(self.probe(SELECT_EXACT, coin_id, timestamp).await?)
    }

    async fn find_at_or_before(
        &self,
        coin_id: CoinId,
        target: DateTime<Utc>,
    ) -> std::result::Result<Option<PricePoint>, HistoryError> {
        Ok(self.probe(SELECT_AT_OR_BEFORE, coin_id, target).await?)
    }

    async fn find_after(
        &self,
        coin_id: CoinId,
        target: DateTime<Utc>,
    ) -> std::result::Result<Option<PricePoint>, HistoryError> {
        Ok(self.probe(SELECT_AFTER, coin_id, target).await?)
    }
}
