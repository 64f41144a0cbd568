use price_tracker::{CoinId, Tracking, TrackedCoin};
use sqlx::PgPool;

use crate::error::PgStoreError;
use crate::Result;

#[derive(Debug, sqlx::FromRow)]
struct TrackingRow {
    id: i64,
    cryptocurrency_id: i64,
    is_active: bool,
}

impl From<TrackingRow> for Tracking {
    fn from(row: TrackingRow) -> Self {
        Tracking { id: row.id, coin_id: row.cryptocurrency_id, is_active: row.is_active }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ActiveCoinRow {
    id: i64,
    symbol: String,
}

/// Queries over the `trackings` table
#[derive(Debug, Clone)]
pub struct TrackingRepository {
    pool: PgPool,
}

impl TrackingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, coin_id: CoinId, is_active: bool) -> Result<Tracking> {
        let row = sqlx::query_as::<_, TrackingRow>(
            "INSERT INTO trackings (cryptocurrency_id, is_active) VALUES ($1, $2) \
             RETURNING id, cryptocurrency_id, is_active",
        )
        .bind(coin_id)
        .bind(is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PgStoreError::on_conflict(e, "tracking"))?;

        Ok(row.into())
    }

    pub async fn get_by_coin_id(&self, coin_id: CoinId) -> Result<Option<Tracking>> {
        let row = sqlx::query_as::<_, TrackingRow>(
            "SELECT id, cryptocurrency_id, is_active FROM trackings WHERE cryptocurrency_id = $1",
        )
        .bind(coin_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Tracking::from))
    }

    /// Coins whose tracking is active, joined with their symbol
    pub async fn get_active(&self) -> Result<Vec<TrackedCoin>> {
        let rows = sqlx::query_as::<_, ActiveCoinRow>(
            "SELECT c.id, c.symbol FROM trackings t \
             JOIN cryptocurrencies c ON c.id = t.cryptocurrency_id \
             WHERE t.is_active = TRUE ORDER BY c.id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| TrackedCoin::new(row.id, row.symbol)).collect())
    }

    pub async fn update(&self, tracking: Tracking) -> Result<Tracking> {
        let row = sqlx::query_as::<_, TrackingRow>(
            "UPDATE trackings SET is_active = $1 WHERE id = $2 \
             RETURNING id, cryptocurrency_id, is_active",
        )
        .bind(tracking.is_active)
        .bind(tracking.id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Tracking::from).ok_or(PgStoreError::NotFound { entity: "tracking" })
    }
}
