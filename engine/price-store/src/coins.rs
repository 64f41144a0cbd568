use price_tracker::{Cryptocurrency, NewCryptocurrency};
use sqlx::PgPool;

use crate::error::PgStoreError;
use crate::Result;

#[derive(Debug, sqlx::FromRow)]
struct CoinRow {
    id: i64,
    symbol: String,
    name: String,
}

impl From<CoinRow> for Cryptocurrency {
    fn from(row: CoinRow) -> Self {
        Cryptocurrency { id: row.id, symbol: row.symbol, name: row.name }
    }
}

/// Queries over the `cryptocurrencies` table
#[derive(Debug, Clone)]
pub struct CoinRepository {
    pool: PgPool,
}

impl CoinRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, coin: &NewCryptocurrency) -> Result<Cryptocurrency> {
        let row = sqlx::query_as::<_, CoinRow>(
            "INSERT INTO cryptocurrencies (symbol, name) VALUES ($1, $2) RETURNING id, symbol, name",
        )
        .bind(&coin.symbol)
        .bind(&coin.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PgStoreError::on_conflict(e, "cryptocurrency"))?;

        Ok(row.into())
    }

    pub async fn get_by_symbol(&self, symbol: &str) -> Result<Option<Cryptocurrency>> {
        let row = sqlx::query_as::<_, CoinRow>(
            "SELECT id, symbol, name FROM cryptocurrencies WHERE symbol = $1",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Cryptocurrency::from))
    }

    pub async fn get_all(&self) -> Result<Vec<Cryptocurrency>> {
        let rows = sqlx::query_as::<_, CoinRow>(
            "SELECT id, symbol, name FROM cryptocurrencies ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Cryptocurrency::from).collect())
    }

    /// Insert the coin, or return the stored row when the symbol is taken
    pub async fn create_or_get(&self, coin: &NewCryptocurrency) -> Result<Cryptocurrency> {
        match self.create(coin).await {
            Ok(created) => Ok(created),
            Err(PgStoreError::AlreadyExists { .. }) => self
                .get_by_symbol(&coin.symbol)
                .await?
                .ok_or(PgStoreError::NotFound { entity: "cryptocurrency" }),
            Err(e) => Err(e),
        }
    }
}
