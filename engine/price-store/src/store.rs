use async_trait::async_trait;
use price_tracker::{
    ActiveCoinSource, CoinCatalog, CoinId, Cryptocurrency, NewCryptocurrency, StoreError,
    TrackedCoin, Tracking, TrackingStore,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::coins::CoinRepository;
use crate::config::DatabaseConfig;
use crate::history::HistoryRepository;
use crate::trackings::TrackingRepository;
use crate::Result;

/// Postgres-backed coin catalog, tracking store and history
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    coins: CoinRepository,
    trackings: TrackingRepository,
    history: HistoryRepository,
}

impl PgStore {
    /// Open a pool and apply the embedded migrations when configured to
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.url)
            .await?;

        info!(max_connections = config.max_connections, "Connected to Postgres");

        let store = Self::from_pool(pool);
        if config.run_migrations {
            store.migrate().await?;
        }
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            coins: CoinRepository::new(pool.clone()),
            trackings: TrackingRepository::new(pool.clone()),
            history: HistoryRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Round-trip check used by the health endpoint
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Postgres pool closed");
    }

    pub fn coins(&self) -> &CoinRepository {
        &self.coins
    }

    pub fn trackings(&self) -> &TrackingRepository {
        &self.trackings
    }

    pub fn history(&self) -> &HistoryRepository {
        &self.history
    }
}

#[async_trait]
impl ActiveCoinSource for PgStore {
    async fn load_active_coins(&self) -> std::result::Result<Vec<TrackedCoin>, StoreError> {
        Ok(self.trackings.get_active().await?)
    }
}

#[async_trait]
impl CoinCatalog for PgStore {
    async fn create(
        &self,
        coin: NewCryptocurrency,
    ) -> std::result::Result<Cryptocurrency, StoreError> {
        Ok(self.coins.create(&coin).await?)
    }

    async fn get_by_symbol(
        &self,
        symbol: &str,
    ) -> std::result::Result<Option<Cryptocurrency>, StoreError> {
        Ok(self.coins.get_by_symbol(symbol).await?)
    }

    async fn list(&self) -> std::result::Result<Vec<Cryptocurrency>, StoreError> {
        Ok(self.coins.get_all().await?)
    }

    async fn create_or_get(
        &self,
        coin: NewCryptocurrency,
    ) -> std::result::Result<Cryptocurrency, StoreError> {
        Ok(self.coins.create_or_get(&coin).await?)
    }
}

#[async_trait]
impl TrackingStore for PgStore {
    async fn create(
        &self,
        coin_id: CoinId,
        is_active: bool,
    ) -> std::result::Result<Tracking, StoreError> {
        Ok(self.trackings.create(coin_id, is_active).await?)
    }

    async fn get_by_coin_id(
        &self,
        coin_id: CoinId,
    ) -> std::result::Result<Option<Tracking>, StoreError> {
        Ok(self.trackings.get_by_coin_id(coin_id).await?)
    }

    async fn update(&self, tracking: Tracking) -> std::result::Result<Tracking, StoreError> {
        Ok(self.trackings.update(tracking).await?)
    }
}
