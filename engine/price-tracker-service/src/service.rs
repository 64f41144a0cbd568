//! Service state management and component initialization

use anyhow::{Context, Result};
use binance_client::BinanceClient;
use price_store::PgStore;
use price_tracker::{
    ActiveCoinSource, CoinCatalog, EngineState, HistoryStore, InMemoryCatalog,
    InMemoryHistoryStore, PollingEngine, PriceSource, TrackingService, TrackingStore,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::config::ServiceConfig;

/// Storage collaborators the engine and the tracking flow run against
struct Backends {
    coins: Arc<dyn ActiveCoinSource>,
    catalog: Arc<dyn CoinCatalog>,
    trackings: Arc<dyn TrackingStore>,
    history: Arc<dyn HistoryStore>,
    store: Option<PgStore>,
}

impl Backends {
    fn in_memory() -> Self {
        let catalog = Arc::new(InMemoryCatalog::new());
        Self {
            coins: catalog.clone(),
            catalog: catalog.clone(),
            trackings: catalog,
            history: Arc::new(InMemoryHistoryStore::new()),
            store: None,
        }
    }

    fn postgres(store: PgStore) -> Self {
        let shared = Arc::new(store.clone());
        Self {
            coins: shared.clone(),
            catalog: shared.clone(),
            trackings: shared,
            history: Arc::new(store.history().clone()),
            store: Some(store),
        }
    }
}

/// Health report served on `/healthz`
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub engine: String,
    pub database: &'static str,
}

/// Service state containing all initialized components
pub struct ServiceState {
    /// Service configuration
    pub config: ServiceConfig,

    /// Polling engine
    pub engine: Arc<PollingEngine>,

    /// Add/remove/price flow
    pub tracking: Arc<TrackingService>,

    /// Price history written by the engine
    pub history: Arc<dyn HistoryStore>,

    /// Postgres store, absent in in-memory mode
    pub store: Option<PgStore>,
}

impl ServiceState {
    /// Connect the store and build the engine with the Binance price source
    pub async fn new(config: ServiceConfig) -> Result<Self> {
        info!("Initializing service components...");

        let prices: Arc<dyn PriceSource> = Arc::new(
            BinanceClient::new(config.binance.clone()).context("Failed to create Binance client")?,
        );

        let backends = if config.service.in_memory {
            warn!("Running with in-memory storage, nothing survives a restart");
            Backends::in_memory()
        } else {
            info!("Connecting to Postgres...");
            let store = PgStore::connect(&config.database)
                .await
                .context("Failed to connect to Postgres")?;
            Backends::postgres(store)
        };

        Self::assemble(config, prices, backends)
    }

    /// In-memory state around an arbitrary price source
    pub fn in_memory(config: ServiceConfig, prices: Arc<dyn PriceSource>) -> Result<Self> {
        Self::assemble(config, prices, Backends::in_memory())
    }

    fn assemble(config: ServiceConfig, prices: Arc<dyn PriceSource>, backends: Backends) -> Result<Self> {
        let engine = Arc::new(
            PollingEngine::new(
                config.engine.clone(),
                prices.clone(),
                backends.history.clone(),
                backends.coins,
            )
            .context("Failed to create polling engine")?,
        );

        let tracking = Arc::new(TrackingService::new(
            backends.catalog,
            backends.trackings,
            backends.history.clone(),
            prices,
            engine.clone(),
        ));

        info!("Service components initialized");
        Ok(Self { config, engine, tracking, history: backends.history, store: backends.store })
    }

    /// Load the active coins and start sampling
    pub async fn start_engine(&self) -> Result<()> {
        self.engine.start().await.context("Failed to start polling engine")?;
        Ok(())
    }

    pub async fn health(&self) -> HealthStatus {
        let engine = self.engine.state().await;

        let database = match &self.store {
            None => "in-memory",
            Some(store) => match store.ping().await {
                Ok(()) => "connected",
                Err(e) => {
                    warn!("Database health check failed: {}", e);
                    "unavailable"
                }
            },
        };

        let healthy = engine == EngineState::Running && database != "unavailable";
        HealthStatus {
            status: if healthy { "healthy" } else { "degraded" },
            engine: engine.to_string(),
            database,
        }
    }

    /// Stop the engine within the shutdown timeout and close the pool
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down service components...");

        match timeout(self.config.service.shutdown_timeout(), self.engine.stop()).await {
            Ok(Ok(())) => info!("Polling engine stopped"),
            Ok(Err(e)) => error!("Polling engine failed while stopping: {}", e),
            Err(_) => {
                warn!("Polling engine did not stop within timeout, aborting workers");
                self.engine.abort().await;
                if let Err(e) = self.engine.stop().await {
                    error!("Polling engine failed while aborting: {}", e);
                }
            }
        }

        if let Some(store) = &self.store {
            store.close().await;
        }

        Ok(())
    }
}
