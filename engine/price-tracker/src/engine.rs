//! Polling engine lifecycle
//!
//! `NotStarted -> Running -> Stopping -> Stopped`. The stopped state is terminal;
//! a new engine has to be built to sample again.

use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::dispatcher::Dispatcher;
use crate::error::EngineError;
use crate::metrics::EngineMetrics;
use crate::models::TrackedCoin;
use crate::registry::CoinRegistry;
use crate::source::{ActiveCoinSource, HistoryStore, PriceSource};
use crate::worker::WorkerPool;
use crate::Result;

/// Observable lifecycle state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    NotStarted,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::NotStarted => write!(f, "not started"),
            EngineState::Running => write!(f, "running"),
            EngineState::Stopping => write!(f, "stopping"),
            EngineState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Background tasks owned by a running engine
struct RunningParts {
    shutdown: CancellationToken,
    dispatcher: JoinHandle<()>,
    workers: WorkerPool,
}

/// Shutdown in progress; `drained` fires once every task has exited
struct Draining {
    drained: CancellationToken,
    tasks: Vec<AbortHandle>,
}

impl Draining {
    fn new(parts: &RunningParts) -> Self {
        let mut tasks = parts.workers.abort_handles();
        tasks.push(parts.dispatcher.abort_handle());
        Self { drained: CancellationToken::new(), tasks }
    }
}

enum Lifecycle {
    NotStarted,
    Running(RunningParts),
    Stopping(Draining),
    Stopped,
}

impl Lifecycle {
    fn state(&self) -> EngineState {
        match self {
            Lifecycle::NotStarted => EngineState::NotStarted,
            Lifecycle::Running(_) => EngineState::Running,
            Lifecycle::Stopping(_) => EngineState::Stopping,
            Lifecycle::Stopped => EngineState::Stopped,
        }
    }
}

/// Samples every coin in the registry once per poll interval
pub struct PollingEngine {
    config: EngineConfig,
    registry: Arc<CoinRegistry>,
    prices: Arc<dyn PriceSource>,
    history: Arc<dyn HistoryStore>,
    coins: Arc<dyn ActiveCoinSource>,
    metrics: Arc<EngineMetrics>,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

impl PollingEngine {
    /// Build an engine; nothing runs until [`PollingEngine::start`]
    pub fn new(
        config: EngineConfig,
        prices: Arc<dyn PriceSource>,
        history: Arc<dyn HistoryStore>,
        coins: Arc<dyn ActiveCoinSource>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            registry: Arc::new(CoinRegistry::new()),
            prices,
            history,
            coins,
            metrics: Arc::new(EngineMetrics::new()),
            lifecycle: Arc::new(Mutex::new(Lifecycle::NotStarted)),
        })
    }

    /// Load the active coins, then launch the workers and the dispatcher.
    ///
    /// Returns once everything is launched. A failed or timed out initial load
    /// leaves the engine in `NotStarted`.
    pub async fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if !matches!(*lifecycle, Lifecycle::NotStarted) {
            return Err(EngineError::InvalidState {
                expected: EngineState::NotStarted,
                actual: lifecycle.state(),
            });
        }

        let load_timeout = self.config.initial_load_timeout();
        let active = match tokio::time::timeout(load_timeout, self.coins.load_active_coins()).await
        {
            Ok(Ok(coins)) => coins,
            Ok(Err(e)) => {
                error!("Failed to load active coins: {}", e);
                return Err(EngineError::InitialLoad(e));
            }
            Err(_) => {
                error!(timeout_ms = self.config.initial_load_timeout_ms, "Loading active coins timed out");
                return Err(EngineError::InitialLoadTimeout(load_timeout));
            }
        };

        let loaded = active.len();
        self.registry.extend(active);
        self.metrics.tracked_coins.set(self.registry.len() as u64);

        let (sender, receiver) = mpsc::channel(self.config.queue_capacity);
        let shutdown = CancellationToken::new();

        let workers = WorkerPool::spawn(
            &self.config,
            receiver,
            self.prices.clone(),
            self.history.clone(),
            self.metrics.clone(),
        );

        let dispatcher = Dispatcher::new(
            self.registry.clone(),
            self.config.poll_interval(),
            sender,
            shutdown.clone(),
            self.metrics.clone(),
        );
        let dispatcher = tokio::spawn(dispatcher.run());

        *lifecycle = Lifecycle::Running(RunningParts { shutdown, dispatcher, workers });

        info!(
            coins = loaded,
            workers = self.config.worker_count,
            interval_ms = self.config.poll_interval_ms,
            "Polling engine started"
        );
        Ok(())
    }

    /// Signal shutdown and wait until the dispatcher and every worker have exited.
    ///
    /// Tasks already queued are drained before this returns. The drain runs in its
    /// own task, so it carries on if this future is dropped; a later call waits for
    /// it to finish. Stopping an engine that never started, or stopping twice, is a
    /// no-op.
    pub async fn stop(&self) -> Result<()> {
        let (parts, drained) = {
            let mut lifecycle = self.lifecycle.lock().await;
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running(parts) => {
                    let draining = Draining::new(&parts);
                    let drained = draining.drained.clone();
                    *lifecycle = Lifecycle::Stopping(draining);
                    (Some(parts), drained)
                }
                Lifecycle::Stopping(draining) => {
                    let drained = draining.drained.clone();
                    *lifecycle = Lifecycle::Stopping(draining);
                    (None, drained)
                }
                Lifecycle::NotStarted => {
                    info!("Polling engine stopped before it was started");
                    return Ok(());
                }
                Lifecycle::Stopped => return Ok(()),
            }
        };

        // Another call is already draining
        let Some(parts) = parts else {
            drained.cancelled().await;
            return Ok(());
        };

        info!("Stopping polling engine");
        parts.shutdown.cancel();

        let lifecycle = self.lifecycle.clone();
        let metrics = self.metrics.clone();
        let drain_task = tokio::spawn(async move {
            let result = drain(parts, &metrics).await;
            *lifecycle.lock().await = Lifecycle::Stopped;
            drained.cancel();
            result
        });

        drain_task.await?
    }

    /// Abort the tasks of a stop that is still draining.
    ///
    /// Samples in flight are lost. Pending [`PollingEngine::stop`] calls return
    /// shortly after.
    pub async fn abort(&self) {
        if let Lifecycle::Stopping(draining) = &*self.lifecycle.lock().await {
            warn!(tasks = draining.tasks.len(), "Aborting engine tasks still draining");
            for task in &draining.tasks {
                task.abort();
            }
        }
    }

    /// Start sampling `coin` from the next tick on; returns whether it was new
    pub fn add_coin(&self, coin: TrackedCoin) -> bool {
        let symbol = coin.symbol.clone();
        let added = self.registry.add(coin).is_none();
        self.metrics.tracked_coins.set(self.registry.len() as u64);

        info!(symbol = %symbol, added, "Coin added to registry");
        added
    }

    /// Stop sampling `symbol` from the next tick on; returns whether it was tracked
    pub fn remove_coin(&self, symbol: &str) -> bool {
        let removed = self.registry.remove(symbol).is_some();
        self.metrics.tracked_coins.set(self.registry.len() as u64);

        info!(symbol = %symbol, removed, "Coin removed from registry");
        removed
    }

    pub async fn state(&self) -> EngineState {
        self.lifecycle.lock().await.state()
    }

    pub fn registry(&self) -> &Arc<CoinRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Wait for the dispatcher to close the queue and for the workers to empty it
async fn drain(parts: RunningParts, metrics: &EngineMetrics) -> Result<()> {
    let dispatcher_result = parts.dispatcher.await;
    let failed_workers = parts.workers.join().await;
    if failed_workers > 0 {
        warn!(failed_workers, "Some workers ended abnormally");
    }

    let snapshot = metrics.snapshot();
    info!(
        ticks = snapshot.ticks_total,
        samples = snapshot.samples_stored_total,
        fetch_failures = snapshot.fetch_failures_total,
        persist_failures = snapshot.persist_failures_total,
        "Polling engine stopped"
    );

    if let Err(e) = dispatcher_result {
        if !e.is_cancelled() {
            return Err(e.into());
        }
    }
    Ok(())
}
