//! Interval loop that turns every tick into one fetch task per tracked coin

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::metrics::EngineMetrics;
use crate::models::TrackedCoin;
use crate::registry::CoinRegistry;

/// Unit of work handed to the worker pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTask {
    pub coin: TrackedCoin,
    /// Tick that produced the task, starting at 1
    pub tick: u64,
}

/// Periodic producer of fetch tasks.
///
/// The dispatcher owns the only sender of the task queue. When `run` returns the
/// sender is dropped, which closes the queue exactly once and lets every worker
/// drain what is left and exit.
pub struct Dispatcher {
    registry: Arc<CoinRegistry>,
    interval: Duration,
    queue: mpsc::Sender<FetchTask>,
    shutdown: CancellationToken,
    metrics: Arc<EngineMetrics>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<CoinRegistry>,
        interval: Duration,
        queue: mpsc::Sender<FetchTask>,
        shutdown: CancellationToken,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self { registry, interval, queue, shutdown, metrics }
    }

    /// Run until the shutdown token is cancelled.
    ///
    /// The first tick fires one full interval after the call. Ticks missed while a
    /// tick was blocked on a full queue are not replayed.
    pub async fn run(self) {
        info!(interval_ms = self.interval.as_millis() as u64, "Dispatcher started");

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tick: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    tick += 1;
                    if !self.dispatch_tick(tick).await {
                        break;
                    }
                }
            }
        }

        info!(ticks = tick, "Dispatcher stopped, closing task queue");
    }

    /// Enqueue one task per coin in the current registry snapshot.
    ///
    /// Returns `false` when the tick was abandoned because of shutdown or because
    /// the queue has no receivers left.
    async fn dispatch_tick(&self, tick: u64) -> bool {
        self.metrics.ticks_total.inc();
        let coins = self.registry.snapshot();
        let total = coins.len();
        debug!(tick, coins = total, "Dispatching tick");

        for (sent, coin) in coins.into_iter().enumerate() {
            let task = FetchTask { coin, tick };

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    self.metrics.partial_ticks_total.inc();
                    debug!(tick, sent, total, "Shutdown during tick, dropping the remainder");
                    return false;
                }
                result = self.queue.send(task) => {
                    if result.is_err() {
                        self.metrics.partial_ticks_total.inc();
                        warn!(tick, sent, total, "Task queue closed by receivers");
                        return false;
                    }
                    self.metrics.tasks_dispatched_total.inc();
                }
            }
        }

        true
    }
}
