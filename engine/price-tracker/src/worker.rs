//! Fixed pool of workers draining the task queue

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::dispatcher::FetchTask;
use crate::metrics::EngineMetrics;
use crate::models::NewPricePoint;
use crate::source::{HistoryStore, PriceSource};

/// Receiver shared by every worker; a task is delivered to exactly one of them
type SharedReceiver = Arc<Mutex<mpsc::Receiver<FetchTask>>>;

/// Everything a worker needs besides the queue
#[derive(Clone)]
struct WorkerContext {
    prices: Arc<dyn PriceSource>,
    history: Arc<dyn HistoryStore>,
    metrics: Arc<EngineMetrics>,
    quote_currency: String,
    fetch_timeout: Duration,
    persist_timeout: Duration,
}

/// Handles of the running workers
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `config.worker_count` workers reading from `receiver`.
    ///
    /// Workers exit once the queue is closed and empty.
    pub fn spawn(
        config: &EngineConfig,
        receiver: mpsc::Receiver<FetchTask>,
        prices: Arc<dyn PriceSource>,
        history: Arc<dyn HistoryStore>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        let receiver: SharedReceiver = Arc::new(Mutex::new(receiver));
        let context = WorkerContext {
            prices,
            history,
            metrics,
            quote_currency: config.quote_currency.clone(),
            fetch_timeout: config.fetch_timeout(),
            persist_timeout: config.persist_timeout(),
        };

        let handles = (0..config.worker_count)
            .map(|worker_id| {
                let receiver = receiver.clone();
                let context = context.clone();
                tokio::spawn(async move { run_worker(worker_id, receiver, context).await })
            })
            .collect();

        info!(workers = config.worker_count, "Worker pool started");
        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Handles that cancel individual workers without waiting on them
    pub fn abort_handles(&self) -> Vec<AbortHandle> {
        self.handles.iter().map(JoinHandle::abort_handle).collect()
    }

    /// Wait for every worker to exit, returning how many ended abnormally
    pub async fn join(self) -> usize {
        let results = join_all(self.handles).await;

        let failed = results
            .into_iter()
            .filter_map(Result::err)
            .inspect(|e| error!("Worker task failed: {}", e))
            .count();

        info!(failed, "Worker pool stopped");
        failed
    }
}

async fn run_worker(worker_id: usize, receiver: SharedReceiver, context: WorkerContext) {
    context.metrics.active_workers.inc();
    debug!(worker_id, "Worker started");

    loop {
        // The lock is released before the task is processed
        let next = receiver.lock().await.recv().await;
        let Some(task) = next else {
            break;
        };

        process_task(worker_id, &context, task).await;
        context.metrics.tasks_completed_total.inc();
    }

    context.metrics.active_workers.dec();
    debug!(worker_id, "Worker stopped");
}

/// Fetch one price and append it to the history.
///
/// Failures are logged and counted; they never stop the worker.
async fn process_task(worker_id: usize, context: &WorkerContext, task: FetchTask) {
    let FetchTask { coin, tick } = task;

    let fetch = context.prices.get_price(&coin.symbol, &context.quote_currency);
    let price = match tokio::time::timeout(context.fetch_timeout, fetch).await {
        Ok(Ok(price)) => price,
        Ok(Err(e)) => {
            context.metrics.fetch_failures_total.inc();
            error!(worker_id, tick, symbol = %coin.symbol, "Error getting price: {}", e);
            return;
        }
        Err(_) => {
            context.metrics.fetch_failures_total.inc();
            warn!(
                worker_id,
                tick,
                symbol = %coin.symbol,
                timeout_ms = context.fetch_timeout.as_millis() as u64,
                "Price fetch timed out"
            );
            return;
        }
    };

    let point = NewPricePoint::now(coin.id, price);
    match tokio::time::timeout(context.persist_timeout, context.history.append(point)).await {
        Ok(Ok(stored)) => {
            context.metrics.samples_stored_total.inc();
            debug!(worker_id, tick, symbol = %coin.symbol, price, id = stored.id, "Price stored");
        }
        Ok(Err(e)) => {
            context.metrics.persist_failures_total.inc();
            error!(worker_id, tick, symbol = %coin.symbol, "Error storing price: {}", e);
        }
        Err(_) => {
            context.metrics.persist_failures_total.inc();
            warn!(
                worker_id,
                tick,
                symbol = %coin.symbol,
                timeout_ms = context.persist_timeout.as_millis() as u64,
                "Price persist timed out"
            );
        }
    }
}
