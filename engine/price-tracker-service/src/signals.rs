//! Signal handling for graceful shutdown

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::service::ServiceState;

/// Resolve the returned receiver on the first Ctrl+C or SIGTERM
pub fn setup_signal_handlers() -> Result<oneshot::Receiver<()>> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let sigterm = Arc::new(AtomicBool::new(false));
    #[cfg(unix)]
    signal_hook::flag::register(signal_hook::consts::SIGTERM, sigterm.clone())?;

    tokio::spawn(async move {
        let sigterm_received = async {
            loop {
                if sigterm.load(Ordering::Relaxed) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        };

        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => info!("Ctrl+C signal received"),
                Err(e) => error!("Failed to listen for Ctrl+C signal: {}", e),
            },
            _ = sigterm_received => info!("SIGTERM signal received"),
        }

        let _ = shutdown_tx.send(());
    });

    Ok(shutdown_rx)
}

/// Stop the HTTP server, then the engine, then release the store
pub async fn graceful_shutdown(
    service_state: Arc<ServiceState>,
    http_shutdown: oneshot::Sender<()>,
    http_handle: JoinHandle<()>,
) -> Result<()> {
    info!("Starting graceful shutdown...");
    let shutdown_timeout = service_state.config.service.shutdown_timeout();

    let _ = http_shutdown.send(());
    match timeout(shutdown_timeout, http_handle).await {
        Ok(Ok(())) => info!("HTTP server stopped gracefully"),
        Ok(Err(e)) => error!("HTTP server task failed: {}", e),
        Err(_) => warn!("HTTP server did not stop within timeout, forcing shutdown"),
    }

    if let Err(e) = service_state.shutdown().await {
        error!("Failed to shutdown service components: {}", e);
    }

    info!("Graceful shutdown complete");
    Ok(())
}
