//! Price Tracker Service
//!
//! Samples the spot price of every tracked symbol on a fixed interval, stores the
//! samples and answers point-in-time price queries over REST.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::info;

use price_tracker_service::{
    config::validate_config, create_routes, graceful_shutdown, initialize_logging,
    load_configuration, setup_signal_handlers, ServiceState,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep coins and history in memory instead of Postgres
    #[arg(long)]
    in_memory: bool,

    /// Port of the REST API, overrides the configuration
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let config = load_configuration(args.config.as_deref())?.with_overrides(args.in_memory, args.port);
    validate_config(&config).context("Invalid service configuration")?;

    initialize_logging(&config.logging)?;
    info!("Starting Price Tracker Service v{}", env!("CARGO_PKG_VERSION"));

    let host: IpAddr = config.http.host.parse().context("Invalid http host")?;
    let addr = SocketAddr::new(host, config.http.port);

    let service_state = Arc::new(ServiceState::new(config).await?);
    info!("Service state initialized");

    service_state.start_engine().await?;

    let shutdown_signal = setup_signal_handlers()?;
    info!("Signal handlers configured");

    let (http_shutdown_tx, http_shutdown_rx) = oneshot::channel::<()>();
    let (bound, server) = warp::serve(create_routes(service_state.clone()))
        .try_bind_with_graceful_shutdown(addr, async {
            let _ = http_shutdown_rx.await;
        })
        .context("Failed to bind REST API")?;
    let http_handle = tokio::spawn(server);
    info!("REST API listening on {}", bound);

    info!("Price Tracker Service is running. Press Ctrl+C to shutdown gracefully.");
    let _ = shutdown_signal.await;

    info!("Shutdown signal received. Initiating graceful shutdown...");
    graceful_shutdown(service_state, http_shutdown_tx, http_handle).await?;

    info!("Price Tracker Service shutdown complete");
    Ok(())
}
