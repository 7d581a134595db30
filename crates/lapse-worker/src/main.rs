//! Capture daemon binary.

use std::sync::Arc;

use tracing::{error, info};

use lapse_worker::metrics::init_metrics;
use lapse_worker::{init_tracing, CaptureExecutor, WorkerConfig, WorkerContext};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting lapse-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(port) = config.metrics_port {
        if let Err(e) = init_metrics(port) {
            error!("Failed to start metrics exporter: {}", e);
            std::process::exit(1);
        }
    }

    let sites = match config.load_locations() {
        Ok(sites) => sites,
        Err(e) => {
            error!("Failed to load sites: {}", e);
            std::process::exit(1);
        }
    };

    let context = match WorkerContext::from_env(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Failed to build worker context: {}", e);
            std::process::exit(1);
        }
    };

    let locations = match context.locations(sites) {
        Ok(locations) => locations,
        Err(e) => {
            error!("Invalid location: {}", e);
            std::process::exit(1);
        }
    };

    let executor = Arc::new(CaptureExecutor::new(locations));

    let signal_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        signal_executor.shutdown();
    });

    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
