//! Daily timelapse binary.
//!
//! Usage: `render-timelapse [YYYY-MM-DD]`. Without a date each site renders
//! its previous local day.

use chrono::Utc;
use tracing::{error, info};

use lapse_models::keys::parse_date;
use lapse_models::DEFAULT_TIMELAPSE_TAGS;
use lapse_worker::{init_tracing, WorkerConfig, WorkerContext};

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();
    init_tracing();

    let requested = match std::env::args().nth(1) {
        Some(arg) => match parse_date(&arg) {
            Some(date) => Some(date),
            None => {
                error!("Invalid date '{}', expected YYYY-MM-DD", arg);
                std::process::exit(2);
            }
        },
        None => None,
    };

    let config = WorkerConfig::from_env();
    let duration = config.timelapse_seconds;

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

    let mut failed = 0usize;
    for location in &locations {
        let date = match requested {
            Some(date) => date,
            None => match location.previous_local_date(Utc::now()).await {
                Ok(date) => date,
                Err(e) => {
                    error!(prefix = %location.prefix(), error = %e, "Could not resolve local date");
                    failed += 1;
                    continue;
                }
            },
        };

        // per-site errors are logged inside create_video
        if location
            .create_video(date, &DEFAULT_TIMELAPSE_TAGS, duration)
            .await
            .is_err()
        {
            failed += 1;
        }
    }

    info!(
        sites = locations.len(),
        failed,
        "Timelapse run complete"
    );

    if failed > 0 {
        std::process::exit(1);
    }
}
