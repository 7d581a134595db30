use std::path::Path;

use lapse_media::check_ffmpeg;
use lapse_models::encoding::FRAME_EXTENSION;
use lapse_models::keys::latest_key;
use lapse_storage::SpacesClient;
use lapse_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with work_dir={}",
        config.work_dir.display()
    );
    ensure_workdir(&config.work_dir).await?;
    let ffmpeg = check_ffmpeg().map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;
    println!("worker-selfcheck: ffmpeg at {}", ffmpeg.display());
    ensure_env_present(&[
        "SPACES_REGION",
        "SPACES_ACCESS_KEY_ID",
        "SPACES_SECRET_ACCESS_KEY",
        "WEATHER_API_KEY",
    ])?;

    let sites = config
        .load_locations()
        .map_err(|e| anyhow::anyhow!("sites file check failed: {}", e))?;
    if sites.iter().any(|s| s.draws_text()) && config.font_path.is_none() {
        return Err(anyhow::anyhow!(
            "text overlays are enabled but LAPSE_FONT_PATH is not set"
        ));
    }

    let spaces = SpacesClient::from_env()?;
    for site in &sites {
        spaces.check_connectivity(&site.prefix).await?;
        println!(
            "worker-selfcheck: bucket {} reachable, latest at {}",
            site.prefix,
            spaces.public_url(&site.prefix, &latest_key(FRAME_EXTENSION))
        );
    }

    println!("worker-selfcheck: ok ({} sites)", sites.len());
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;

    let marker = path.join(".selfcheck");
    tokio::fs::write(&marker, b"ok").await?;
    tokio::fs::remove_file(&marker).await?;
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}
