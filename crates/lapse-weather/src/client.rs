//! Weather forecast HTTP client.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use lapse_models::WeatherSnapshot;

use crate::error::{WeatherError, WeatherResult};
use crate::types::ForecastResponse;

/// Source of weather snapshots for a coordinate.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current conditions and today's sun events at (lat, lon).
    async fn snapshot(&self, lat: f64, lon: f64) -> WeatherResult<WeatherSnapshot>;
}

/// Configuration for the weather client.
#[derive(Debug, Clone)]
pub struct WeatherClientConfig {
    /// Base URL of the forecast API
    pub base_url: String,
    /// API key, sent as a path segment
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// How long a snapshot is reused for the same coordinate
    pub cache_ttl: Duration,
}

impl Default for WeatherClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.pirateweather.net".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(15),
            cache_ttl: Duration::from_secs(180),
        }
    }
}

impl WeatherClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WeatherResult<Self> {
        let api_key = std::env::var("WEATHER_API_KEY")
            .map_err(|_| WeatherError::NotConfigured("WEATHER_API_KEY not set".to_string()))?;

        Ok(Self {
            base_url: std::env::var("WEATHER_API_URL")
                .unwrap_or_else(|_| "https://api.pirateweather.net".to_string()),
            api_key,
            timeout: Duration::from_secs(
                std::env::var("WEATHER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15),
            ),
            cache_ttl: Duration::from_secs(
                std::env::var("WEATHER_CACHE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(180),
            ),
        })
    }
}

struct CachedSnapshot {
    fetched_at: Instant,
    snapshot: WeatherSnapshot,
}

/// HTTP client for the forecast API.
///
/// Snapshots are memoized per coordinate for `cache_ttl`, so every
/// derivation within one capture cycle reads the same values.
pub struct WeatherClient {
    http: Client,
    config: WeatherClientConfig,
    cache: Mutex<HashMap<(u64, u64), CachedSnapshot>>,
}

impl WeatherClient {
    /// Create a new weather client.
    pub fn new(config: WeatherClientConfig) -> WeatherResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(WeatherError::Network)?;

        Ok(Self {
            http,
            config,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> WeatherResult<Self> {
        Self::new(WeatherClientConfig::from_env()?)
    }

    fn forecast_url(&self, lat: f64, lon: f64) -> String {
        format!(
            "{}/forecast/{}/{},{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_key,
            lat,
            lon
        )
    }

    /// Fetch a fresh snapshot, bypassing the cache.
    pub async fn fetch(&self, lat: f64, lon: f64) -> WeatherResult<WeatherSnapshot> {
        let url = self.forecast_url(lat, lon);
        debug!(lat, lon, "Fetching forecast");

        let response = self
            .http
            .get(&url)
            .query(&[("units", "us"), ("exclude", "minutely,hourly,alerts,flags")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(lat, lon, %status, "Forecast request rejected");
            return Err(WeatherError::RequestFailed(format!(
                "weather provider returned {}: {}",
                status, body
            )));
        }

        let body = response.bytes().await?;
        let forecast: ForecastResponse = serde_json::from_slice(&body)?;
        forecast.into_snapshot()
    }
}

#[async_trait]
impl WeatherProvider for WeatherClient {
    async fn snapshot(&self, lat: f64, lon: f64) -> WeatherResult<WeatherSnapshot> {
        let key = (lat.to_bits(), lon.to_bits());

        {
            let cache = self.cache.lock().await;
            if let Some(cached) = cache.get(&key) {
                if cached.fetched_at.elapsed() < self.config.cache_ttl {
                    return Ok(cached.snapshot.clone());
                }
            }
        }

        let snapshot = self.fetch(lat, lon).await?;

        self.cache.lock().await.insert(
            key,
            CachedSnapshot {
                fetched_at: Instant::now(),
                snapshot: snapshot.clone(),
            },
        );

        Ok(snapshot)
    }
}
