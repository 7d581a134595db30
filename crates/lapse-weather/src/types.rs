//! Forecast API response types.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use lapse_models::WeatherSnapshot;

use crate::error::{WeatherError, WeatherResult};

/// Subset of the forecast document the pipeline reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    /// IANA time zone id of the queried point
    pub timezone: String,
    pub currently: Currently,
    pub daily: Daily,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Currently {
    /// °F with `units=us`
    pub apparent_temperature: f64,
    /// MPH with `units=us`
    pub wind_speed: f64,
    /// Omitted by the provider when the air is calm
    #[serde(default)]
    pub wind_bearing: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Daily {
    pub data: Vec<DailyPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPoint {
    /// Unix seconds
    pub sunrise_time: i64,
    /// Unix seconds
    pub sunset_time: i64,
}

impl ForecastResponse {
    /// Convert to a snapshot using today's (first) daily entry.
    pub fn into_snapshot(self) -> WeatherResult<WeatherSnapshot> {
        let timezone: Tz = self.timezone.parse().map_err(|_| {
            WeatherError::invalid_response(format!("unknown time zone '{}'", self.timezone))
        })?;

        let today = self
            .daily
            .data
            .first()
            .ok_or_else(|| WeatherError::invalid_response("forecast has no daily entries"))?;

        Ok(WeatherSnapshot {
            apparent_temperature_f: self.currently.apparent_temperature,
            wind_speed_mph: self.currently.wind_speed,
            wind_bearing_deg: self.currently.wind_bearing.unwrap_or(0.0),
            sunrise: unix_to_utc(today.sunrise_time)?,
            sunset: unix_to_utc(today.sunset_time)?,
            timezone,
        })
    }
}

fn unix_to_utc(seconds: i64) -> WeatherResult<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| WeatherError::invalid_response(format!("timestamp out of range: {}", seconds)))
}
