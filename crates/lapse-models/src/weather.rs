//! Weather snapshot and the overlay values derived from it.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::phase::{classify, PhaseTag};

/// 16-point compass rose, clockwise from north.
const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Current conditions and today's sun events for one location.
///
/// Every derivation of a capture cycle (temperature, wind, phase) reads the
/// same snapshot so the values on a frame are mutually consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Apparent ("feels like") temperature in °F
    pub apparent_temperature_f: f64,
    /// Wind speed in miles per hour
    pub wind_speed_mph: f64,
    /// Direction the wind blows from, in degrees
    pub wind_bearing_deg: f64,
    /// Today's sunrise
    pub sunrise: DateTime<Utc>,
    /// Today's sunset
    pub sunset: DateTime<Utc>,
    /// IANA time zone of the location
    pub timezone: Tz,
}

impl WeatherSnapshot {
    /// Temperature in °F, rounded to one decimal.
    pub fn fahrenheit(&self) -> f64 {
        round_tenth(self.apparent_temperature_f)
    }

    /// Temperature in °C derived from the rounded Fahrenheit value.
    pub fn celsius(&self) -> f64 {
        round_tenth(fahrenheit_to_celsius(self.fahrenheit()))
    }

    /// Wind speed truncated to whole MPH.
    pub fn wind_mph(&self) -> i64 {
        self.wind_speed_mph.trunc() as i64
    }

    pub fn wind_direction(&self) -> &'static str {
        compass_point(self.wind_bearing_deg)
    }

    /// `"{F}° F | {C}° C"`
    pub fn temperature_line(&self) -> String {
        format!("{:.1}° F | {:.1}° C", self.fahrenheit(), self.celsius())
    }

    /// `"{mph} MPH {compass}"`
    pub fn wind_line(&self) -> String {
        format!("{} MPH {}", self.wind_mph(), self.wind_direction())
    }

    /// Convert an instant to the location's local time.
    pub fn local(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.timezone)
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.local(instant).date_naive()
    }

    /// Phase of day at `now`, with all instants aligned to the location's zone.
    pub fn phase_at(&self, now: DateTime<Utc>) -> PhaseTag {
        classify(
            &self.local(now),
            &self.local(self.sunrise),
            &self.local(self.sunset),
        )
    }
}

/// `(f - 32) * 5 / 9`
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Round to one decimal place.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Map a bearing in degrees to one of the 16 compass points.
pub fn compass_point(bearing_deg: f64) -> &'static str {
    let index = ((bearing_deg / 22.5) + 0.5).floor() as i64;
    COMPASS_POINTS[index.rem_euclid(16) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            apparent_temperature_f: 70.04,
            wind_speed_mph: 12.9,
            wind_bearing_deg: 200.0,
            sunrise: Utc.with_ymd_and_hms(2024, 6, 1, 11, 52, 0).unwrap(),
            sunset: Utc.with_ymd_and_hms(2024, 6, 2, 2, 41, 0).unwrap(),
            timezone: chrono_tz::America::Denver,
        }
    }

    #[test]
    fn test_celsius_conversion() {
        assert_eq!(round_tenth(fahrenheit_to_celsius(70.0)), 21.1);
        assert_eq!(round_tenth(fahrenheit_to_celsius(32.0)), 0.0);
        assert_eq!(round_tenth(fahrenheit_to_celsius(-40.0)), -40.0);
    }

    #[test]
    fn test_compass_points() {
        assert_eq!(compass_point(0.0), "N");
        assert_eq!(compass_point(22.5), "NNE");
        assert_eq!(compass_point(11.24), "N");
        assert_eq!(compass_point(90.0), "E");
        assert_eq!(compass_point(200.0), "SSW");
        assert_eq!(compass_point(359.0), "N");
        assert_eq!(compass_point(360.0), "N");
    }

    #[test]
    fn test_overlay_lines() {
        let weather = snapshot();
        assert_eq!(weather.temperature_line(), "70.0° F | 21.1° C");
        assert_eq!(weather.wind_line(), "12 MPH SSW");
    }

    #[test]
    fn test_phase_uses_location_zone() {
        let weather = snapshot();
        // 12:00 local in Denver (MDT, UTC-6)
        let noon = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
        assert_eq!(weather.phase_at(noon), PhaseTag::Day);
        assert_eq!(weather.local_date(noon), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());

        // 20:10 local is still 2024-06-01 even though UTC has rolled over
        let evening = Utc.with_ymd_and_hms(2024, 6, 2, 2, 10, 0).unwrap();
        assert_eq!(weather.local_date(evening), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(weather.phase_at(evening), PhaseTag::Sunset);
    }
}
