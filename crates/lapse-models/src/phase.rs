//! Time-of-day phase classification relative to local sunrise/sunset.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Width of the sunrise/sunset/dusk windows, in minutes.
pub const PHASE_WINDOW_MINUTES: f64 = 40.0;

/// Phases included in a timelapse when the caller does not choose.
pub const DEFAULT_TIMELAPSE_TAGS: [PhaseTag; 4] = [
    PhaseTag::Sunrise,
    PhaseTag::Day,
    PhaseTag::Sunset,
    PhaseTag::Dusk,
];

/// Time-of-day tag attached to every captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseTag {
    Sunrise,
    Sunset,
    Dusk,
    Night,
    Day,
}

impl PhaseTag {
    pub const ALL: [PhaseTag; 5] = [
        PhaseTag::Sunrise,
        PhaseTag::Sunset,
        PhaseTag::Dusk,
        PhaseTag::Night,
        PhaseTag::Day,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseTag::Sunrise => "sunrise",
            PhaseTag::Sunset => "sunset",
            PhaseTag::Dusk => "dusk",
            PhaseTag::Night => "night",
            PhaseTag::Day => "day",
        }
    }

    pub fn is_night(&self) -> bool {
        matches!(self, PhaseTag::Night)
    }
}

impl fmt::Display for PhaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseTag {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhaseTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| ModelError::UnknownPhase(s.to_string()))
    }
}

/// Classify `now` against the day's sunrise and sunset.
///
/// All three instants must be expressed in the location's time zone.
pub fn classify<Tz: TimeZone>(
    now: &DateTime<Tz>,
    sunrise: &DateTime<Tz>,
    sunset: &DateTime<Tz>,
) -> PhaseTag {
    let sunrise_minutes = minutes_between(now, sunrise);
    let sunset_minutes = minutes_between(now, sunset);
    classify_minutes(sunrise_minutes, sunset_minutes)
}

/// Classify from signed minute offsets `sunrise - now` and `sunset - now`.
///
/// Rules are evaluated in order and the first match wins; the windows
/// overlap near the poles so the order is the tie-break. Bounds are strict.
pub fn classify_minutes(sunrise_minutes: f64, sunset_minutes: f64) -> PhaseTag {
    let (dsr, dss) = (sunrise_minutes, sunset_minutes);

    if dsr.abs() < PHASE_WINDOW_MINUTES {
        PhaseTag::Sunrise
    } else if dss > 0.0 && dss < PHASE_WINDOW_MINUTES {
        PhaseTag::Sunset
    } else if dss < 0.0 && dss.abs() < PHASE_WINDOW_MINUTES {
        PhaseTag::Dusk
    } else if dsr < 0.0 && dss < 0.0 {
        PhaseTag::Night
    } else if dsr > 0.0 && dss > 0.0 {
        // pre-dawn
        PhaseTag::Night
    } else {
        PhaseTag::Day
    }
}

fn minutes_between<Tz: TimeZone>(now: &DateTime<Tz>, event: &DateTime<Tz>) -> f64 {
    let delta = event.clone().signed_duration_since(now.clone());
    delta.num_milliseconds() as f64 / 60_000.0
}
