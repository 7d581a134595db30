//! Per-site capture configuration.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ModelError, ModelResult};

/// How a frame is pulled from a resource address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Single HTTP(S) GET of a still image
    Http,
    /// One frame extracted from an RTSP stream
    Rtsp,
}

/// Immutable configuration for one capture site.
///
/// The `prefix` doubles as the human-readable tag and the storage bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Camera address; the scheme selects the acquisition method
    pub resource_url: String,
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    /// Storage namespace and key prefix
    pub prefix: String,
    /// Capture cadence in minutes (should divide 60)
    #[serde(default = "default_frequency")]
    pub frequency_minutes: u32,
    #[serde(default = "default_true")]
    pub overlay_weather: bool,
    #[serde(default)]
    pub overlay_title: bool,
    #[serde(default = "default_true")]
    pub overlay_time: bool,
    /// Text for the title overlay
    #[serde(default)]
    pub title: Option<String>,
}

fn default_frequency() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl LocationConfig {
    /// Create a config with the default cadence and overlays.
    pub fn new(resource_url: impl Into<String>, lat: f64, lon: f64, prefix: impl Into<String>) -> Self {
        Self {
            resource_url: resource_url.into(),
            lat,
            lon,
            prefix: prefix.into(),
            frequency_minutes: default_frequency(),
            overlay_weather: true,
            overlay_title: false,
            overlay_time: true,
            title: None,
        }
    }

    pub fn with_frequency(mut self, minutes: u32) -> Self {
        self.frequency_minutes = minutes;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.overlay_title = true;
        self.title = Some(title.into());
        self
    }

    /// Enable or disable each overlay.
    pub fn with_overlays(mut self, weather: bool, time: bool, title: bool) -> Self {
        self.overlay_weather = weather;
        self.overlay_time = time;
        self.overlay_title = title;
        self
    }

    /// Whether any enabled overlay needs a font.
    pub fn draws_text(&self) -> bool {
        self.overlay_weather || self.overlay_time || self.overlay_title
    }

    /// Title text, only when the title overlay is enabled.
    pub fn title_text(&self) -> Option<&str> {
        if self.overlay_title {
            self.title.as_deref()
        } else {
            None
        }
    }

    /// Acquisition method implied by the resource URL scheme.
    pub fn source_kind(&self) -> ModelResult<SourceKind> {
        let url = Url::parse(&self.resource_url).map_err(|e| {
            ModelError::invalid_location(&self.prefix, format!("bad resource_url: {}", e))
        })?;

        match url.scheme() {
            "http" | "https" => Ok(SourceKind::Http),
            "rtsp" | "rtsps" => Ok(SourceKind::Rtsp),
            other => Err(ModelError::invalid_location(
                &self.prefix,
                format!("unsupported resource scheme '{}'", other),
            )),
        }
    }

    /// Check the config before a `Location` is built from it.
    ///
    /// Frequencies that do not divide 60 are accepted; they only make the
    /// capture interval irregular.
    pub fn validate(&self) -> ModelResult<()> {
        if !is_valid_prefix(&self.prefix) {
            return Err(ModelError::invalid_location(
                &self.prefix,
                "prefix must be 3-63 chars of lowercase letters, digits or '-'",
            ));
        }

        if self.frequency_minutes == 0 {
            return Err(ModelError::invalid_location(
                &self.prefix,
                "frequency_minutes must be at least 1",
            ));
        }

        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            return Err(ModelError::invalid_location(
                &self.prefix,
                format!("coordinates out of range: {}, {}", self.lat, self.lon),
            ));
        }

        if self.overlay_title && self.title.as_deref().map_or(true, str::is_empty) {
            return Err(ModelError::invalid_location(
                &self.prefix,
                "overlay_title is enabled but no title is set",
            ));
        }

        self.source_kind()?;
        Ok(())
    }
}

/// The prefix is used as a bucket name, so it follows bucket naming rules.
fn is_valid_prefix(prefix: &str) -> bool {
    (3..=63).contains(&prefix.len())
        && prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !prefix.starts_with('-')
        && !prefix.ends_with('-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_json() {
        let config: LocationConfig = serde_json::from_str(
            r#"{"resource_url": "https://cam.example.com/snap.jpg", "lat": 38.57, "lon": -109.55, "prefix": "moab"}"#,
        )
        .unwrap();

        assert_eq!(config.frequency_minutes, 1);
        assert!(config.overlay_weather);
        assert!(config.overlay_time);
        assert!(!config.overlay_title);
        assert_eq!(config.title_text(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_source_kind_by_scheme() {
        let http = LocationConfig::new("http://10.0.0.2/image.jpg", 0.0, 0.0, "cam1");
        let rtsp = LocationConfig::new("rtsp://10.0.0.3:554/stream1", 0.0, 0.0, "cam2");
        let ftp = LocationConfig::new("ftp://10.0.0.4/image.jpg", 0.0, 0.0, "cam3");

        assert_eq!(http.source_kind().unwrap(), SourceKind::Http);
        assert_eq!(rtsp.source_kind().unwrap(), SourceKind::Rtsp);
        assert!(ftp.source_kind().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        let base = LocationConfig::new("https://cam.example.com/a.jpg", 38.5, -109.5, "moab");

        assert!(base.clone().with_frequency(0).validate().is_err());
        assert!(LocationConfig { prefix: "Moab_Cam".into(), ..base.clone() }.validate().is_err());
        assert!(LocationConfig { lat: 91.0, ..base.clone() }.validate().is_err());
        assert!(base.clone().with_overlays(true, true, true).validate().is_err());
        assert!(base.clone().with_title("Moab, UT").validate().is_ok());
    }

    #[test]
    fn test_irregular_frequency_is_accepted() {
        let config = LocationConfig::new("https://cam.example.com/a.jpg", 0.0, 0.0, "moab").with_frequency(7);
        assert!(config.validate().is_ok());
    }
}
