//! Object storage key layout.
//!
//! Keys are date-partitioned "folders" inside the location's bucket:
//!
//! - frames: `{prefix}_{YYYY-MM-DD}/{prefix}_{YYYY-MM-DD}_{HH-MM-SS}_{phase}.png`
//! - video:  `{prefix}_{YYYY-MM-DD}/{prefix}_{YYYY-MM-DD}.mp4`
//! - alias:  `latest.png` at the bucket root
//!
//! Within one date folder, lexical key order is chronological order.

use chrono::{NaiveDate, NaiveDateTime};

use crate::phase::PhaseTag;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Stem of the zero-padded encoder input files.
pub const SEQUENCE_STEM: &str = "image-";

/// Deterministic identity of one captured, annotated frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameKey {
    pub prefix: String,
    /// Capture time on the location's local clock
    pub local_time: NaiveDateTime,
    pub phase: PhaseTag,
    pub extension: String,
}

impl FrameKey {
    pub fn new(
        prefix: impl Into<String>,
        local_time: NaiveDateTime,
        phase: PhaseTag,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            local_time,
            phase,
            extension: extension.into(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.local_time.date()
    }

    /// `{prefix}_{date}`
    pub fn folder(&self) -> String {
        date_folder(&self.prefix, self.date())
    }

    /// `{prefix}_{date}_{time}_{phase}.{ext}`
    pub fn filename(&self) -> String {
        format!(
            "{}_{}_{}.{}",
            self.prefix,
            self.local_time.format(TIMESTAMP_FORMAT),
            self.phase,
            self.extension
        )
    }

    /// Full object key: `{folder}/{filename}`
    pub fn object_key(&self) -> String {
        format!("{}/{}", self.folder(), self.filename())
    }

    /// Parse a listed object key back into a frame key.
    ///
    /// Returns `None` for anything that is not a frame (e.g. the day's video).
    pub fn parse(key: &str) -> Option<Self> {
        let filename = filename_of(key);
        let (stem, extension) = filename.rsplit_once('.')?;
        let (rest, tag) = stem.rsplit_once('_')?;
        let phase = tag.parse::<PhaseTag>().ok()?;

        // rest = {prefix}_{YYYY-MM-DD}_{HH-MM-SS}; the prefix never contains '_'
        let mut parts = rest.rsplitn(3, '_');
        let time = parts.next()?;
        let date = parts.next()?;
        let prefix = parts.next()?;

        let local_time =
            NaiveDateTime::parse_from_str(&format!("{}_{}", date, time), TIMESTAMP_FORMAT).ok()?;

        Some(Self::new(prefix, local_time, phase, extension))
    }
}

/// `{prefix}_{date}`
pub fn date_folder(prefix: &str, date: NaiveDate) -> String {
    format!("{}_{}", prefix, date.format(DATE_FORMAT))
}

/// Listing prefix selecting every object stored for `date`.
pub fn date_list_prefix(prefix: &str, date: NaiveDate) -> String {
    format!("{}/", date_folder(prefix, date))
}

/// Bucket-root alias that always holds the newest frame.
pub fn latest_key(extension: &str) -> String {
    format!("latest.{}", extension)
}

/// `{prefix}_{date}.{ext}`
pub fn video_filename(prefix: &str, date: NaiveDate, extension: &str) -> String {
    format!("{}.{}", date_folder(prefix, date), extension)
}

/// `{prefix}_{date}/{prefix}_{date}.{ext}`
pub fn video_key(prefix: &str, date: NaiveDate, extension: &str) -> String {
    format!(
        "{}/{}",
        date_folder(prefix, date),
        video_filename(prefix, date, extension)
    )
}

/// `image-000.png`, `image-001.png`, ...
pub fn sequence_filename(index: usize, extension: &str) -> String {
    format!("{}{:03}.{}", SEQUENCE_STEM, index, extension)
}

/// FFmpeg input pattern matching [`sequence_filename`].
pub fn sequence_pattern(extension: &str) -> String {
    format!("{}%03d.{}", SEQUENCE_STEM, extension)
}

/// Last path segment of an object key.
pub fn filename_of(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_frame_key_layout() {
        let key = FrameKey::new("moab", at(7, 5, 0), PhaseTag::Sunrise, "png");

        assert_eq!(key.folder(), "moab_2024-06-01");
        assert_eq!(key.filename(), "moab_2024-06-01_07-05-00_sunrise.png");
        assert_eq!(key.object_key(), "moab_2024-06-01/moab_2024-06-01_07-05-00_sunrise.png");
    }

    #[test]
    fn test_parse_round_trip_and_rejects() {
        let key = FrameKey::new("arches-cam", at(21, 15, 30), PhaseTag::Dusk, "png");
        assert_eq!(FrameKey::parse(&key.object_key()), Some(key));

        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(FrameKey::parse(&video_key("moab", date, "mp4")), None);
        assert_eq!(FrameKey::parse("latest.png"), None);
        assert_eq!(FrameKey::parse("moab_2024-06-01/notes.txt"), None);
    }

    #[test]
    fn test_lexical_order_is_chronological() {
        let mut keys: Vec<String> = [at(13, 0, 0), at(6, 59, 59), at(9, 30, 0), at(6, 5, 0)]
            .into_iter()
            .map(|t| FrameKey::new("moab", t, PhaseTag::Day, "png").object_key())
            .collect();
        keys.sort();

        let times: Vec<_> = keys
            .iter()
            .map(|k| FrameKey::parse(k).unwrap().local_time)
            .collect();
        assert_eq!(times, vec![at(6, 5, 0), at(6, 59, 59), at(9, 30, 0), at(13, 0, 0)]);
    }

    #[test]
    fn test_video_and_sequence_names() {
        let date = parse_date("2024-06-01").unwrap();
        assert_eq!(video_filename("moab", date, "mp4"), "moab_2024-06-01.mp4");
        assert_eq!(video_key("moab", date, "mp4"), "moab_2024-06-01/moab_2024-06-01.mp4");
        assert_eq!(date_list_prefix("moab", date), "moab_2024-06-01/");
        assert_eq!(latest_key("png"), "latest.png");
        assert_eq!(sequence_filename(7, "png"), "image-007.png");
        assert_eq!(sequence_filename(1234, "png"), "image-1234.png");
        assert_eq!(sequence_pattern("png"), "image-%03d.png");
    }
}
