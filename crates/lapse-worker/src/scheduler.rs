//! Capture cadence.

use chrono::Timelike;

use lapse_models::PhaseTag;

/// Night frames are only taken on the hour and half hour.
pub const NIGHT_INTERVAL_MINUTES: u32 = 30;

/// Whether a capture should run at `now` (location-local clock).
///
/// Both rules must pass: the night rule (`minute % 30 == 0`) and the
/// frequency rule (`minute % frequency == 0`). They are combined with AND, so
/// a frequency that does not divide 30 thins night captures further; for
/// example frequency 20 at night only fires on the hour.
pub fn should_capture(now: &impl Timelike, phase: PhaseTag, frequency_minutes: u32) -> bool {
    if frequency_minutes == 0 {
        return false;
    }

    let minute = now.minute();

    if phase.is_night() && minute % NIGHT_INTERVAL_MINUTES != 0 {
        return false;
    }

    minute % frequency_minutes == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn at(minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(3, minute, 0).unwrap()
    }

    #[test]
    fn test_night_requires_half_hour() {
        assert!(!should_capture(&at(15), PhaseTag::Night, 15));
        assert!(should_capture(&at(30), PhaseTag::Night, 15));
        assert!(should_capture(&at(0), PhaseTag::Night, 15));
    }

    #[test]
    fn test_day_follows_frequency() {
        assert!(should_capture(&at(20), PhaseTag::Day, 10));
        assert!(!should_capture(&at(25), PhaseTag::Day, 10));
        assert!(should_capture(&at(25), PhaseTag::Sunset, 5));
        assert!(should_capture(&at(7), PhaseTag::Dusk, 1));
    }

    #[test]
    fn test_night_and_frequency_combine_with_and() {
        // 20 does not divide 30: only minute 0 satisfies both rules
        let fired: Vec<u32> = (0..60)
            .filter(|m| should_capture(&at(*m), PhaseTag::Night, 20))
            .collect();
        assert_eq!(fired, vec![0]);

        // 7 does not divide 60 either; daytime slots become irregular
        let fired: Vec<u32> = (0..60)
            .filter(|m| should_capture(&at(*m), PhaseTag::Day, 7))
            .collect();
        assert_eq!(fired, vec![0, 7, 14, 21, 28, 35, 42, 49, 56]);
    }

    #[test]
    fn test_zero_frequency_never_fires() {
        assert!(!should_capture(&at(0), PhaseTag::Day, 0));
    }
}
