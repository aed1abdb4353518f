//! "HH:MM" helpers. Slot times travel as zero-padded strings so that
//! lexicographic order equals chronological order.

use chrono::{NaiveTime, Timelike};

pub const SLOT_MINUTES: u32 = 30;

/// Accepts "HH:MM" or "HH:MM:SS" (the data service returns the latter for `time` columns).
pub fn parse_hhmm(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

pub fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

pub fn normalize_time(raw: &str) -> Option<String> {
    parse_hhmm(raw).map(format_hhmm)
}

pub fn minutes_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

pub fn from_minutes(minutes: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

/// First slot boundary at or after `minutes`.
pub fn next_slot_boundary(minutes: u32) -> u32 {
    minutes.div_ceil(SLOT_MINUTES) * SLOT_MINUTES
}

pub fn is_on_slot_grid(raw: &str) -> bool {
    parse_hhmm(raw)
        .map(|t| t.second() == 0 && t.minute() % SLOT_MINUTES == 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_column_formats() {
        assert_eq!(normalize_time("09:00:00").as_deref(), Some("09:00"));
        assert_eq!(normalize_time(" 7:30 ").as_deref(), Some("07:30"));
        assert_eq!(normalize_time("25:00"), None);
        assert_eq!(normalize_time("nine"), None);
    }

    #[test]
    fn grid_check() {
        assert!(is_on_slot_grid("13:30"));
        assert!(!is_on_slot_grid("13:15"));
        assert!(!is_on_slot_grid(""));
    }

    #[test]
    fn boundaries_round_up() {
        assert_eq!(next_slot_boundary(8 * 60), 8 * 60);
        assert_eq!(next_slot_boundary(8 * 60 + 15), 8 * 60 + 30);
        assert_eq!(next_slot_boundary(8 * 60 + 31), 9 * 60);
    }
}
