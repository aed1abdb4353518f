// libs/schedule-cell/src/services/slots.rs
//
// Pure slot generation. No I/O and no clock reads: "now" is an argument so the
// same inputs always yield the same output.

use std::collections::{BTreeSet, HashSet};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::models::{normalize_times, Availability, TimeSlot};
use crate::time::{format_hhmm, from_minutes, SLOT_MINUTES};

/// 0 = Sunday .. 6 = Saturday.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Offerable slots for `date`, ascending by time.
///
/// `booked_times` are the times of non-cancelled appointments of this
/// professional on `date`; `blocked_times` are that day's manually blocked
/// slots. Both accept "HH:MM" or "HH:MM:SS".
pub fn generate_slots(
    date: NaiveDate,
    availability: &Availability,
    booked_times: &BTreeSet<String>,
    blocked_times: &BTreeSet<String>,
    now: NaiveDateTime,
) -> Vec<TimeSlot> {
    if availability.blocked_days.contains(&date) {
        debug!("{} is a blocked day", date);
        return Vec::new();
    }

    let weekday = day_of_week(date);
    let active: Vec<_> = availability
        .schedules
        .iter()
        .filter(|schedule| schedule.works_on(weekday))
        .collect();

    if active.is_empty() {
        return Vec::new();
    }

    let booked = normalize_times(booked_times);
    let blocked = normalize_times(blocked_times);
    // On the current day only slots strictly after the wall clock survive.
    let cutoff = (date == now.date()).then(|| now.time());

    let mut seen: HashSet<String> = HashSet::new();
    let mut slots = Vec::new();

    for schedule in active {
        let mut minute = schedule.start;
        while minute < schedule.end {
            let current = minute;
            minute += SLOT_MINUTES;

            if current >= schedule.lunch_start && current < schedule.lunch_end {
                continue;
            }

            let Some(slot_time) = from_minutes(current) else {
                continue;
            };

            if cutoff.is_some_and(|now_time| slot_time <= now_time) {
                continue;
            }

            let time = format_hhmm(slot_time);

            if booked.contains(&time) || blocked.contains(&time) {
                continue;
            }

            // First schedule claiming a time wins.
            if seen.insert(time.clone()) {
                slots.push(TimeSlot {
                    time,
                    unit_name: schedule.unit_name.clone(),
                    unit_id: schedule.unit_id.clone(),
                });
            }
        }
    }

    slots.sort_by(|a, b| a.time.cmp(&b.time));
    slots
}

/// Dates in `[from, from + days)` with at least one schedule and no day block.
/// Bookings are not consulted, so a returned day may still be fully booked.
pub fn working_days(availability: &Availability, from: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days as i64)
        .map(|offset| from + Duration::days(offset))
        .filter(|date| !availability.blocked_days.contains(date))
        .filter(|date| {
            let weekday = day_of_week(*date);
            availability
                .schedules
                .iter()
                .any(|s| s.works_on(weekday) && s.start < s.end)
        })
        .collect()
}
