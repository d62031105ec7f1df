//! 15-minute slot arithmetic.
//!
//! Slots are fixed wall-clock-aligned buckets used both as the polling
//! cadence and the aggregation granularity. All calendar math is UTC.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Slot length in seconds.
pub const SLOT_SECONDS: i64 = 15 * 60;

const DAY_SECONDS: i64 = 24 * 60 * 60;
const WEEK_SECONDS: i64 = 7 * DAY_SECONDS;

/// Start of the slot containing `timestamp` (Unix seconds).
pub fn slot_start(timestamp: i64) -> i64 {
    timestamp.div_euclid(SLOT_SECONDS) * SLOT_SECONDS
}

/// Start of the slot after the one containing `timestamp`.
pub fn next_slot_boundary(timestamp: i64) -> i64 {
    slot_start(timestamp) + SLOT_SECONDS
}

/// Hour of day (0-23, UTC).
pub fn hour_of_day(timestamp: i64) -> u32 {
    datetime(timestamp).hour()
}

/// 15-minute sub-slot within the hour (0-3).
pub fn sub_slot(timestamp: i64) -> u32 {
    datetime(timestamp).minute() / 15
}

/// Day of week with Sunday = 0 (UTC).
pub fn day_of_week(timestamp: i64) -> u32 {
    datetime(timestamp).weekday().num_days_from_sunday()
}

/// Calendar date as `YYYY-MM-DD` (UTC).
pub fn date_string(timestamp: i64) -> String {
    let dt = datetime(timestamp);
    format!("{:04}-{:02}-{:02}", dt.year(), dt.month(), dt.day())
}

/// How many whole weeks the week containing `timestamp` lies before the week
/// containing `reference`, where weeks start on Sunday midnight UTC.
///
/// Used to bucket snapshots into per-week sets for activity-percentage
/// aggregation.
pub fn week_id(timestamp: i64, reference: i64) -> i64 {
    (week_start(reference) - week_start(timestamp)).div_euclid(WEEK_SECONDS)
}

/// Sunday midnight UTC starting the week containing `timestamp`.
pub fn week_start(timestamp: i64) -> i64 {
    let midnight = timestamp.div_euclid(DAY_SECONDS) * DAY_SECONDS;
    midnight - day_of_week(timestamp) as i64 * DAY_SECONDS
}

fn datetime(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp, 0).unwrap_or_default()
}
