//! Time utilities: millisecond arithmetic, rounding and timezone-aware local days.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Result, SchedulerError};

/// Absolute instant in milliseconds since the Unix epoch.
pub type Millis = i64;

pub const MILLIS_PER_MINUTE: Millis = 60 * 1000;
pub const MILLIS_PER_DAY: Millis = 24 * 60 * MILLIS_PER_MINUTE;
pub const MINUTES_PER_DAY: i64 = 24 * 60;
/// Longest task or slot duration accepted (ten years), keeping every
/// millisecond sum far from `i64` overflow.
pub const MAX_DURATION_MINUTES: i64 = 10 * 366 * MINUTES_PER_DAY;

pub fn minutes_to_millis(minutes: i64) -> Millis {
    minutes * MILLIS_PER_MINUTE
}

/// Whole minutes between two instants (floored).
pub fn minutes_between(start: Millis, end: Millis) -> i64 {
    (end - start).div_euclid(MILLIS_PER_MINUTE)
}

/// Round `ts` up to the next multiple of `unit_minutes`.
pub fn round_up_to_minutes(ts: Millis, unit_minutes: i64) -> Millis {
    let unit = minutes_to_millis(unit_minutes.max(1));
    let rem = ts.rem_euclid(unit);
    if rem == 0 { ts } else { ts - rem + unit }
}

pub fn parse_timezone(tz: &str) -> Result<Tz> {
    tz.parse()
        .map_err(|_| SchedulerError::InvalidTimezone(tz.to_string()))
}

/// Local calendar date that contains `ts`.
pub fn local_date(ts: Millis, tz: Tz) -> NaiveDate {
    to_utc(ts).with_timezone(&tz).date_naive()
}

/// Instant of `minutes` past local midnight on `date`.
///
/// `None` when that wall-clock time does not exist (DST gap). Ambiguous
/// times resolve to the earlier instant.
pub fn local_instant(date: NaiveDate, minutes: i64, tz: Tz) -> Option<Millis> {
    let naive = date.and_time(NaiveTime::default()) + Duration::minutes(minutes);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

/// Local midnight at the start of `date`, falling forward an hour if midnight
/// itself is skipped by a DST transition.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> Millis {
    local_instant(date, 0, tz)
        .or_else(|| local_instant(date, 60, tz))
        .unwrap_or_else(|| date.and_time(NaiveTime::default()).and_utc().timestamp_millis())
}

pub fn to_utc(ts: Millis) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ts).unwrap_or_default()
}

/// Parse a wall-clock time like "2025-05-01 08:30" in `tz`, returning UTC.
pub fn parse_local_datetime(local: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let ndt = NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M").ok()?;
    tz.from_local_datetime(&ndt)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
