//! Interval geometry: recurring-slot expansion and interval subtraction.
//!
//! All intervals are half-open `[start, end)` in absolute milliseconds.

use chrono::{Datelike, Days};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::slot::AvailabilitySlot;
use crate::time::{local_date, local_instant, minutes_to_millis, Millis, MILLIS_PER_DAY, MILLIS_PER_MINUTE};

/// Pieces shorter than this are not worth scheduling into.
pub const MIN_SCHEDULABLE_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: Millis,
    pub end: Millis,
}

impl Interval {
    pub fn new(start: Millis, end: Millis) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn len_ms(&self) -> Millis {
        self.end - self.start
    }

    #[inline]
    pub fn len_minutes(&self) -> i64 {
        self.len_ms().div_euclid(MILLIS_PER_MINUTE)
    }

    #[inline]
    pub fn contains(&self, ts: Millis) -> bool {
        ts >= self.start && ts < self.end
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Materialize recurring slots onto every local day touching
/// `[search_start, search_end]`, clipped to that range.
///
/// Output is grouped by slot, not sorted.
pub fn expand_recurring(
    slots: &[AvailabilitySlot],
    search_start: Millis,
    search_end: Millis,
    tz: Tz,
) -> Vec<Interval> {
    let mut out = Vec::new();
    if slots.is_empty() || search_end <= search_start {
        return out;
    }

    let first_day = local_date(search_start, tz);
    let days = (search_end - search_start + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;

    for slot in slots {
        for offset in 0..=days {
            let Some(date) = first_day.checked_add_days(Days::new(offset as u64)) else {
                break;
            };
            if !slot.recurrence.matches(date.weekday()) {
                continue;
            }
            let Some(start) = local_instant(date, slot.start_minutes, tz) else {
                continue;
            };
            let end = start + minutes_to_millis(slot.duration);
            if end > search_start && start < search_end {
                let clipped = Interval::new(start.max(search_start), end.min(search_end));
                if clipped.len_ms() > 0 {
                    out.push(clipped);
                }
            }
        }
    }
    out
}

/// Remove every blocker from `base`, one blocker at a time.
///
/// Blockers need not be merged or sorted. Remainders shorter than
/// [`MIN_SCHEDULABLE_MINUTES`] are discarded. The result is not sorted.
pub fn subtract_intervals(base: &[Interval], blockers: &[Interval]) -> Vec<Interval> {
    subtract_intervals_with_min(base, blockers, MIN_SCHEDULABLE_MINUTES)
}

pub fn subtract_intervals_with_min(
    base: &[Interval],
    blockers: &[Interval],
    min_minutes: i64,
) -> Vec<Interval> {
    let mut result: Vec<Interval> = base.to_vec();

    for blocker in blockers {
        if blocker.start >= blocker.end {
            continue;
        }
        let mut next = Vec::with_capacity(result.len() + 1);
        for slot in result {
            if !slot.overlaps(blocker) {
                next.push(slot);
                continue;
            }
            if slot.start < blocker.start {
                next.push(Interval::new(slot.start, blocker.start));
            }
            if slot.end > blocker.end {
                next.push(Interval::new(blocker.end, slot.end));
            }
        }
        result = next;
    }

    let min_len = minutes_to_millis(min_minutes);
    result.retain(|i| i.len_ms() >= min_len);
    result
}

pub fn sort_by_start(intervals: &mut [Interval]) {
    intervals.sort_by_key(|i| (i.start, i.end));
}

pub fn total_length_ms(intervals: &[Interval]) -> Millis {
    intervals.iter().map(Interval::len_ms).sum()
}
