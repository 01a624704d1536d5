//! Sequential placement: walk a cursor forward through working time.
//!
//! Used wherever tasks are re-placed in a fixed order (tabu moves and the
//! repair pass). The greedy constructor uses interval subtraction instead.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::config::{PriorityWeights, SchedulerConfig};
use crate::geometry::{expand_recurring, sort_by_start, Interval};
use crate::slot::{ExistingBlock, TimeSlots};
use crate::task::Segment;
use crate::time::{minutes_between, minutes_to_millis, round_up_to_minutes, Millis, MILLIS_PER_DAY};

/// Working and break intervals expanded once for a window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandedSlots {
    /// Sorted by start.
    pub working: Vec<Interval>,
    /// Sorted by start.
    pub breaks: Vec<Interval>,
}

impl ExpandedSlots {
    pub fn expand(slots: &TimeSlots, start: Millis, end: Millis, tz: Tz) -> Self {
        let mut working = expand_recurring(&slots.working_hours, start, end, tz);
        let mut breaks = expand_recurring(&slots.breaks, start, end, tz);
        sort_by_start(&mut working);
        sort_by_start(&mut breaks);
        Self { working, breaks }
    }
}

pub fn existing_intervals(existing: &[ExistingBlock]) -> Vec<Interval> {
    existing
        .iter()
        .map(|b| Interval::new(b.start_time, b.end_time))
        .filter(|i| i.len_ms() > 0)
        .collect()
}

/// Everything placement needs that stays fixed for one optimization call.
#[derive(Debug, Clone)]
pub struct PlanContext {
    pub tz: Tz,
    pub now: Millis,
    /// `now` rounded up, plus the configured buffer.
    pub start: Millis,
    pub round_to_minutes: i64,
    pub priority_weights: PriorityWeights,
    /// Expanded over `[now, now + reschedule_horizon_days]`.
    pub expanded: ExpandedSlots,
    /// Immovable time taken by the existing schedule (empty when those tasks
    /// are being re-planned).
    pub existing: Vec<Interval>,
}

impl PlanContext {
    pub fn new(
        time_slots: &TimeSlots,
        existing: &[ExistingBlock],
        include_scheduled_tasks: bool,
        config: &SchedulerConfig,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> Self {
        let now = now.timestamp_millis();
        let start = round_up_to_minutes(now, config.round_to_minutes)
            + minutes_to_millis(config.buffer_minutes);
        let window_end = now + i64::from(config.reschedule_horizon_days) * MILLIS_PER_DAY;
        let existing = if include_scheduled_tasks {
            Vec::new()
        } else {
            existing_intervals(existing)
        };

        Self {
            tz,
            now,
            start,
            round_to_minutes: config.round_to_minutes,
            priority_weights: config.priority_weights,
            expanded: ExpandedSlots::expand(time_slots, now, window_end, tz),
            existing,
        }
    }

    /// A placer over the cached working time, blocked by breaks, the
    /// existing schedule and `extra`.
    pub fn placer(&self, extra: impl IntoIterator<Item = Interval>) -> SequentialPlacer<'_> {
        let mut blockers: Vec<Interval> = self.expanded.breaks.clone();
        blockers.extend(self.existing.iter().copied());
        blockers.extend(extra);
        SequentialPlacer::new(&self.expanded.working, blockers)
    }
}

/// Result of placing one task.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub segments: Vec<Segment>,
    /// Minutes that did not fit.
    pub remaining: i64,
}

/// Places durations into sorted working intervals, skipping blockers.
#[derive(Debug, Clone)]
pub struct SequentialPlacer<'a> {
    working: &'a [Interval],
    blockers: Vec<Interval>,
}

impl<'a> SequentialPlacer<'a> {
    /// `working` must be sorted by start; blockers are sorted here.
    pub fn new(working: &'a [Interval], mut blockers: Vec<Interval>) -> Self {
        sort_by_start(&mut blockers);
        Self { working, blockers }
    }

    /// Place `duration` minutes at or after `from`.
    ///
    /// Segments end at the next blocker or at the end of the working
    /// interval; placement stops early (partial) when working time runs out.
    pub fn place(&self, duration: i64, from: Millis) -> Placement {
        let mut remaining = duration;
        let mut segments = Vec::new();
        let mut cursor = from;

        while remaining > 0 {
            if let Some(block) = self.blocker_at(cursor) {
                cursor = block.end;
                continue;
            }

            let Some(slot) = self.working_at_or_after(cursor) else {
                break;
            };
            if cursor < slot.start {
                // Re-check blockers at the new position.
                cursor = slot.start;
                continue;
            }

            let cut = self.next_blocker_start(cursor, slot.end).unwrap_or(slot.end);
            let available = minutes_between(cursor, cut);
            if available <= 0 {
                cursor = cut;
                continue;
            }

            let take = remaining.min(available);
            let segment = Segment::new(cursor, take);
            cursor = segment.end;
            remaining -= take;
            segments.push(segment);
        }

        Placement { segments, remaining }
    }

    fn blocker_at(&self, ts: Millis) -> Option<&Interval> {
        let upto = self.blockers.partition_point(|b| b.start <= ts);
        self.blockers[..upto].iter().find(|b| b.end > ts)
    }

    fn next_blocker_start(&self, after: Millis, before: Millis) -> Option<Millis> {
        let idx = self.blockers.partition_point(|b| b.start <= after);
        self.blockers
            .get(idx)
            .map(|b| b.start)
            .filter(|&s| s < before)
    }

    fn working_at_or_after(&self, ts: Millis) -> Option<&Interval> {
        self.working
            .iter()
            .find(|w| w.contains(ts))
            .or_else(|| self.working.iter().find(|w| w.start > ts))
    }
}
