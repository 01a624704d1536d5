//! Greedy constructor: the initial schedule the search starts from.
//!
//! # Algorithm
//!
//! 1. Order tasks: habits, then tasks with deadlines, then higher priority,
//!    then earlier deadline (stable).
//! 2. Size the horizon: the fewest local days (capped) whose free working
//!    time covers the total duration.
//! 3. For each task, take the free pool minus everything placed so far and
//!    fill the earliest intervals, splitting across intervals as needed.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Days, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::config::{PriorityWeights, SchedulerConfig};
use crate::geometry::{
    expand_recurring, sort_by_start, subtract_intervals, total_length_ms, Interval,
};
use crate::placement::PlanContext;
use crate::schedule::{Scenario, Schedule, ScheduleMetadata};
use crate::slot::TimeSlots;
use crate::task::{Segment, Task};
use crate::time::{local_date, local_midnight, minutes_to_millis, Millis};

/// Placement order used by the constructor.
pub fn placement_order(a: &Task, b: &Task, weights: &PriorityWeights) -> Ordering {
    b.is_habit
        .cmp(&a.is_habit)
        .then_with(|| b.deadline.is_some().cmp(&a.deadline.is_some()))
        .then_with(|| {
            weights
                .weight(b.priority)
                .partial_cmp(&weights.weight(a.priority))
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.deadline.cmp(&b.deadline))
}

pub fn sort_tasks(tasks: &mut [Task], weights: &PriorityWeights) {
    tasks.sort_by(|a, b| placement_order(a, b, weights));
}

/// Working time minus breaks and `blockers` over `[start, end]`, keeping
/// only schedulable pieces, sorted by start.
pub fn available_pool(
    slots: &TimeSlots,
    blockers: &[Interval],
    start: Millis,
    end: Millis,
    tz: Tz,
) -> Vec<Interval> {
    let working = expand_recurring(&slots.working_hours, start, end, tz);
    if working.is_empty() {
        return working;
    }
    let mut blocked = expand_recurring(&slots.breaks, start, end, tz);
    blocked.extend_from_slice(blockers);

    let mut pool = subtract_intervals(&working, &blocked);
    sort_by_start(&mut pool);
    pool
}

/// End of the constructor's search horizon.
///
/// Walks local days from the one containing `start`, accumulating free
/// working time until it covers `total_minutes` or `max_days` are used.
pub fn search_end_time(
    total_minutes: i64,
    slots: &TimeSlots,
    blockers: &[Interval],
    start: Millis,
    tz: Tz,
    max_days: u32,
) -> Millis {
    let needed = minutes_to_millis(total_minutes);
    let first = local_date(start, tz);
    let mut available: Millis = 0;
    let mut end = start;

    for day in 0..u64::from(max_days) {
        if available >= needed {
            break;
        }
        let Some(date) = first.checked_add_days(Days::new(day)) else {
            break;
        };
        let Some(next) = date.checked_add_days(Days::new(1)) else {
            break;
        };
        let day_start = if day == 0 { start } else { local_midnight(date, tz) };
        let day_end = local_midnight(next, tz) - 1;
        if day_end > day_start {
            available += total_length_ms(&available_pool(slots, blockers, day_start, day_end, tz));
        }
        end = end.max(day_end);
    }

    debug!(
        total_minutes,
        available_minutes = available / 60_000,
        horizon_end = %crate::time::to_utc(end),
        "sized constructor horizon"
    );
    end
}

/// Build the initial schedule: every scenario task is present, placed as
/// far as the horizon allows.
pub fn build_initial_schedule(
    scenario: &Scenario,
    ctx: &PlanContext,
    config: &SchedulerConfig,
    include_scheduled_tasks: bool,
    now: DateTime<Utc>,
) -> Schedule {
    let mut tasks: Vec<Task> = scenario.tasks.clone();
    for t in tasks.iter_mut() {
        t.clear_placement();
    }
    if config.use_greedy_sorting {
        sort_tasks(&mut tasks, &config.priority_weights);
    }

    let start = ctx.start;
    let total: i64 = tasks.iter().map(|t| t.duration).sum();
    let end = search_end_time(
        total,
        &scenario.time_slots,
        &ctx.existing,
        start,
        ctx.tz,
        config.max_horizon_days,
    );
    let pool = available_pool(&scenario.time_slots, &ctx.existing, start, end, ctx.tz);

    let mut placed: Vec<Interval> = Vec::new();
    for task in tasks.iter_mut() {
        let mut free = subtract_intervals(&pool, &placed);
        sort_by_start(&mut free);

        let mut remaining = task.duration;
        let mut segments = Vec::new();
        for slot in &free {
            if remaining <= 0 {
                break;
            }
            let minutes = slot.len_minutes();
            if minutes <= 0 {
                continue;
            }
            let take = remaining.min(minutes);
            let segment = Segment::new(slot.start, take);
            placed.push(Interval::new(segment.start, segment.end));
            segments.push(segment);
            remaining -= take;
        }
        task.set_segments(segments);
        if task.is_partial {
            debug!(task_id = %task.id, missing = remaining, "task only partially placed");
        }
    }

    Schedule {
        tasks: tasks.into_iter().map(Arc::new).collect(),
        time_slots: Arc::new(scenario.time_slots.clone()),
        existing_schedule: Arc::new(scenario.existing_schedule.clone()),
        metadata: ScheduleMetadata {
            generated_at: now,
            search_start: start,
            search_end: end,
            include_scheduled_tasks,
        },
    }
}

/// Re-place every task in the current order, ignoring prior placements.
///
/// Used as the repair pass when a schedule fails validation.
pub fn reschedule_all(schedule: &Schedule, ctx: &PlanContext) -> Schedule {
    let mut out = schedule.deep_clone();
    let placer = ctx.placer(std::iter::empty());
    let mut cursor = ctx.start;

    for idx in 0..out.len() {
        let task = out.task_mut(idx);
        let placement = placer.place(task.duration, cursor);
        task.set_segments(placement.segments);
        if let Some(end) = task.scheduled_end_time {
            cursor = end;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::{AvailabilitySlot, Recurrence};
    use crate::task::Priority;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        // Monday 08:31 UTC
        Utc.with_ymd_and_hms(2025, 5, 5, 8, 31, 0).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> Millis {
        Utc.with_ymd_and_hms(2025, 5, d, h, m, 0).unwrap().timestamp_millis()
    }

    fn nine_to_five() -> TimeSlots {
        TimeSlots {
            working_hours: vec![AvailabilitySlot::working_hours(9 * 60, 480, Recurrence::Daily)],
            breaks: vec![],
        }
    }

    fn build(scenario: &Scenario) -> Schedule {
        let cfg = SchedulerConfig::default();
        let ctx = PlanContext::new(
            &scenario.time_slots,
            &scenario.existing_schedule,
            false,
            &cfg,
            chrono_tz::UTC,
            now(),
        );
        build_initial_schedule(scenario, &ctx, &cfg, false, now())
    }

    #[test]
    fn test_sort_order_rules() {
        let dl = now() + Duration::days(2);
        let mut tasks = vec![
            Task::new("plain-low", "").with_priority(Priority::Low),
            Task::new("deadline-late", "").with_deadline(dl + Duration::days(1)),
            Task::new("plain-critical", "").with_priority(Priority::Critical),
            Task::new("deadline-early", "").with_deadline(dl),
            Task::new("habit", "").habit(),
            Task::new("deadline-high", "")
                .with_deadline(dl + Duration::days(5))
                .with_priority(Priority::High),
        ];
        sort_tasks(&mut tasks, &PriorityWeights::default());
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![
            "habit",
            "deadline-high",
            "deadline-early",
            "deadline-late",
            "plain-critical",
            "plain-low",
        ]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let mut tasks = vec![Task::new("x", ""), Task::new("y", ""), Task::new("z", "")];
        sort_tasks(&mut tasks, &PriorityWeights::default());
        assert_eq!(tasks[0].id, "x");
        assert_eq!(tasks[2].id, "z");
    }

    #[test]
    fn test_simple_fit_starts_at_rounded_now() {
        let scenario = Scenario {
            tasks: vec![Task::new("t", "one hour").with_duration(60)],
            time_slots: nine_to_five(),
            existing_schedule: vec![],
        };
        let s = build(&scenario);
        let t = &s.tasks[0];
        assert_eq!(t.segments, vec![Segment::new(at(5, 9, 0), 60)]);
        assert!(!t.is_partial);
    }

    #[test]
    fn test_forced_split_over_days() {
        let scenario = Scenario {
            tasks: vec![Task::new("t", "two hours").with_duration(120)],
            time_slots: TimeSlots {
                working_hours: vec![AvailabilitySlot::working_hours(9 * 60, 90, Recurrence::Daily)],
                breaks: vec![],
            },
            existing_schedule: vec![],
        };
        let s = build(&scenario);
        let t = &s.tasks[0];
        assert_eq!(t.segments, vec![
            Segment::new(at(5, 9, 0), 90),
            Segment::new(at(6, 9, 0), 30),
        ]);
        assert!(!t.is_partial);
    }

    #[test]
    fn test_existing_blocks_and_breaks_are_avoided() {
        let mut slots = nine_to_five();
        slots.breaks.push(AvailabilitySlot::break_slot(10 * 60, 15, Recurrence::Daily));
        let scenario = Scenario {
            tasks: vec![Task::new("t", "").with_duration(90)],
            time_slots: slots,
            existing_schedule: vec![crate::slot::ExistingBlock {
                start_time: at(5, 9, 0),
                end_time: at(5, 9, 30),
                task_id: "old".into(),
            }],
        };
        let s = build(&scenario);
        assert_eq!(s.tasks[0].segments, vec![
            Segment::new(at(5, 9, 30), 30),
            Segment::new(at(5, 10, 15), 60),
        ]);
    }

    #[test]
    fn test_no_working_hours_places_nothing() {
        let scenario = Scenario {
            tasks: vec![Task::new("t", "").with_duration(30)],
            time_slots: TimeSlots::default(),
            existing_schedule: vec![],
        };
        let s = build(&scenario);
        assert_eq!(s.len(), 1);
        assert!(s.tasks[0].segments.is_empty());
        assert!(s.tasks[0].is_partial);
    }

    #[test]
    fn test_horizon_caps_at_max_days() {
        let scenario = Scenario {
            tasks: vec![Task::new("huge", "").with_duration(100 * 60)],
            time_slots: TimeSlots {
                working_hours: vec![AvailabilitySlot::working_hours(9 * 60, 60, Recurrence::Daily)],
                breaks: vec![],
            },
            existing_schedule: vec![],
        };
        let s = build(&scenario);
        let t = &s.tasks[0];
        assert!(t.is_partial);
        assert_eq!(t.segments.len(), 14);
        assert_eq!(t.placed_minutes(), 14 * 60);
    }

    #[test]
    fn test_reschedule_all_places_back_to_back() {
        let scenario = Scenario {
            tasks: vec![
                Task::new("a", "").with_duration(60),
                Task::new("b", "").with_duration(30),
            ],
            time_slots: nine_to_five(),
            existing_schedule: vec![],
        };
        let cfg = SchedulerConfig::default();
        let ctx = PlanContext::new(&scenario.time_slots, &[], false, &cfg, chrono_tz::UTC, now());
        let s = build(&scenario);
        let mut broken = s.clone();
        broken.task_mut(1).set_segments(vec![Segment::new(at(5, 9, 0), 30)]);

        let fixed = reschedule_all(&broken, &ctx);
        assert_eq!(fixed.tasks[0].segments, vec![Segment::new(at(5, 9, 0), 60)]);
        assert_eq!(fixed.tasks[1].segments, vec![Segment::new(at(5, 10, 0), 30)]);
    }
}
