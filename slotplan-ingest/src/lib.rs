//! slotplan-ingest: turn stored task and availability rows into an optimizer scenario.

pub mod types;

pub use types::{RawDeadline, RawNanos, RawPlacedSlot, RawRecurrence, RawTask, RawTimeSlot};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc, Weekday};
use slotplan_core::time::MINUTES_PER_DAY;
use slotplan_core::{
    AvailabilitySlot, ExistingBlock, Priority, Recurrence, Scenario, SlotType, Task, TimeSlots,
};
use tracing::{debug, warn};

use crate::types::integral;

const NANOS_PER_MILLI: i64 = 1_000_000;

/// Build a scenario from raw rows.
///
/// Returns `Ok(None)` when there is nothing to schedule: no tasks, or no
/// usable working-hours slot.
pub fn build_scenario(
    tasks: &[RawTask],
    slots: &[RawTimeSlot],
    include_scheduled_tasks: bool,
) -> Result<Option<Scenario>> {
    let core_tasks = tasks
        .iter()
        .map(convert_task)
        .collect::<Result<Vec<_>>>()?;

    let existing_schedule = if include_scheduled_tasks {
        Vec::new()
    } else {
        existing_blocks(tasks)
    };

    let time_slots = convert_slots(slots);
    if core_tasks.is_empty() || time_slots.working_hours.is_empty() {
        debug!(
            tasks = core_tasks.len(),
            working_hours = time_slots.working_hours.len(),
            "nothing to schedule"
        );
        return Ok(None);
    }

    Ok(Some(Scenario {
        tasks: core_tasks,
        time_slots,
        existing_schedule,
    }))
}

pub fn parse_priority(s: &str) -> Result<Priority> {
    match s.trim().to_ascii_lowercase().as_str() {
        "low" => Ok(Priority::Low),
        "medium" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        "critical" => Ok(Priority::Critical),
        other => bail!("unknown priority '{other}' (expected Low, Medium, High or Critical)"),
    }
}

pub fn parse_deadline(raw: &RawDeadline) -> Result<DateTime<Utc>> {
    match raw {
        RawDeadline::Millis(ms) => Utc
            .timestamp_millis_opt(*ms)
            .single()
            .ok_or_else(|| anyhow!("deadline {ms} ms is out of range")),
        RawDeadline::Text(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|d| d.with_timezone(&Utc))
            .with_context(|| format!("invalid deadline '{s}'")),
    }
}

fn convert_task(raw: &RawTask) -> Result<Task> {
    if raw.estimated_time <= 0 {
        bail!(
            "task '{}' has estimated_time {} (must be > 0 minutes)",
            raw.id,
            raw.estimated_time
        );
    }
    let priority = match raw.priority.as_deref() {
        Some(p) => parse_priority(p).with_context(|| format!("task '{}'", raw.id))?,
        None => Priority::Medium,
    };

    let mut task = Task::new(raw.id.clone(), raw.title.clone())
        .with_duration(raw.estimated_time)
        .with_priority(priority);
    if let Some(d) = &raw.deadline {
        task = task.with_deadline(parse_deadline(d).with_context(|| format!("task '{}'", raw.id))?);
    }
    if raw.is_habit {
        task = task.habit();
    }
    Ok(task)
}

/// Saved placements of every task, converted from nanoseconds.
pub fn existing_blocks(tasks: &[RawTask]) -> Vec<ExistingBlock> {
    let mut out = Vec::new();
    for task in tasks {
        for slot in &task.time_slots {
            let (Some(start), Some(end)) = (slot.start_time.as_nanos(), slot.end_time.as_nanos())
            else {
                warn!(task_id = %task.id, "skipping saved slot with unreadable timestamps");
                continue;
            };
            out.push(ExistingBlock {
                start_time: start.div_euclid(NANOS_PER_MILLI),
                end_time: end.div_euclid(NANOS_PER_MILLI),
                task_id: task.id.clone(),
            });
        }
    }
    out
}

/// Keep the usable rows, split by type.
pub fn convert_slots(slots: &[RawTimeSlot]) -> TimeSlots {
    let mut out = TimeSlots::default();
    for (index, raw) in slots.iter().enumerate() {
        let slot_type = match raw.slot_type.as_str() {
            "WorkingHours" => SlotType::WorkingHours,
            "Break" => SlotType::Break,
            other => {
                debug!(index, slot_type = other, "skipping slot of unknown type");
                continue;
            }
        };
        let start = integral(raw.start_minutes.as_ref());
        let duration = integral(raw.duration.as_ref());
        let (Some(start), Some(duration)) = (start, duration) else {
            debug!(index, "skipping slot without numeric start_minutes/duration");
            continue;
        };
        if duration <= 0 || !(0..MINUTES_PER_DAY).contains(&start) {
            debug!(index, start, duration, "skipping slot outside the day");
            continue;
        }

        let slot = AvailabilitySlot {
            slot_type,
            start_minutes: start,
            duration,
            recurrence: convert_recurrence(raw.recurrence.as_ref()),
        };
        match slot_type {
            SlotType::WorkingHours => out.working_hours.push(slot),
            SlotType::Break => out.breaks.push(slot),
        }
    }
    out
}

/// Missing recurrence or `Daily` means every day. Anything else needs an
/// explicit day list; without one the slot never applies.
pub fn convert_recurrence(raw: Option<&RawRecurrence>) -> Recurrence {
    let Some(raw) = raw else {
        return Recurrence::Daily;
    };
    let daily = raw
        .frequency
        .as_deref()
        .is_some_and(|f| f.eq_ignore_ascii_case("daily"));
    if daily {
        return Recurrence::Daily;
    }

    let days = raw.specific_days.as_deref().unwrap_or_default();
    Recurrence::custom(days.iter().filter_map(|d| match d.parse::<Weekday>() {
        Ok(day) => Some(day),
        Err(_) => {
            warn!(day = %d, "ignoring unknown weekday");
            None
        }
    }))
}
