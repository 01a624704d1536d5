//! Schedule model and the cloning primitives the search relies on.
//!
//! Tasks live in an index-addressed arena of `Arc`s. Cloning a `Schedule`
//! shares every task; a move then re-allocates only the positions it touches.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::slot::{AvailabilitySlot, ExistingBlock, SlotType, TimeSlots};
use crate::task::Task;
use crate::time::{Millis, MAX_DURATION_MINUTES, MINUTES_PER_DAY};

/// Immutable input of one optimization call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub time_slots: TimeSlots,
    #[serde(default)]
    pub existing_schedule: Vec<ExistingBlock>,
}

impl Scenario {
    /// Reject input shapes the optimizer cannot reason about.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for t in &self.tasks {
            if !(1..=MAX_DURATION_MINUTES).contains(&t.duration) {
                return Err(SchedulerError::InvalidDuration {
                    task_id: t.id.clone(),
                    duration: t.duration,
                });
            }
            if !seen.insert(t.id.as_str()) {
                return Err(SchedulerError::DuplicateTaskId(t.id.clone()));
            }
        }
        validate_slots(&self.time_slots.working_hours, SlotType::WorkingHours)?;
        validate_slots(&self.time_slots.breaks, SlotType::Break)?;
        Ok(())
    }
}

fn validate_slots(slots: &[AvailabilitySlot], expected: SlotType) -> Result<()> {
    for (index, slot) in slots.iter().enumerate() {
        let reason = if slot.slot_type != expected {
            Some(format!("listed as {} but typed {}", expected.as_str(), slot.slot_type.as_str()))
        } else if !(0..MINUTES_PER_DAY).contains(&slot.start_minutes) {
            Some(format!("start_minutes {} outside 0..1439", slot.start_minutes))
        } else if !(1..=MAX_DURATION_MINUTES).contains(&slot.duration) {
            Some(format!("duration {} must be 1..={MAX_DURATION_MINUTES}", slot.duration))
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(SchedulerError::InvalidSlot {
                slot_type: expected.as_str(),
                index,
                reason,
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleMetadata {
    pub generated_at: DateTime<Utc>,
    /// First instant tasks may be placed at (now, rounded, plus buffer).
    pub search_start: Millis,
    /// End of the constructor's search horizon.
    pub search_end: Millis,
    pub include_scheduled_tasks: bool,
}

/// Ordered task list with placements. Order is scheduling priority, not time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub tasks: Vec<Arc<Task>>,
    pub time_slots: Arc<TimeSlots>,
    pub existing_schedule: Arc<Vec<ExistingBlock>>,
    pub metadata: ScheduleMetadata,
}

impl Schedule {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Full structural copy: no task is shared with `self`.
    pub fn deep_clone(&self) -> Self {
        Self {
            tasks: self.tasks.iter().map(|t| Arc::new(Task::clone(t))).collect(),
            time_slots: Arc::clone(&self.time_slots),
            existing_schedule: Arc::clone(&self.existing_schedule),
            metadata: self.metadata.clone(),
        }
    }

    /// Copy the arena but re-allocate only the tasks at `indices`; all other
    /// positions keep pointing at the same tasks as `self`.
    pub fn selective_clone(&self, indices: &[usize]) -> Self {
        let mut out = self.clone();
        for &idx in indices {
            if let Some(slot) = out.tasks.get_mut(idx) {
                *slot = Arc::new(Task::clone(slot));
            }
        }
        out
    }

    /// Mutable access to one task, copying it first if it is shared.
    pub fn task_mut(&mut self, idx: usize) -> &mut Task {
        Arc::make_mut(&mut self.tasks[idx])
    }

    pub fn swap(&mut self, i: usize, j: usize) {
        self.tasks.swap(i, j);
    }

    /// Task ids in scheduling order.
    pub fn order(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().map(|t| &**t).find(|t| t.id == id)
    }

    pub fn earliest_start(&self) -> Option<Millis> {
        self.tasks.iter().filter_map(|t| t.scheduled_start_time).min()
    }

    pub fn latest_end(&self) -> Option<Millis> {
        self.tasks.iter().filter_map(|t| t.scheduled_end_time).max()
    }

    pub fn partial_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_partial).count()
    }
}
