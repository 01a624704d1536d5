//! Task model: what needs time, and where it ended up.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::{minutes_to_millis, Millis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// One contiguous placed interval of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Millis,
    pub end: Millis,
    /// Minutes; `end - start` in milliseconds.
    pub duration: i64,
}

impl Segment {
    pub fn new(start: Millis, duration_minutes: i64) -> Self {
        Self {
            start,
            end: start + minutes_to_millis(duration_minutes),
            duration: duration_minutes,
        }
    }
}

/// A task to place.
///
/// `segments`, `scheduled_start_time`, `scheduled_end_time` and `is_partial`
/// are computed by the scheduler and overwritten every time the task is
/// placed again; input values for them are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,

    /// Minutes.
    pub duration: i64,

    /// Optional hard deadline (UTC). `None` means unconstrained.
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,

    pub priority: Priority,

    /// Habits are placed before everything else.
    #[serde(default)]
    pub is_habit: bool,

    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub scheduled_start_time: Option<Millis>,
    #[serde(default)]
    pub scheduled_end_time: Option<Millis>,
    #[serde(default)]
    pub is_partial: bool,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            duration: 30,
            deadline: None,
            priority: Priority::Medium,
            is_habit: false,
            segments: Vec::new(),
            scheduled_start_time: None,
            scheduled_end_time: None,
            is_partial: false,
        }
    }

    pub fn with_duration(mut self, minutes: i64) -> Self {
        self.duration = minutes;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn habit(mut self) -> Self {
        self.is_habit = true;
        self
    }

    pub fn deadline_ms(&self) -> Option<Millis> {
        self.deadline.map(|d| d.timestamp_millis())
    }

    /// Minutes actually placed.
    pub fn placed_minutes(&self) -> i64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Replace the placement and refresh the derived fields.
    pub fn set_segments(&mut self, mut segments: Vec<Segment>) {
        segments.sort_by_key(|s| s.start);
        self.is_partial = segments.iter().map(|s| s.duration).sum::<i64>() < self.duration;
        self.segments = segments;
        self.update_times();
    }

    /// Recompute `scheduled_start_time` / `scheduled_end_time` from segments.
    pub fn update_times(&mut self) {
        self.scheduled_start_time = self.segments.iter().map(|s| s.start).min();
        self.scheduled_end_time = self.segments.iter().map(|s| s.end).max();
    }

    /// Drop any previous placement.
    pub fn clear_placement(&mut self) {
        self.segments.clear();
        self.scheduled_start_time = None;
        self.scheduled_end_time = None;
        self.is_partial = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_segments_sorts_and_derives_times() {
        let mut t = Task::new("t1", "write report").with_duration(90);
        t.set_segments(vec![Segment::new(10 * 60_000, 30), Segment::new(0, 60)]);

        assert_eq!(t.segments[0].start, 0);
        assert_eq!(t.scheduled_start_time, Some(0));
        assert_eq!(t.scheduled_end_time, Some(40 * 60_000));
        assert_eq!(t.placed_minutes(), 90);
        assert!(!t.is_partial);
    }

    #[test]
    fn test_short_placement_is_partial() {
        let mut t = Task::new("t1", "big").with_duration(120);
        t.set_segments(vec![Segment::new(0, 45)]);
        assert!(t.is_partial);

        t.set_segments(Vec::new());
        assert!(t.is_partial);
        assert_eq!(t.scheduled_start_time, None);
    }

    #[test]
    fn test_task_deserializes_without_computed_fields() {
        let json = r#"{"id":"a","title":"A","duration":60,"priority":"High"}"#;
        let t: Task = serde_json::from_str(json).unwrap();
        assert_eq!(t.priority, Priority::High);
        assert!(t.segments.is_empty());
        assert!(t.deadline.is_none());
        assert!(!t.is_habit);
    }
}
