//! Errors raised for input the optimizer cannot work with.
//!
//! Everything else (no availability, tasks that do not fit, overlapping
//! results) is recovered locally and never surfaces here.

/// Invalid scenario, options or configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulerError {
    #[error(
        "task '{task_id}' has invalid duration {duration} (must be 1..={max} minutes)",
        max = crate::time::MAX_DURATION_MINUTES
    )]
    InvalidDuration { task_id: String, duration: i64 },

    #[error("duplicate task id: {0}")]
    DuplicateTaskId(String),

    #[error("invalid {slot_type} slot at index {index}: {reason}")]
    InvalidSlot {
        slot_type: &'static str,
        index: usize,
        reason: String,
    },

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
