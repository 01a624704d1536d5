//! Final correctness check: no minute may be claimed by two segments.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::schedule::Schedule;
use crate::time::{Millis, MILLIS_PER_MINUTE};

/// First minute found claimed twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collision {
    /// Minutes since the Unix epoch.
    pub minute: i64,
    pub first_task: String,
    pub second_task: String,
}

impl Collision {
    pub fn at(&self) -> Millis {
        self.minute * MILLIS_PER_MINUTE
    }
}

/// Walk every segment minute by minute in task order.
///
/// A task whose own segments overlap also counts as a collision.
pub fn find_collision(schedule: &Schedule) -> Option<Collision> {
    let mut claimed: HashMap<i64, &str> = HashMap::new();
    for task in &schedule.tasks {
        for segment in &task.segments {
            let mut t = segment.start;
            while t < segment.end {
                let minute = t.div_euclid(MILLIS_PER_MINUTE);
                if let Some(owner) = claimed.insert(minute, task.id.as_str()) {
                    return Some(Collision {
                        minute,
                        first_task: owner.to_string(),
                        second_task: task.id.clone(),
                    });
                }
                t += MILLIS_PER_MINUTE;
            }
        }
    }
    None
}

pub fn is_valid(schedule: &Schedule) -> bool {
    find_collision(schedule).is_none()
}
