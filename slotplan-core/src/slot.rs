//! Weekly-recurring availability and immovable blockers.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::time::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotType {
    WorkingHours,
    Break,
}

impl SlotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotType::WorkingHours => "working-hours",
            SlotType::Break => "break",
        }
    }
}

/// Which local days a slot applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frequency")]
pub enum Recurrence {
    Daily,
    /// Only the listed weekdays. An empty list never matches.
    Custom {
        #[serde(default)]
        specific_days: Vec<Weekday>,
    },
}

impl Recurrence {
    pub fn custom(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut specific_days: Vec<Weekday> = Vec::new();
        for d in days {
            if !specific_days.contains(&d) {
                specific_days.push(d);
            }
        }
        Recurrence::Custom { specific_days }
    }

    pub fn matches(&self, day: Weekday) -> bool {
        match self {
            Recurrence::Daily => true,
            Recurrence::Custom { specific_days } => specific_days.contains(&day),
        }
    }

    /// Fraction of a week this recurrence is active, as used to size the
    /// span normalization bound.
    ///
    /// An empty `Custom` list counts as every day here even though it never
    /// matches a day, so a slot without days cannot shrink the bound to zero.
    pub fn weekly_share(&self) -> f64 {
        match self {
            Recurrence::Daily => 1.0,
            Recurrence::Custom { specific_days } if specific_days.is_empty() => 1.0,
            Recurrence::Custom { specific_days } => specific_days.len() as f64 / 7.0,
        }
    }
}

/// A recurring availability window, in local wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub slot_type: SlotType,
    /// Minutes since local midnight (0-1439).
    pub start_minutes: i64,
    /// Minutes.
    pub duration: i64,
    pub recurrence: Recurrence,
}

impl AvailabilitySlot {
    pub fn working_hours(start_minutes: i64, duration: i64, recurrence: Recurrence) -> Self {
        Self {
            slot_type: SlotType::WorkingHours,
            start_minutes,
            duration,
            recurrence,
        }
    }

    pub fn break_slot(start_minutes: i64, duration: i64, recurrence: Recurrence) -> Self {
        Self {
            slot_type: SlotType::Break,
            start_minutes,
            duration,
            recurrence,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlots {
    #[serde(default)]
    pub working_hours: Vec<AvailabilitySlot>,
    #[serde(default)]
    pub breaks: Vec<AvailabilitySlot>,
}

impl TimeSlots {
    /// Average working minutes per day across a week.
    pub fn daily_working_minutes(&self) -> f64 {
        self.working_hours
            .iter()
            .map(|s| s.duration as f64 * s.recurrence.weekly_share())
            .sum()
    }
}

/// Time already committed elsewhere (a previously saved placement).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingBlock {
    pub start_time: Millis,
    pub end_time: Millis,
    pub task_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_recurrence_matches_listed_days_only() {
        let r = Recurrence::custom([Weekday::Mon, Weekday::Wed, Weekday::Mon]);
        assert!(r.matches(Weekday::Mon));
        assert!(r.matches(Weekday::Wed));
        assert!(!r.matches(Weekday::Sun));
        assert!((r.weekly_share() - 2.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_custom_never_matches() {
        let r = Recurrence::Custom {
            specific_days: vec![],
        };
        assert!(!r.matches(Weekday::Fri));
        assert_eq!(r.weekly_share(), 1.0);
    }

    #[test]
    fn test_recurrence_json_shape() {
        let daily: Recurrence = serde_json::from_str(r#"{"frequency":"Daily"}"#).unwrap();
        assert_eq!(daily, Recurrence::Daily);

        let custom: Recurrence =
            serde_json::from_str(r#"{"frequency":"Custom","specific_days":["Monday","Friday"]}"#)
                .unwrap();
        assert!(custom.matches(Weekday::Fri));
        assert!(!custom.matches(Weekday::Tue));
    }

    #[test]
    fn test_daily_working_minutes() {
        let slots = TimeSlots {
            working_hours: vec![
                AvailabilitySlot::working_hours(9 * 60, 480, Recurrence::Daily),
                AvailabilitySlot::working_hours(
                    19 * 60,
                    70,
                    Recurrence::custom([Weekday::Sat]),
                ),
            ],
            breaks: vec![],
        };
        assert!((slots.daily_working_minutes() - 490.0).abs() < 1e-9);
    }
}
