use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A task row as the application stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTask {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Minutes.
    pub estimated_time: i64,
    #[serde(default)]
    pub deadline: Option<RawDeadline>,
    /// "Low", "Medium", "High" or "Critical". Missing means Medium.
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub is_habit: bool,
    /// Previously saved placement, in nanoseconds.
    #[serde(default)]
    pub time_slots: Vec<RawPlacedSlot>,
}

/// Epoch milliseconds or an RFC 3339 timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDeadline {
    Millis(i64),
    Text(String),
}

/// Nanosecond timestamps may arrive as JSON numbers or as strings
/// (64-bit integers do not survive every JSON encoder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNanos {
    Number(i64),
    Text(String),
}

impl RawNanos {
    pub fn as_nanos(&self) -> Option<i64> {
        match self {
            RawNanos::Number(n) => Some(*n),
            RawNanos::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPlacedSlot {
    pub start_time: RawNanos,
    pub end_time: RawNanos,
}

/// An availability row. Numeric fields are kept loose so that bad rows can
/// be skipped instead of failing the whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTimeSlot {
    pub slot_type: String,
    #[serde(default)]
    pub start_minutes: Option<Value>,
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default)]
    pub recurrence: Option<RawRecurrence>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecurrence {
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default, alias = "specificDays")]
    pub specific_days: Option<Vec<String>>,
}

/// Integral JSON number, accepting `540.0` but not `540.5` or `"540"`.
pub(crate) fn integral(v: Option<&Value>) -> Option<i64> {
    let v = v?;
    if let Some(i) = v.as_i64() {
        return Some(i);
    }
    let f = v.as_f64()?;
    (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}
