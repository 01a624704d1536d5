//! Scheduler configuration and per-call options.
//!
//! `SchedulerConfig` carries the defaults (serde, loadable from TOML);
//! `OptimizeOptions` carries what a single call may override.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::task::Priority;
use crate::time::{parse_timezone, MINUTES_PER_DAY};

/// Ordinal weight per priority level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityWeights {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            low: 1.0,
            medium: 2.0,
            high: 3.0,
            critical: 4.0,
        }
    }
}

impl PriorityWeights {
    pub fn weight(&self, p: Priority) -> f64 {
        match p {
            Priority::Low => self.low,
            Priority::Medium => self.medium,
            Priority::High => self.high,
            Priority::Critical => self.critical,
        }
    }
}

/// Objective weights: fragmentation, priority-delay, span, deadline overrun, gaps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coefficients {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
    pub epsilon: f64,
}

impl Default for Coefficients {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            beta: 0.3,
            gamma: 0.1,
            delta: 0.1,
            epsilon: 0.1,
        }
    }
}

impl Coefficients {
    fn validate(&self) -> Result<()> {
        let all = [
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("gamma", self.gamma),
            ("delta", self.delta),
            ("epsilon", self.epsilon),
        ];
        for (name, v) in all {
            if !v.is_finite() || v < 0.0 {
                return Err(SchedulerError::InvalidConfig(format!(
                    "coefficient {name} must be a finite number >= 0, got {v}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    pub max_iterations: usize,
    pub tabu_tenure: usize,
    pub max_no_improvement: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tabu_tenure: 15,
            max_no_improvement: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// IANA timezone that defines "local midnight" for recurring slots.
    pub timezone: String,
    /// "Now" is rounded up to this many minutes before placing anything.
    pub round_to_minutes: i64,
    /// Extra lead time after the rounded "now".
    pub buffer_minutes: i64,
    /// Sort tasks (habit, deadline, priority) before greedy placement.
    pub use_greedy_sorting: bool,
    /// Upper bound on the constructor's search horizon.
    pub max_horizon_days: u32,
    /// Window used when re-placing tasks during search and repair.
    pub reschedule_horizon_days: u32,
    /// Smallest segment used for the fragmentation bound.
    pub min_segment_minutes: i64,
    pub priority_weights: PriorityWeights,
    pub coefficients: Coefficients,
    pub search: SearchLimits,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            round_to_minutes: 5,
            buffer_minutes: 0,
            use_greedy_sorting: true,
            max_horizon_days: 14,
            reschedule_horizon_days: 30,
            min_segment_minutes: 5,
            priority_weights: PriorityWeights::default(),
            coefficients: Coefficients::default(),
            search: SearchLimits::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn with_timezone(mut self, tz: impl Into<String>) -> Self {
        self.timezone = tz.into();
        self
    }

    pub fn tz(&self) -> Result<Tz> {
        parse_timezone(&self.timezone)
    }

    /// Check every field; returns the parsed timezone on success.
    pub fn validate(&self) -> Result<Tz> {
        let tz = self.tz()?;
        if self.round_to_minutes <= 0 {
            return Err(SchedulerError::InvalidConfig(
                "round_to_minutes must be > 0".to_string(),
            ));
        }
        if self.buffer_minutes < 0 {
            return Err(SchedulerError::InvalidConfig(
                "buffer_minutes must be >= 0".to_string(),
            ));
        }
        if self.max_horizon_days == 0 || self.reschedule_horizon_days == 0 {
            return Err(SchedulerError::InvalidConfig(
                "horizon days must be > 0".to_string(),
            ));
        }
        // Re-placement must cover every day the constructor can reach from
        // the rounded, buffered start, plus an hour for a DST shift.
        let constructor_reach = i64::from(self.max_horizon_days)
            .saturating_mul(MINUTES_PER_DAY)
            .saturating_add(self.buffer_minutes)
            .saturating_add(self.round_to_minutes)
            .saturating_add(60);
        if i64::from(self.reschedule_horizon_days) * MINUTES_PER_DAY < constructor_reach {
            return Err(SchedulerError::InvalidConfig(format!(
                "reschedule_horizon_days ({}) is too short to re-place tasks the constructor \
                 may put up to {} days (plus {} buffer minutes) ahead",
                self.reschedule_horizon_days, self.max_horizon_days, self.buffer_minutes
            )));
        }
        if self.min_segment_minutes <= 0 {
            return Err(SchedulerError::InvalidConfig(
                "min_segment_minutes must be > 0".to_string(),
            ));
        }
        let w = &self.priority_weights;
        if [w.low, w.medium, w.high, w.critical]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(SchedulerError::InvalidConfig(
                "priority weights must be finite and >= 0".to_string(),
            ));
        }
        self.coefficients.validate()?;
        self.search.validate()?;
        Ok(tz)
    }
}

impl SearchLimits {
    fn validate(&self) -> Result<()> {
        if self.tabu_tenure == 0 {
            return Err(SchedulerError::InvalidConfig(
                "tabu_tenure must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-call knobs. Unset values fall back to [`SchedulerConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeOptions {
    /// When true, `existing_schedule` is ignored (those tasks are re-planned);
    /// otherwise it blocks time.
    pub include_scheduled_tasks: bool,
    pub coefficients: Option<Coefficients>,
    pub max_iterations: Option<usize>,
    pub tabu_tenure: Option<usize>,
    pub max_no_improvement: Option<usize>,
}

impl OptimizeOptions {
    /// Effective coefficients and search limits for this call.
    pub fn resolve(&self, config: &SchedulerConfig) -> Result<(Coefficients, SearchLimits)> {
        let coefficients = self.coefficients.unwrap_or(config.coefficients);
        coefficients.validate()?;

        let limits = SearchLimits {
            max_iterations: self.max_iterations.unwrap_or(config.search.max_iterations),
            tabu_tenure: self.tabu_tenure.unwrap_or(config.search.tabu_tenure),
            max_no_improvement: self
                .max_no_improvement
                .unwrap_or(config.search.max_no_improvement),
        };
        limits.validate()?;
        Ok((coefficients, limits))
    }
}
