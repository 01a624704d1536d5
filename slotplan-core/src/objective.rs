//! Multi-criteria objective (lower is better).
//!
//! Five penalty terms, each divided by an upper bound derived from the task
//! set so they land on comparable scales:
//!
//! | term             | raw value (minutes or counts)                          |
//! |------------------|--------------------------------------------------------|
//! | fragmentation    | Σ max(0, segments − 1)                                 |
//! | priority delay   | Σ weight × max(0, completion − duration)               |
//! | time span        | latest end − earliest start                            |
//! | deadline overrun | Σ max(0, end − deadline)                               |
//! | gaps             | Σ idle minutes between a task's own segments           |
//!
//! `score = 10 · (α·frag + β·prio + γ·span + δ·overrun + ε·gaps)`.
//! A schedule with no placed segment scores `+∞`.

use serde::{Deserialize, Serialize};

use crate::config::{Coefficients, PriorityWeights};
use crate::schedule::Schedule;
use crate::task::Task;
use crate::time::{minutes_between, Millis, MINUTES_PER_DAY};

const SCALE: f64 = 10.0;

/// Per-term upper bounds. Each is at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationFactors {
    pub fragmentation: f64,
    pub priority_time: f64,
    pub time_span: f64,
    pub deadline: f64,
    pub gaps: f64,
}

impl NormalizationFactors {
    pub fn for_schedule(
        schedule: &Schedule,
        weights: &PriorityWeights,
        min_segment_minutes: i64,
    ) -> Self {
        let tasks = &schedule.tasks;
        let total: i64 = tasks.iter().map(|t| t.duration).sum();
        let min_seg = min_segment_minutes.max(1);

        let fragmentation: i64 = tasks
            .iter()
            .map(|t| ((t.duration + min_seg - 1) / min_seg - 1).max(0))
            .sum();

        let priority_time: f64 = tasks
            .iter()
            .map(|t| weights.weight(t.priority) * total as f64)
            .sum();

        let daily = schedule.time_slots.daily_working_minutes();
        let time_span = (total as f64 / daily).ceil() * MINUTES_PER_DAY as f64;

        let deadlines: Vec<Millis> = tasks.iter().filter_map(|t| t.deadline_ms()).collect();
        let mut deadline = match (deadlines.iter().min(), deadlines.iter().max()) {
            (Some(lo), Some(hi)) => minutes_between(*lo, *hi) as f64 * tasks.len() as f64,
            _ => 0.0,
        };
        if deadline == 0.0 {
            deadline = 2.0 * total as f64;
        }

        Self {
            fragmentation: or_one(fragmentation as f64),
            priority_time: or_one(priority_time),
            time_span: or_one(time_span),
            deadline: or_one(deadline),
            gaps: or_one(total as f64),
        }
    }
}

fn or_one(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 1.0 }
}

/// Normalized terms (before coefficients) and the weighted total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveBreakdown {
    pub fragmentation: f64,
    pub priority_delay: f64,
    pub time_span: f64,
    pub deadline_overrun: f64,
    pub gaps: f64,
    pub total: f64,
}

pub fn fragmentation(task: &Task) -> i64 {
    (task.segments.len() as i64 - 1).max(0)
}

/// Minutes finished later than if the task had run first, from `anchor`.
pub fn completion_delay(task: &Task, anchor: Millis) -> i64 {
    task.scheduled_end_time
        .map(|end| (minutes_between(anchor, end) - task.duration).max(0))
        .unwrap_or(0)
}

pub fn deadline_overrun(task: &Task) -> i64 {
    match (task.scheduled_end_time, task.deadline_ms()) {
        (Some(end), Some(deadline)) => minutes_between(deadline, end).max(0),
        _ => 0,
    }
}

pub fn internal_gaps(task: &Task) -> i64 {
    task.segments
        .windows(2)
        .map(|w| minutes_between(w[0].end, w[1].start).max(0))
        .sum()
}

pub fn time_span(schedule: &Schedule) -> i64 {
    match (schedule.earliest_start(), schedule.latest_end()) {
        (Some(lo), Some(hi)) => minutes_between(lo, hi),
        _ => 0,
    }
}

/// Scores schedules with fixed weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluator {
    pub coefficients: Coefficients,
    pub priority_weights: PriorityWeights,
    pub min_segment_minutes: i64,
}

impl Evaluator {
    pub fn new(
        coefficients: Coefficients,
        priority_weights: PriorityWeights,
        min_segment_minutes: i64,
    ) -> Self {
        Self {
            coefficients,
            priority_weights,
            min_segment_minutes,
        }
    }

    pub fn factors(&self, schedule: &Schedule) -> NormalizationFactors {
        NormalizationFactors::for_schedule(schedule, &self.priority_weights, self.min_segment_minutes)
    }

    /// Full evaluation, recomputing normalization from `schedule`.
    pub fn evaluate(&self, schedule: &Schedule) -> f64 {
        let factors = self.factors(schedule);
        self.evaluate_with(schedule, &factors)
    }

    pub fn evaluate_with(&self, schedule: &Schedule, factors: &NormalizationFactors) -> f64 {
        self.breakdown(schedule, factors)
            .map(|b| b.total)
            .unwrap_or(f64::INFINITY)
    }

    /// `None` for a schedule that has nothing placed.
    pub fn breakdown(
        &self,
        schedule: &Schedule,
        factors: &NormalizationFactors,
    ) -> Option<ObjectiveBreakdown> {
        let anchor = schedule.earliest_start()?;
        let c = &self.coefficients;

        let mut frag = 0i64;
        let mut prio = 0.0f64;
        let mut overrun = 0i64;
        let mut gaps = 0i64;
        for t in &schedule.tasks {
            frag += fragmentation(t);
            prio += self.priority_weights.weight(t.priority) * completion_delay(t, anchor) as f64;
            overrun += deadline_overrun(t);
            gaps += internal_gaps(t);
        }

        let b = ObjectiveBreakdown {
            fragmentation: frag as f64 / factors.fragmentation,
            priority_delay: prio / factors.priority_time,
            time_span: time_span(schedule) as f64 / factors.time_span,
            deadline_overrun: overrun as f64 / factors.deadline,
            gaps: gaps as f64 / factors.gaps,
            total: 0.0,
        };
        let total = SCALE
            * (c.alpha * b.fragmentation
                + c.beta * b.priority_delay
                + c.gamma * b.time_span
                + c.delta * b.deadline_overrun
                + c.epsilon * b.gaps);
        Some(ObjectiveBreakdown { total, ..b })
    }

    /// Weighted contribution of one task, excluding the span term.
    fn task_contribution(&self, task: &Task, anchor: Millis, factors: &NormalizationFactors) -> f64 {
        let c = &self.coefficients;
        let prio = self.priority_weights.weight(task.priority) * completion_delay(task, anchor) as f64;
        c.alpha * fragmentation(task) as f64 / factors.fragmentation
            + c.beta * prio / factors.priority_time
            + c.delta * deadline_overrun(task) as f64 / factors.deadline
            + c.epsilon * internal_gaps(task) as f64 / factors.gaps
    }

    fn span_contribution(&self, schedule: &Schedule, factors: &NormalizationFactors) -> f64 {
        self.coefficients.gamma * time_span(schedule) as f64 / factors.time_span
    }

    /// Re-score `new` from `old`'s known value, touching only `affected`
    /// tasks plus the global span.
    ///
    /// Priority delay of each side is anchored at that side's own earliest
    /// start, so unaffected tasks are assumed not to move when the anchor
    /// does. Periodic full evaluation bounds the drift.
    pub fn incremental(
        &self,
        old: &Schedule,
        new: &Schedule,
        affected: &[usize],
        current: f64,
        factors: &NormalizationFactors,
    ) -> f64 {
        let Some(new_anchor) = new.earliest_start() else {
            return f64::INFINITY;
        };
        let Some(old_anchor) = old.earliest_start() else {
            return self.evaluate_with(new, factors);
        };

        let mut delta = self.span_contribution(new, factors) - self.span_contribution(old, factors);
        for &idx in affected {
            if let (Some(o), Some(n)) = (old.tasks.get(idx), new.tasks.get(idx)) {
                delta += self.task_contribution(n, new_anchor, factors)
                    - self.task_contribution(o, old_anchor, factors);
            }
        }
        current + SCALE * delta
    }
}
