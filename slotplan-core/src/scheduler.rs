//! Library entry point: construct, search, validate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{OptimizeOptions, SchedulerConfig};
use crate::constructor::{build_initial_schedule, reschedule_all};
use crate::error::Result;
use crate::objective::Evaluator;
use crate::placement::PlanContext;
use crate::schedule::{Scenario, Schedule};
use crate::tabu::{SearchStats, StopReason, TabuSearch};
use crate::validator::find_collision;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub schedule: Schedule,
    /// Full evaluation of `schedule`; `+inf` when nothing could be placed.
    pub objective_value: f64,
    pub stats: SearchStats,
}

/// Optimize `scenario` as of `now`.
///
/// Fails only on malformed input. Nothing to schedule (no tasks, no working
/// hours) yields an empty schedule with an infinite objective.
pub fn optimize(
    scenario: &Scenario,
    options: &OptimizeOptions,
    config: &SchedulerConfig,
    now: DateTime<Utc>,
) -> Result<OptimizationResult> {
    let tz = config.validate()?;
    let (coefficients, limits) = options.resolve(config)?;
    scenario.validate()?;

    let ctx = PlanContext::new(
        &scenario.time_slots,
        &scenario.existing_schedule,
        options.include_scheduled_tasks,
        config,
        tz,
        now,
    );
    let evaluator = Evaluator::new(
        coefficients,
        config.priority_weights,
        config.min_segment_minutes,
    );

    let initial = build_initial_schedule(
        scenario,
        &ctx,
        config,
        options.include_scheduled_tasks,
        now,
    );

    if scenario.tasks.is_empty() || scenario.time_slots.working_hours.is_empty() {
        info!(tasks = scenario.tasks.len(), "nothing to schedule");
        let objective_value = evaluator.evaluate(&initial);
        return Ok(OptimizationResult {
            schedule: initial,
            objective_value,
            stats: SearchStats {
                iterations: 0,
                improvements: 0,
                cache_hits: 0,
                cache_misses: 0,
                stop_reason: StopReason::NothingToSearch,
                best_trace: vec![objective_value],
            },
        });
    }

    let initial = repair_if_invalid(initial, &ctx, "initial");
    let outcome = TabuSearch::new(&ctx, evaluator, limits).run(&initial);
    let schedule = repair_if_invalid(outcome.best, &ctx, "final");
    let objective_value = evaluator.evaluate(&schedule);

    info!(
        tasks = schedule.len(),
        partial = schedule.partial_count(),
        iterations = outcome.stats.iterations,
        improvements = outcome.stats.improvements,
        cache_hits = outcome.stats.cache_hits,
        cache_misses = outcome.stats.cache_misses,
        stop = ?outcome.stats.stop_reason,
        objective = objective_value,
        "optimization finished"
    );

    Ok(OptimizationResult {
        schedule,
        objective_value,
        stats: outcome.stats,
    })
}

fn repair_if_invalid(schedule: Schedule, ctx: &PlanContext, stage: &str) -> Schedule {
    match find_collision(&schedule) {
        None => schedule,
        Some(c) => {
            warn!(
                stage,
                minute = c.minute,
                first = %c.first_task,
                second = %c.second_task,
                "schedule has overlapping segments, rescheduling sequentially"
            );
            reschedule_all(&schedule, ctx)
        }
    }
}
