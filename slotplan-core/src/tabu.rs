//! Tabu search over task order.
//!
//! The only move is a swap of two nearby positions. Applying it re-places
//! just the contiguous range between the two positions; the rest of the
//! schedule stays put and blocks time.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::SearchLimits;
use crate::geometry::Interval;
use crate::objective::Evaluator;
use crate::placement::PlanContext;
use crate::schedule::Schedule;
use crate::time::round_up_to_minutes;

/// Swaps are proposed with up to this many following positions.
pub const NEIGHBORHOOD_WINDOW: usize = 3;
/// Objective is recomputed from scratch every this many iterations.
pub const RESYNC_EVERY: usize = 10;
pub const MOVE_CACHE_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveKind {
    Swap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub kind: MoveKind,
    pub i: usize,
    pub j: usize,
}

impl Move {
    pub fn swap(i: usize, j: usize) -> Self {
        Self {
            kind: MoveKind::Swap,
            i,
            j,
        }
    }

    /// Key recorded in the tabu list.
    pub fn tabu_key(&self, task_count: usize) -> usize {
        self.i * task_count + self.j
    }

    /// Positions whose placement a swap invalidates.
    pub fn affected(&self) -> std::ops::RangeInclusive<usize> {
        self.i.min(self.j)..=self.i.max(self.j)
    }
}

/// Swaps of each position with the next few positions.
pub fn neighborhood(task_count: usize) -> Vec<Move> {
    let mut moves = Vec::new();
    for i in 0..task_count.saturating_sub(1) {
        let max_j = (i + NEIGHBORHOOD_WINDOW).min(task_count - 1);
        for j in (i + 1)..=max_j {
            moves.push(Move::swap(i, j));
        }
    }
    moves
}

/// Fixed-capacity circular queue of recently accepted move keys.
#[derive(Debug, Clone)]
pub struct TabuList {
    ring: Vec<usize>,
    capacity: usize,
    pos: usize,
    counts: HashMap<usize, usize>,
}

impl TabuList {
    pub fn new(tenure: usize) -> Self {
        let capacity = tenure.max(1);
        Self {
            ring: Vec::with_capacity(capacity),
            capacity,
            pos: 0,
            counts: HashMap::new(),
        }
    }

    pub fn contains(&self, key: usize) -> bool {
        self.counts.contains_key(&key)
    }

    /// Record `key`, evicting the oldest entry once full.
    pub fn push(&mut self, key: usize) {
        if self.ring.len() < self.capacity {
            self.ring.push(key);
        } else {
            let evicted = std::mem::replace(&mut self.ring[self.pos], key);
            if let Some(c) = self.counts.get_mut(&evicted) {
                *c -= 1;
                if *c == 0 {
                    self.counts.remove(&evicted);
                }
            }
        }
        *self.counts.entry(key).or_insert(0) += 1;
        self.pos = (self.pos + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

/// A previously evaluated move.
#[derive(Debug, Clone)]
pub struct CachedMove {
    pub value: f64,
    pub schedule: Schedule,
}

/// Memo of evaluated moves. Implementations decide what "same move" means.
pub trait MoveCache {
    fn get(&mut self, mv: Move, current: &Schedule, objective: f64) -> Option<CachedMove>;
    fn insert(&mut self, mv: Move, current: &Schedule, objective: f64, entry: CachedMove);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Insertion-ordered map that drops its oldest half when over capacity.
#[derive(Debug, Clone)]
struct BoundedCache<K> {
    entries: HashMap<K, CachedMove>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone> BoundedCache<K> {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&self, key: &K) -> Option<CachedMove> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: K, entry: CachedMove) {
        if self.entries.insert(key.clone(), entry).is_none() {
            self.order.push_back(key);
        }
        if self.entries.len() > self.capacity {
            let evict = self.capacity / 2;
            for _ in 0..evict {
                let Some(old) = self.order.pop_front() else {
                    break;
                };
                self.entries.remove(&old);
            }
        }
    }
}

/// Keys moves by position and the current objective's integer part mod 1000.
///
/// Two different schedules with objectives in the same bucket share entries,
/// so a hit may return a result computed from another schedule. This is an
/// accepted approximation: it trades accuracy for fewer re-placements.
#[derive(Debug, Clone)]
pub struct ApproximateMoveCache {
    inner: BoundedCache<(Move, i64)>,
}

impl Default for ApproximateMoveCache {
    fn default() -> Self {
        Self {
            inner: BoundedCache::new(MOVE_CACHE_CAPACITY),
        }
    }
}

fn objective_bucket(objective: f64) -> i64 {
    if objective.is_finite() {
        (objective.floor() as i64).rem_euclid(1000)
    } else {
        -1
    }
}

impl MoveCache for ApproximateMoveCache {
    fn get(&mut self, mv: Move, _current: &Schedule, objective: f64) -> Option<CachedMove> {
        self.inner.get(&(mv, objective_bucket(objective)))
    }

    fn insert(&mut self, mv: Move, _current: &Schedule, objective: f64, entry: CachedMove) {
        self.inner.insert((mv, objective_bucket(objective)), entry);
    }

    fn len(&self) -> usize {
        self.inner.entries.len()
    }
}

/// Keys moves by position and a fingerprint of the whole current schedule.
#[derive(Debug, Clone)]
pub struct ExactMoveCache {
    inner: BoundedCache<(Move, u64)>,
}

impl Default for ExactMoveCache {
    fn default() -> Self {
        Self {
            inner: BoundedCache::new(MOVE_CACHE_CAPACITY),
        }
    }
}

/// Hash of task order and placements.
pub fn schedule_fingerprint(schedule: &Schedule) -> u64 {
    let mut h = DefaultHasher::new();
    for t in &schedule.tasks {
        t.id.hash(&mut h);
        t.segments.len().hash(&mut h);
        for s in &t.segments {
            (s.start, s.end).hash(&mut h);
        }
    }
    h.finish()
}

impl MoveCache for ExactMoveCache {
    fn get(&mut self, mv: Move, current: &Schedule, _objective: f64) -> Option<CachedMove> {
        self.inner.get(&(mv, schedule_fingerprint(current)))
    }

    fn insert(&mut self, mv: Move, current: &Schedule, _objective: f64, entry: CachedMove) {
        self.inner.insert((mv, schedule_fingerprint(current)), entry);
    }

    fn len(&self) -> usize {
        self.inner.entries.len()
    }
}

/// Swap two positions and re-place the range between them.
pub fn apply_move(schedule: &Schedule, mv: Move, ctx: &PlanContext) -> Schedule {
    let range: Vec<usize> = mv.affected().collect();
    let mut next = schedule.selective_clone(&range);
    match mv.kind {
        MoveKind::Swap => next.swap(mv.i, mv.j),
    }
    reschedule_range(&mut next, *mv.affected().start(), *mv.affected().end(), ctx);
    next
}

/// Re-place positions `lo..=hi` in order, starting right after position
/// `lo - 1` (or at the context start), around every other task's segments.
pub fn reschedule_range(schedule: &mut Schedule, lo: usize, hi: usize, ctx: &PlanContext) {
    let hi = hi.min(schedule.len().saturating_sub(1));
    if schedule.is_empty() || lo > hi {
        return;
    }

    let previous_end = match lo {
        0 => None,
        _ => schedule.tasks[lo - 1].scheduled_end_time,
    };
    let mut cursor = match previous_end {
        Some(end) => round_up_to_minutes(end, ctx.round_to_minutes),
        None => ctx.start,
    };

    let others: Vec<Interval> = schedule
        .tasks
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx < lo || *idx > hi)
        .flat_map(|(_, t)| t.segments.iter().map(|s| Interval::new(s.start, s.end)))
        .collect();
    let placer = ctx.placer(others);

    for idx in lo..=hi {
        let task = schedule.task_mut(idx);
        let placement = placer.place(task.duration, cursor);
        task.set_segments(placement.segments);
        if let Some(end) = task.scheduled_end_time {
            cursor = end;
        }
    }
}

/// Pick the move to accept from candidates in neighbourhood order.
///
/// A tabu move is admissible only when its value beats `best` (aspiration);
/// non-finite values never are. The first admissible move below `current`
/// is taken at once and later candidates are not pulled from the iterator.
/// Otherwise the lowest admissible value wins, ties going to the earliest.
pub fn select(
    candidates: impl IntoIterator<Item = (Move, CachedMove)>,
    tabu: &TabuList,
    task_count: usize,
    best: f64,
    current: f64,
) -> Option<(Move, CachedMove)> {
    let mut fallback: Option<(Move, CachedMove)> = None;

    for (mv, candidate) in candidates {
        if !candidate.value.is_finite() {
            continue;
        }
        if tabu.contains(mv.tabu_key(task_count)) && candidate.value >= best {
            continue;
        }
        if candidate.value < current {
            return Some((mv, candidate));
        }
        let better_fallback = fallback
            .as_ref()
            .is_none_or(|(_, f)| candidate.value < f.value);
        if better_fallback {
            fallback = Some((mv, candidate));
        }
    }
    fallback
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    MaxIterations,
    NoImprovement,
    NoAdmissibleMove,
    /// Fewer than two tasks, or nothing placed to improve on.
    NothingToSearch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    pub iterations: usize,
    pub improvements: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub stop_reason: StopReason,
    /// Best objective after the start and after each improvement.
    pub best_trace: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best: Schedule,
    pub best_objective: f64,
    pub stats: SearchStats,
}

/// Tabu search driver.
pub struct TabuSearch<'a, C: MoveCache = ApproximateMoveCache> {
    ctx: &'a PlanContext,
    evaluator: Evaluator,
    limits: SearchLimits,
    cache: C,
}

impl<'a> TabuSearch<'a, ApproximateMoveCache> {
    pub fn new(ctx: &'a PlanContext, evaluator: Evaluator, limits: SearchLimits) -> Self {
        Self {
            ctx,
            evaluator,
            limits,
            cache: ApproximateMoveCache::default(),
        }
    }
}

impl<'a, C: MoveCache> TabuSearch<'a, C> {
    pub fn with_cache<D: MoveCache>(self, cache: D) -> TabuSearch<'a, D> {
        TabuSearch {
            ctx: self.ctx,
            evaluator: self.evaluator,
            limits: self.limits,
            cache,
        }
    }

    /// Search from `initial`; returns the best schedule seen.
    ///
    /// Each iteration takes the first admissible improving move, or else the
    /// best admissible non-improving one. Tabu moves are admissible only if
    /// they beat the global best.
    pub fn run(&mut self, initial: &Schedule) -> SearchOutcome {
        let n = initial.len();
        let mut current = initial.clone();
        let mut factors = self.evaluator.factors(&current);
        let mut current_obj = self.evaluator.evaluate_with(&current, &factors);
        let mut best = current.deep_clone();
        let mut best_obj = current_obj;

        let mut stats = SearchStats {
            iterations: 0,
            improvements: 0,
            cache_hits: 0,
            cache_misses: 0,
            stop_reason: StopReason::MaxIterations,
            best_trace: vec![best_obj],
        };

        if n < 2 || !current_obj.is_finite() {
            stats.stop_reason = StopReason::NothingToSearch;
            return SearchOutcome {
                best,
                best_objective: best_obj,
                stats,
            };
        }

        let moves = neighborhood(n);
        let mut tabu = TabuList::new(self.limits.tabu_tenure);
        let mut without_improvement = 0usize;

        for iteration in 0..self.limits.max_iterations {
            stats.iterations = iteration + 1;
            if iteration % RESYNC_EVERY == 0 {
                factors = self.evaluator.factors(&current);
                current_obj = self.evaluator.evaluate_with(&current, &factors);
            }

            let evaluated = moves.iter().map(|&mv| {
                let entry = match self.cache.get(mv, &current, current_obj) {
                    Some(hit) => {
                        stats.cache_hits += 1;
                        hit
                    }
                    None => {
                        stats.cache_misses += 1;
                        let schedule = apply_move(&current, mv, self.ctx);
                        let affected: Vec<usize> = mv.affected().collect();
                        let value = self.evaluator.incremental(
                            &current,
                            &schedule,
                            &affected,
                            current_obj,
                            &factors,
                        );
                        let entry = CachedMove { value, schedule };
                        self.cache.insert(mv, &current, current_obj, entry.clone());
                        entry
                    }
                };
                (mv, entry)
            });

            let Some((mv, chosen)) = select(evaluated, &tabu, n, best_obj, current_obj) else {
                stats.stop_reason = StopReason::NoAdmissibleMove;
                break;
            };

            trace!(iteration, i = mv.i, j = mv.j, value = chosen.value, "accepted move");
            current = chosen.schedule;
            current_obj = chosen.value;
            tabu.push(mv.tabu_key(n));

            if current_obj < best_obj {
                best = current.deep_clone();
                best_obj = current_obj;
                without_improvement = 0;
                stats.improvements += 1;
                stats.best_trace.push(best_obj);
                debug!(iteration, best = best_obj, "new best schedule");
            } else {
                without_improvement += 1;
            }

            if without_improvement >= self.limits.max_no_improvement {
                stats.stop_reason = StopReason::NoImprovement;
                break;
            }
        }

        SearchOutcome {
            best,
            best_objective: best_obj,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Coefficients, PriorityWeights, SchedulerConfig};
    use crate::constructor::build_initial_schedule;
    use crate::schedule::Scenario;
    use crate::slot::{AvailabilitySlot, Recurrence, TimeSlots};
    use crate::task::{Priority, Task};
    use crate::validator::is_valid;
    use chrono::{DateTime, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 5, 8, 0, 0).unwrap()
    }

    fn scenario() -> Scenario {
        Scenario {
            tasks: vec![
                Task::new("a", "a").with_duration(120).with_priority(Priority::Low),
                Task::new("b", "b").with_duration(30).with_priority(Priority::Critical),
                Task::new("c", "c").with_duration(90).with_priority(Priority::Medium),
                Task::new("d", "d").with_duration(45).with_priority(Priority::High),
                Task::new("e", "e").with_duration(200).with_priority(Priority::Low),
            ],
            time_slots: TimeSlots {
                working_hours: vec![AvailabilitySlot::working_hours(9 * 60, 240, Recurrence::Daily)],
                breaks: vec![AvailabilitySlot::break_slot(11 * 60, 15, Recurrence::Daily)],
            },
            existing_schedule: vec![],
        }
    }

    fn setup(s: &Scenario) -> (PlanContext, Schedule) {
        let mut cfg = SchedulerConfig::default();
        cfg.use_greedy_sorting = false;
        let ctx = PlanContext::new(&s.time_slots, &[], false, &cfg, chrono_tz::UTC, now());
        let initial = build_initial_schedule(s, &ctx, &cfg, false, now());
        (ctx, initial)
    }

    fn evaluator() -> Evaluator {
        Evaluator::new(Coefficients::default(), PriorityWeights::default(), 5)
    }

    #[test]
    fn test_neighborhood_window() {
        let moves = neighborhood(5);
        let pairs: Vec<(usize, usize)> = moves.iter().map(|m| (m.i, m.j)).collect();
        assert_eq!(pairs, vec![
            (0, 1), (0, 2), (0, 3),
            (1, 2), (1, 3), (1, 4),
            (2, 3), (2, 4),
            (3, 4),
        ]);
        assert!(neighborhood(1).is_empty());
        assert!(neighborhood(0).is_empty());
    }

    #[test]
    fn test_tabu_list_evicts_oldest() {
        let mut tabu = TabuList::new(3);
        for k in [1, 2, 3] {
            tabu.push(k);
        }
        assert!(tabu.contains(1));
        tabu.push(4);
        assert!(!tabu.contains(1));
        assert!(tabu.contains(2) && tabu.contains(3) && tabu.contains(4));
        assert_eq!(tabu.len(), 3);

        // A key queued twice stays tabu until its last copy leaves.
        tabu.push(4);
        tabu.push(5);
        assert!(!tabu.contains(3));
        assert!(tabu.contains(4));
    }

    #[test]
    fn test_approximate_cache_evicts_half() {
        let (_, schedule) = setup(&scenario());
        let mut cache = ApproximateMoveCache::default();
        for i in 0..=MOVE_CACHE_CAPACITY {
            let entry = CachedMove {
                value: 1.0,
                schedule: schedule.clone(),
            };
            cache.insert(Move::swap(i, i + 1), &schedule, 3.7, entry);
        }
        assert_eq!(cache.len(), MOVE_CACHE_CAPACITY + 1 - MOVE_CACHE_CAPACITY / 2);
        assert!(cache.get(Move::swap(0, 1), &schedule, 3.2).is_none());
        assert!(cache.get(Move::swap(MOVE_CACHE_CAPACITY, MOVE_CACHE_CAPACITY + 1), &schedule, 3.9).is_some());
    }

    #[test]
    fn test_approximate_cache_buckets_by_objective() {
        let (_, schedule) = setup(&scenario());
        let mut cache = ApproximateMoveCache::default();
        let entry = CachedMove {
            value: 2.0,
            schedule: schedule.clone(),
        };
        cache.insert(Move::swap(0, 1), &schedule, 1001.5, entry);
        assert!(cache.get(Move::swap(0, 1), &schedule, 1.2).is_some());
        assert!(cache.get(Move::swap(0, 1), &schedule, 2.2).is_none());
    }

    #[test]
    fn test_exact_cache_distinguishes_schedules() {
        let s = scenario();
        let (ctx, schedule) = setup(&s);
        let moved = apply_move(&schedule, Move::swap(0, 1), &ctx);
        let mut cache = ExactMoveCache::default();
        cache.insert(
            Move::swap(1, 2),
            &schedule,
            1.0,
            CachedMove {
                value: 1.0,
                schedule: schedule.clone(),
            },
        );
        assert!(cache.get(Move::swap(1, 2), &schedule, 5.0).is_some());
        assert!(cache.get(Move::swap(1, 2), &moved, 1.0).is_none());
    }

    #[test]
    fn test_apply_move_swaps_and_keeps_invariants() {
        let s = scenario();
        let (ctx, schedule) = setup(&s);
        let moved = apply_move(&schedule, Move::swap(1, 3), &ctx);

        assert_eq!(moved.order(), vec!["a", "d", "c", "b", "e"]);
        assert!(std::sync::Arc::ptr_eq(&schedule.tasks[4], &moved.tasks[4]));
        assert!(is_valid(&moved));
        for t in &moved.tasks {
            if !t.is_partial {
                assert_eq!(t.placed_minutes(), t.duration);
            }
        }
        // Range restarts right after position 0.
        let a_end = moved.tasks[0].scheduled_end_time.unwrap();
        assert!(moved.tasks[1].scheduled_start_time.unwrap() >= a_end);
    }

    #[test]
    fn test_search_never_worsens_best() {
        let s = scenario();
        let (ctx, initial) = setup(&s);
        let ev = evaluator();
        let start_value = ev.evaluate(&initial);
        let mut search = TabuSearch::new(&ctx, ev, SearchLimits {
            max_iterations: 200,
            tabu_tenure: 5,
            max_no_improvement: 30,
        });
        let out = search.run(&initial);

        assert!(out.best_objective <= start_value);
        assert!(out.stats.best_trace.windows(2).all(|w| w[1] <= w[0]));
        assert!(out.stats.iterations >= 1);
        let mut ids: Vec<&str> = out.best.order();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
        assert!(is_valid(&out.best));
    }

    #[test]
    fn test_exact_cache_search_is_deterministic() {
        let s = scenario();
        let (ctx, initial) = setup(&s);
        let limits = SearchLimits {
            max_iterations: 50,
            tabu_tenure: 4,
            max_no_improvement: 20,
        };
        let a = TabuSearch::new(&ctx, evaluator(), limits)
            .with_cache(ExactMoveCache::default())
            .run(&initial);
        let b = TabuSearch::new(&ctx, evaluator(), limits)
            .with_cache(ExactMoveCache::default())
            .run(&initial);
        assert_eq!(a.best.order(), b.best.order());
        assert_eq!(a.best_objective, b.best_objective);
        assert_eq!(a.stats, b.stats);
    }

    fn offered(schedule: &Schedule, moves: &[(Move, f64)]) -> Vec<(Move, CachedMove)> {
        moves
            .iter()
            .map(|&(mv, value)| {
                let entry = CachedMove {
                    value,
                    schedule: schedule.clone(),
                };
                (mv, entry)
            })
            .collect()
    }

    fn tabu_with(moves: &[Move], n: usize) -> TabuList {
        let mut tabu = TabuList::new(5);
        for mv in moves {
            tabu.push(mv.tabu_key(n));
        }
        tabu
    }

    #[test]
    fn test_select_takes_first_improving_move() {
        let (_, schedule) = setup(&scenario());
        let candidates = offered(&schedule, &[
            (Move::swap(0, 1), 3.5),
            (Move::swap(0, 2), 2.9),
            (Move::swap(0, 3), 1.0),
        ]);
        let mut pulled = 0;
        let picked = select(
            candidates.into_iter().inspect(|_| pulled += 1),
            &TabuList::new(5),
            5,
            3.0,
            3.0,
        );
        assert_eq!(picked.map(|(mv, c)| (mv, c.value)), Some((Move::swap(0, 2), 2.9)));
        assert_eq!(pulled, 2);
    }

    #[test]
    fn test_select_aspiration_admits_tabu_move_beating_best() {
        let (_, schedule) = setup(&scenario());
        let tabu = tabu_with(&[Move::swap(0, 1)], 5);
        let candidates = offered(&schedule, &[(Move::swap(0, 1), 1.5), (Move::swap(1, 2), 2.5)]);
        let picked = select(candidates, &tabu, 5, 2.0, 3.0);
        assert_eq!(picked.map(|(mv, _)| mv), Some(Move::swap(0, 1)));
    }

    #[test]
    fn test_select_skips_tabu_move_not_beating_best() {
        let (_, schedule) = setup(&scenario());
        let tabu = tabu_with(&[Move::swap(0, 1)], 5);
        // Improves on the current value but not on the best, so it stays tabu.
        let candidates = offered(&schedule, &[
            (Move::swap(0, 1), 2.5),
            (Move::swap(1, 2), 4.0),
            (Move::swap(1, 3), 3.5),
        ]);
        let picked = select(candidates, &tabu, 5, 2.0, 3.0);
        assert_eq!(picked.map(|(mv, c)| (mv, c.value)), Some((Move::swap(1, 3), 3.5)));
    }

    #[test]
    fn test_select_without_admissible_move() {
        let (_, schedule) = setup(&scenario());
        let tabu = tabu_with(&[Move::swap(0, 1), Move::swap(1, 2)], 5);
        let candidates = offered(&schedule, &[
            (Move::swap(0, 1), 2.0),
            (Move::swap(1, 2), 2.5),
            (Move::swap(2, 3), f64::INFINITY),
        ]);
        assert!(select(candidates, &tabu, 5, 2.0, 3.0).is_none());
        assert!(select(Vec::<(Move, CachedMove)>::new(), &TabuList::new(5), 5, 2.0, 3.0).is_none());
    }

    /// Two one-hour tasks in a single four-hour morning, in the given order.
    fn pair(first: Priority, second: Priority) -> Scenario {
        Scenario {
            tasks: vec![
                Task::new("first", "").with_duration(60).with_priority(first),
                Task::new("second", "").with_duration(60).with_priority(second),
            ],
            time_slots: TimeSlots {
                working_hours: vec![AvailabilitySlot::working_hours(9 * 60, 240, Recurrence::Daily)],
                breaks: vec![],
            },
            existing_schedule: vec![],
        }
    }

    #[test]
    fn test_run_stops_when_only_tabu_moves_remain() {
        let s = pair(Priority::Low, Priority::Critical);
        let (ctx, initial) = setup(&s);
        let out = TabuSearch::new(&ctx, evaluator(), SearchLimits {
            max_iterations: 50,
            tabu_tenure: 5,
            max_no_improvement: 50,
        })
        .with_cache(ExactMoveCache::default())
        .run(&initial);

        // The swap improves; swapping back is tabu and worse than the best.
        assert_eq!(out.stats.stop_reason, StopReason::NoAdmissibleMove);
        assert_eq!(out.stats.iterations, 2);
        assert_eq!(out.stats.improvements, 1);
        assert_eq!(out.best.order(), vec!["second", "first"]);
    }

    #[test]
    fn test_run_stops_after_max_no_improvement() {
        let s = pair(Priority::Critical, Priority::Low);
        let (ctx, initial) = setup(&s);
        let out = TabuSearch::new(&ctx, evaluator(), SearchLimits {
            max_iterations: 50,
            tabu_tenure: 5,
            max_no_improvement: 1,
        })
        .run(&initial);

        assert_eq!(out.stats.stop_reason, StopReason::NoImprovement);
        assert_eq!(out.stats.iterations, 1);
        assert_eq!(out.stats.improvements, 0);
        assert_eq!(out.best.order(), vec!["first", "second"]);
        assert_eq!(out.stats.best_trace.len(), 1);
    }

    #[test]
    fn test_single_task_has_nothing_to_search() {
        let s = Scenario {
            tasks: vec![Task::new("solo", "").with_duration(30)],
            ..scenario()
        };
        let (ctx, initial) = setup(&s);
        let out = TabuSearch::new(&ctx, evaluator(), SearchLimits::default()).run(&initial);
        assert_eq!(out.stats.stop_reason, StopReason::NothingToSearch);
        assert_eq!(out.stats.iterations, 0);
    }
}
