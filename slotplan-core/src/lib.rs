//! slotplan-core: tabu-search optimizer that places tasks into recurring working time

pub mod config;
pub mod constructor;
pub mod error;
pub mod geometry;
pub mod objective;
pub mod placement;
pub mod schedule;
pub mod scheduler;
pub mod slot;
pub mod tabu;
pub mod task;
pub mod time;
pub mod validator;

pub use config::{Coefficients, OptimizeOptions, PriorityWeights, SchedulerConfig, SearchLimits};
pub use error::{Result, SchedulerError};
pub use geometry::Interval;
pub use objective::{Evaluator, NormalizationFactors, ObjectiveBreakdown};
pub use placement::PlanContext;
pub use schedule::{Scenario, Schedule, ScheduleMetadata};
pub use scheduler::{optimize, OptimizationResult};
pub use slot::{AvailabilitySlot, ExistingBlock, Recurrence, SlotType, TimeSlots};
pub use tabu::{
    ApproximateMoveCache, ExactMoveCache, Move, MoveCache, MoveKind, SearchOutcome, SearchStats,
    StopReason, TabuSearch,
};
pub use task::{Priority, Segment, Task};
pub use time::Millis;
pub use validator::{find_collision, is_valid, Collision};
