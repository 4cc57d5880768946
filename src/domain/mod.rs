//! Component A: the domain model — `Schedule`, `TimeBlock`, `Constraint`,
//! `Conflict`, `RescheduleAttempt` — and the invariants/transitions they
//! uphold. Emits `DomainEvent`s; never publishes them (see
//! [`crate::handlers::unit_of_work`]).

pub mod conflict;
pub mod constraint;
pub mod error;
pub mod events;
pub mod ids;
pub mod reschedule_attempt;
pub mod schedule;
pub mod time_block;

pub use conflict::{AlreadyResolvedError, Conflict, ConflictResolution, ConflictType};
pub use constraint::{Constraint, ConstraintEvaluation, ConstraintKind, ConstraintSet, DurationMinutes, WeekdayDto};
pub use error::DomainError;
pub use events::DomainEvent;
pub use ids::{BlockId, ConflictId, OutboxMessageId, RescheduleAttemptId, ScheduleId, UserId};
pub use reschedule_attempt::{AttemptType, RescheduleAttempt};
pub use schedule::{normalize_to_midnight, Schedule, Slot};
pub use time_block::{detect_overlap, BlockType, TimeBlock};
