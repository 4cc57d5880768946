//! Error vocabulary for domain-level (`Schedule`/`TimeBlock`) operations.

use thiserror::Error;

use super::constraint::Constraint;
use super::ids::BlockId;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid time range: end must be after start")]
    InvalidTimeRange,

    #[error("block duration is below the minimum of {min_minutes} minutes")]
    TooShort { min_minutes: i64 },

    #[error("block violates a hard constraint: {constraint:?} (penalty {penalty})")]
    ConstraintViolation {
        constraint: Box<Constraint>,
        penalty: f64,
    },

    #[error("block overlaps an existing block on the schedule")]
    Overlap,

    #[error("block {0} not found")]
    BlockNotFound(BlockId),

    #[error("ownership mismatch: block/schedule do not share a user")]
    OwnershipMismatch,
}

impl DomainError {
    /// Message surfaced to a scheduler/rescheduler caller as a non-fatal
    /// per-item failure reason (§4.B step 3e, §7).
    pub fn message(&self) -> String {
        self.to_string()
    }
}
