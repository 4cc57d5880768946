//! [`Conflict`]: a detected overlap between a stored [`TimeBlock`] and an
//! external calendar event. Independent record — references a block by id,
//! does not own it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::{BlockId, ConflictId, UserId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    Overlap,
    Modified,
    Deleted,
    DoubleBooked,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    Pending,
    Rescheduled,
    Kept,
    Removed,
}

impl ConflictResolution {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ConflictResolution::Pending)
    }
}

#[derive(Debug, Error)]
#[error("conflict {0} is already resolved and cannot transition again")]
pub struct AlreadyResolvedError(pub ConflictId);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub id: ConflictId,
    pub user_id: UserId,
    pub conflict_type: ConflictType,
    pub orbita_block_id: BlockId,
    pub orbita_block_start: DateTime<Utc>,
    pub orbita_block_end: DateTime<Utc>,
    pub external_event_id: String,
    pub external_start: DateTime<Utc>,
    pub external_end: DateTime<Utc>,
    pub resolution: ConflictResolution,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conflict {
    #[allow(clippy::too_many_arguments)]
    pub fn new_pending(
        user_id: UserId,
        conflict_type: ConflictType,
        orbita_block_id: BlockId,
        orbita_block_start: DateTime<Utc>,
        orbita_block_end: DateTime<Utc>,
        external_event_id: String,
        external_start: DateTime<Utc>,
        external_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ConflictId::new(),
            user_id,
            conflict_type,
            orbita_block_id,
            orbita_block_start,
            orbita_block_end,
            external_event_id,
            external_start,
            external_end,
            resolution: ConflictResolution::Pending,
            resolved_at: None,
            created_at: now,
        }
    }

    /// Resolution is monotonic: no transition out of a terminal state.
    pub fn resolve(
        &mut self,
        resolution: ConflictResolution,
        now: DateTime<Utc>,
    ) -> Result<(), AlreadyResolvedError> {
        if self.resolution.is_terminal() {
            return Err(AlreadyResolvedError(self.id));
        }
        self.resolution = resolution;
        if resolution.is_terminal() {
            self.resolved_at = Some(now);
        }
        Ok(())
    }
}
