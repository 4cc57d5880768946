//! [`TimeBlock`]: one contiguous `[start, end)` interval on a [`Schedule`](super::Schedule).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{BlockId, ScheduleId, UserId};

/// Minimum duration any stored block may have.
pub const MIN_BLOCK_DURATION_MINUTES: i64 = 5;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Task,
    Habit,
    Meeting,
    Focus,
    Break,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBlock {
    pub id: BlockId,
    pub user_id: UserId,
    pub schedule_id: ScheduleId,
    pub block_type: BlockType,
    pub reference_id: Option<String>,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub completed: bool,
    pub missed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeBlock {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: BlockId,
        user_id: UserId,
        schedule_id: ScheduleId,
        block_type: BlockType,
        reference_id: Option<String>,
        title: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            schedule_id,
            block_type,
            reference_id,
            title,
            start_time,
            end_time,
            completed: false,
            missed: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }

    /// `[start, end)` containment: `start <= t < end`.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start_time <= t && t < self.end_time
    }

    /// Half-open interval overlap: `a.start < b.end AND b.start < a.end`.
    pub fn overlaps(&self, other_start: DateTime<Utc>, other_end: DateTime<Utc>) -> bool {
        detect_overlap(self.start_time, self.end_time, other_start, other_end)
    }
}

/// `a.start < b.end AND b.start < a.end` — the half-open overlap predicate
/// used throughout the core (block/block, block/external-event).
pub fn detect_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}
