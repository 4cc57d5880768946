//! [`RescheduleAttempt`]: an immutable audit record of one try at moving a
//! block. Independent record — references a block/schedule by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{BlockId, RescheduleAttemptId, ScheduleId, UserId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptType {
    AutoMissed,
    AutoConflict,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAttempt {
    pub id: RescheduleAttemptId,
    pub user_id: UserId,
    pub schedule_id: ScheduleId,
    pub block_id: BlockId,
    pub attempt_type: AttemptType,
    pub attempted_at: DateTime<Utc>,
    pub old_start: DateTime<Utc>,
    pub old_end: DateTime<Utc>,
    pub new_start: Option<DateTime<Utc>>,
    pub new_end: Option<DateTime<Utc>>,
    pub success: bool,
    pub failure_reason: Option<String>,
}

impl RescheduleAttempt {
    #[allow(clippy::too_many_arguments)]
    pub fn success(
        user_id: UserId,
        schedule_id: ScheduleId,
        block_id: BlockId,
        attempt_type: AttemptType,
        attempted_at: DateTime<Utc>,
        old_start: DateTime<Utc>,
        old_end: DateTime<Utc>,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RescheduleAttemptId::new(),
            user_id,
            schedule_id,
            block_id,
            attempt_type,
            attempted_at,
            old_start,
            old_end,
            new_start: Some(new_start),
            new_end: Some(new_end),
            success: true,
            failure_reason: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn failure(
        user_id: UserId,
        schedule_id: ScheduleId,
        block_id: BlockId,
        attempt_type: AttemptType,
        attempted_at: DateTime<Utc>,
        old_start: DateTime<Utc>,
        old_end: DateTime<Utc>,
        failure_reason: impl Into<String>,
    ) -> Self {
        Self {
            id: RescheduleAttemptId::new(),
            user_id,
            schedule_id,
            block_id,
            attempt_type,
            attempted_at,
            old_start,
            old_end,
            new_start: None,
            new_end: None,
            success: false,
            failure_reason: Some(failure_reason.into()),
        }
    }
}
