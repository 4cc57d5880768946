//! [`SchedulableTask`]: an input to the scheduler, not yet placed.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{BlockType, Constraint};

#[derive(Debug, Clone)]
pub struct SchedulableTask {
    /// External entity id (task/habit/meeting id), carried through to the
    /// placed block's `reference_id`.
    pub id: String,
    pub title: String,
    /// 1 = urgent .. 5 = lowest.
    pub priority: u8,
    pub duration: Duration,
    pub due_date: Option<DateTime<Utc>>,
    pub constraints: Vec<Constraint>,
    pub block_type: BlockType,
}

impl SchedulableTask {
    pub fn is_due_same_day(&self, date: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => due.date_naive() == date.date_naive(),
            None => false,
        }
    }
}

/// Outcome of attempting to place one [`SchedulableTask`].
#[derive(Debug, Clone)]
pub struct PlacementResult {
    pub task_id: String,
    pub scheduled: bool,
    pub block_id: Option<crate::domain::BlockId>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

impl PlacementResult {
    pub fn placed(task_id: String, block: &crate::domain::TimeBlock) -> Self {
        Self {
            task_id,
            scheduled: true,
            block_id: Some(block.id),
            start_time: Some(block.start_time),
            end_time: Some(block.end_time),
            reason: None,
        }
    }

    pub fn failed(task_id: String, reason: impl Into<String>) -> Self {
        Self {
            task_id,
            scheduled: false,
            block_id: None,
            start_time: None,
            end_time: None,
            reason: Some(reason.into()),
        }
    }
}
