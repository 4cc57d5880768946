//! Read-only interfaces onto the task/habit/meeting aggregates (out of
//! scope per §1 — consumed through these traits only).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::UserId;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TaskPriority {
    Urgent,
    High,
    Medium,
    Low,
    None,
}

impl TaskPriority {
    /// urgent/high/medium/low/none -> 1/2/3/4/5 (§4.C).
    pub fn as_numeric(self) -> u8 {
        match self {
            TaskPriority::Urgent => 1,
            TaskPriority::High => 2,
            TaskPriority::Medium => 3,
            TaskPriority::Low => 4,
            TaskPriority::None => 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub priority: TaskPriority,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PreferredTime {
    Morning,
    Afternoon,
    Evening,
    Night,
    Anytime,
}

impl PreferredTime {
    /// morning 6-12, afternoon 12-17, evening 17-21, night 21-24; anytime ->
    /// no constraint (§4.C).
    pub fn hour_window(self) -> Option<(u32, u32)> {
        match self {
            PreferredTime::Morning => Some((6, 12)),
            PreferredTime::Afternoon => Some((12, 17)),
            PreferredTime::Evening => Some((17, 21)),
            PreferredTime::Night => Some((21, 24)),
            PreferredTime::Anytime => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HabitRecord {
    pub id: String,
    pub title: String,
    pub duration_minutes: Option<i64>,
    pub preferred_time: PreferredTime,
}

#[derive(Debug, Clone)]
pub struct MeetingRecord {
    pub id: String,
    pub title: String,
    pub duration_minutes: Option<i64>,
    /// Hour of day (0-23) the meeting prefers to start at, if any.
    pub preferred_hour: Option<u32>,
}

#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn pending_tasks(&self, user_id: UserId) -> anyhow::Result<Vec<TaskRecord>>;

    /// Single-entity lookup, used by the event subscriber (§4.G) to load the
    /// full record behind a `core.task.created` notification.
    async fn get_task(&self, id: &str) -> anyhow::Result<Option<TaskRecord>>;
}

#[async_trait]
pub trait HabitSource: Send + Sync {
    async fn due_today(&self, user_id: UserId, date: DateTime<Utc>) -> anyhow::Result<Vec<HabitRecord>>;

    async fn get_habit(&self, id: &str) -> anyhow::Result<Option<HabitRecord>>;
}

#[async_trait]
pub trait MeetingSource: Send + Sync {
    async fn occurring_on(&self, user_id: UserId, date: DateTime<Utc>) -> anyhow::Result<Vec<MeetingRecord>>;

    async fn get_meeting(&self, id: &str) -> anyhow::Result<Option<MeetingRecord>>;
}
