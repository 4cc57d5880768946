//! Row types for the Postgres reference schema, plus the mapping to/from
//! the domain types. Enums are stored as their serde `snake_case` tag
//! rather than a Postgres enum type, keeping the schema stable as variants
//! are added.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{
    AttemptType, BlockType, Conflict, ConflictResolution, ConflictType, ConstraintSet,
    RescheduleAttempt, Schedule, TimeBlock,
};
use crate::outbox::{OutboxMessage, PublishStatus};
use crate::repository::{RepositoryError, RepositoryResult};

use super::schema::{conflicts, outbox_messages, reschedule_attempts, schedules, time_blocks};

fn enum_tag<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => s,
        _ => unreachable!("enum tags always serialize to a JSON string"),
    }
}

fn enum_from_tag<T: serde::de::DeserializeOwned>(tag: &str) -> RepositoryResult<T> {
    serde_json::from_value(Value::String(tag.to_string()))
        .map_err(|e| RepositoryError::internal(format!("unrecognized enum tag {tag}: {e}")))
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = schedules)]
pub struct ScheduleRow {
    pub schedule_id: Uuid,
    pub user_id: Uuid,
    pub date: DateTime<Utc>,
    pub constraints_json: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleRow {
    pub fn from_domain(schedule: &Schedule) -> RepositoryResult<Self> {
        Ok(Self {
            schedule_id: schedule.id.value(),
            user_id: schedule.user_id.value(),
            date: schedule.date,
            constraints_json: serde_json::to_value(&schedule.constraints)
                .map_err(|e| RepositoryError::internal(e.to_string()))?,
            created_at: schedule.created_at,
            updated_at: schedule.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = time_blocks)]
pub struct TimeBlockRow {
    pub block_id: Uuid,
    pub schedule_id: Uuid,
    pub user_id: Uuid,
    pub block_type: String,
    pub reference_id: Option<String>,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub completed: bool,
    pub missed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeBlockRow {
    pub fn from_domain(block: &TimeBlock) -> Self {
        Self {
            block_id: block.id.value(),
            schedule_id: block.schedule_id.value(),
            user_id: block.user_id.value(),
            block_type: enum_tag(&block.block_type),
            reference_id: block.reference_id.clone(),
            title: block.title.clone(),
            start_time: block.start_time,
            end_time: block.end_time,
            completed: block.completed,
            missed: block.missed,
            created_at: block.created_at,
            updated_at: block.updated_at,
        }
    }
}

/// Rebuilds a [`Schedule`] aggregate from its persisted row plus child
/// block rows, matching [`Schedule::from_parts`]'s reconstitution contract.
pub fn schedule_from_rows(
    schedule_row: ScheduleRow,
    block_rows: Vec<TimeBlockRow>,
) -> RepositoryResult<Schedule> {
    let constraints: ConstraintSet = serde_json::from_value(schedule_row.constraints_json)
        .map_err(|e| RepositoryError::internal(e.to_string()))?;

    let mut blocks = Vec::with_capacity(block_rows.len());
    for row in block_rows {
        let block_type: BlockType = enum_from_tag(&row.block_type)?;
        blocks.push(TimeBlock {
            id: row.block_id.into(),
            user_id: row.user_id.into(),
            schedule_id: row.schedule_id.into(),
            block_type,
            reference_id: row.reference_id,
            title: row.title,
            start_time: row.start_time,
            end_time: row.end_time,
            completed: row.completed,
            missed: row.missed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        });
    }

    Ok(Schedule::from_parts(
        schedule_row.schedule_id.into(),
        schedule_row.user_id.into(),
        schedule_row.date,
        blocks,
        constraints,
        schedule_row.created_at,
        schedule_row.updated_at,
    ))
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = reschedule_attempts)]
pub struct RescheduleAttemptRow {
    pub attempt_id: Uuid,
    pub user_id: Uuid,
    pub schedule_id: Uuid,
    pub block_id: Uuid,
    pub attempt_type: String,
    pub attempted_at: DateTime<Utc>,
    pub old_start: DateTime<Utc>,
    pub old_end: DateTime<Utc>,
    pub new_start: Option<DateTime<Utc>>,
    pub new_end: Option<DateTime<Utc>>,
    pub success: bool,
    pub failure_reason: Option<String>,
}

impl RescheduleAttemptRow {
    pub fn from_domain(attempt: &RescheduleAttempt) -> Self {
        Self {
            attempt_id: attempt.id.value(),
            user_id: attempt.user_id.value(),
            schedule_id: attempt.schedule_id.value(),
            block_id: attempt.block_id.value(),
            attempt_type: enum_tag(&attempt.attempt_type),
            attempted_at: attempt.attempted_at,
            old_start: attempt.old_start,
            old_end: attempt.old_end,
            new_start: attempt.new_start,
            new_end: attempt.new_end,
            success: attempt.success,
            failure_reason: attempt.failure_reason.clone(),
        }
    }

    pub fn into_domain(self) -> RepositoryResult<RescheduleAttempt> {
        let attempt_type: AttemptType = enum_from_tag(&self.attempt_type)?;
        Ok(RescheduleAttempt {
            id: self.attempt_id.into(),
            user_id: self.user_id.into(),
            schedule_id: self.schedule_id.into(),
            block_id: self.block_id.into(),
            attempt_type,
            attempted_at: self.attempted_at,
            old_start: self.old_start,
            old_end: self.old_end,
            new_start: self.new_start,
            new_end: self.new_end,
            success: self.success,
            failure_reason: self.failure_reason,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = conflicts)]
pub struct ConflictRow {
    pub conflict_id: Uuid,
    pub user_id: Uuid,
    pub conflict_type: String,
    pub orbita_block_id: Uuid,
    pub orbita_block_start: DateTime<Utc>,
    pub orbita_block_end: DateTime<Utc>,
    pub external_event_id: String,
    pub external_start: DateTime<Utc>,
    pub external_end: DateTime<Utc>,
    pub resolution: String,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ConflictRow {
    pub fn from_domain(conflict: &Conflict) -> Self {
        Self {
            conflict_id: conflict.id.value(),
            user_id: conflict.user_id.value(),
            conflict_type: enum_tag(&conflict.conflict_type),
            orbita_block_id: conflict.orbita_block_id.value(),
            orbita_block_start: conflict.orbita_block_start,
            orbita_block_end: conflict.orbita_block_end,
            external_event_id: conflict.external_event_id.clone(),
            external_start: conflict.external_start,
            external_end: conflict.external_end,
            resolution: enum_tag(&conflict.resolution),
            resolved_at: conflict.resolved_at,
            created_at: conflict.created_at,
        }
    }

    pub fn into_domain(self) -> RepositoryResult<Conflict> {
        let conflict_type: ConflictType = enum_from_tag(&self.conflict_type)?;
        let resolution: ConflictResolution = enum_from_tag(&self.resolution)?;
        Ok(Conflict {
            id: self.conflict_id.into(),
            user_id: self.user_id.into(),
            conflict_type,
            orbita_block_id: self.orbita_block_id.into(),
            orbita_block_start: self.orbita_block_start,
            orbita_block_end: self.orbita_block_end,
            external_event_id: self.external_event_id,
            external_start: self.external_start,
            external_end: self.external_end,
            resolution,
            resolved_at: self.resolved_at,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = outbox_messages)]
pub struct OutboxMessageRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub aggregate_id: Uuid,
    pub aggregate_type: String,
    pub routing_key: String,
    pub payload: Value,
    pub correlation_id: Uuid,
    pub publish_status: String,
    pub retry_count: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OutboxMessageRow {
    pub fn from_domain(message: &OutboxMessage) -> Self {
        Self {
            id: message.id.value(),
            user_id: message.user_id.value(),
            aggregate_id: message.aggregate_id.value(),
            aggregate_type: message.aggregate_type.to_string(),
            routing_key: message.routing_key.to_string(),
            payload: message.payload.clone(),
            correlation_id: message.correlation_id,
            publish_status: enum_tag(&message.publish_status),
            retry_count: message.retry_count,
            next_retry_at: message.next_retry_at,
            created_at: message.created_at,
        }
    }

    pub fn into_domain(self) -> RepositoryResult<OutboxMessage> {
        let publish_status: PublishStatus = enum_from_tag(&self.publish_status)?;
        let aggregate_type: &'static str = match self.aggregate_type.as_str() {
            "Schedule" => "Schedule",
            other => {
                return Err(RepositoryError::internal(format!(
                    "unrecognized aggregate_type {other}"
                )))
            }
        };
        let routing_key: &'static str = crate::domain::DomainEvent::routing_key_from_str(&self.routing_key)
            .ok_or_else(|| RepositoryError::internal(format!("unrecognized routing_key {}", self.routing_key)))?;

        Ok(OutboxMessage {
            id: self.id.into(),
            user_id: self.user_id.into(),
            aggregate_id: self.aggregate_id.into(),
            aggregate_type,
            routing_key,
            payload: self.payload,
            correlation_id: self.correlation_id,
            publish_status,
            retry_count: self.retry_count,
            next_retry_at: self.next_retry_at,
            created_at: self.created_at,
        })
    }
}
