//! The transactional outbox: domain events are written here alongside
//! aggregate mutations; an external worker performs publication. The core
//! never publishes directly (§5, §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::{DomainEvent, OutboxMessageId, ScheduleId, UserId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    Pending,
    Published,
    Failed,
    Dead,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: OutboxMessageId,
    pub user_id: UserId,
    pub aggregate_id: ScheduleId,
    pub aggregate_type: &'static str,
    pub routing_key: &'static str,
    pub payload: serde_json::Value,
    pub correlation_id: Uuid,
    pub publish_status: PublishStatus,
    pub retry_count: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OutboxMessage {
    /// Builds the §6 payload shape for one domain event. `aggregateId =
    /// scheduleId`, `aggregateType = "Schedule"`, carries correlation
    /// metadata and a server timestamp.
    pub fn from_domain_event(
        event: &DomainEvent,
        schedule_id: ScheduleId,
        user_id: UserId,
        correlation_id: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        let payload = match event {
            DomainEvent::BlockScheduled {
                block_id,
                block_type,
                reference_id,
                title,
                start_time,
                end_time,
            } => json!({
                "blockId": block_id,
                "blockType": block_type,
                "referenceId": reference_id,
                "title": title,
                "startTime": start_time,
                "endTime": end_time,
            }),
            DomainEvent::BlockRescheduled {
                block_id,
                old_start_time,
                old_end_time,
                new_start_time,
                new_end_time,
            } => json!({
                "blockId": block_id,
                "oldStartTime": old_start_time,
                "oldEndTime": old_end_time,
                "newStartTime": new_start_time,
                "newEndTime": new_end_time,
            }),
            DomainEvent::BlockCompleted {
                block_id,
                block_type,
                reference_id,
            } => json!({
                "blockId": block_id,
                "blockType": block_type,
                "referenceId": reference_id,
            }),
            DomainEvent::BlockMissed {
                block_id,
                block_type,
                reference_id,
            } => json!({
                "blockId": block_id,
                "blockType": block_type,
                "referenceId": reference_id,
            }),
        };

        Self {
            id: OutboxMessageId::new(),
            user_id,
            aggregate_id: schedule_id,
            aggregate_type: "Schedule",
            routing_key: event.routing_key(),
            payload,
            correlation_id,
            publish_status: PublishStatus::Pending,
            retry_count: 0,
            next_retry_at: None,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BlockId;
    use chrono::TimeZone;

    #[test]
    fn scheduled_event_carries_schedule_as_aggregate() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        let event = DomainEvent::BlockScheduled {
            block_id: BlockId::new(),
            block_type: crate::domain::BlockType::Task,
            reference_id: Some("task-1".into()),
            title: "Write report".into(),
            start_time: now,
            end_time: now,
        };
        let msg = OutboxMessage::from_domain_event(
            &event,
            ScheduleId::new(),
            UserId::new(),
            Uuid::new_v4(),
            now,
        );
        assert_eq!(msg.aggregate_type, "Schedule");
        assert_eq!(msg.routing_key, "scheduling.block.scheduled");
        assert_eq!(msg.publish_status, PublishStatus::Pending);
    }
}
