//! Domain events emitted by [`Schedule`](super::Schedule) mutations.
//!
//! Buffered on the aggregate and drained by the command handler after a
//! successful persist — the domain never publishes directly (see
//! `handlers::unit_of_work`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::BlockId;
use super::time_block::BlockType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    BlockScheduled {
        block_id: BlockId,
        block_type: BlockType,
        reference_id: Option<String>,
        title: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    },
    BlockRescheduled {
        block_id: BlockId,
        old_start_time: DateTime<Utc>,
        old_end_time: DateTime<Utc>,
        new_start_time: DateTime<Utc>,
        new_end_time: DateTime<Utc>,
    },
    BlockCompleted {
        block_id: BlockId,
        block_type: BlockType,
        reference_id: Option<String>,
    },
    BlockMissed {
        block_id: BlockId,
        block_type: BlockType,
        reference_id: Option<String>,
    },
}

impl DomainEvent {
    /// Routing key this event is published under once the publisher worker
    /// drains the outbox (§6).
    pub fn routing_key(&self) -> &'static str {
        match self {
            DomainEvent::BlockScheduled { .. } => "scheduling.block.scheduled",
            DomainEvent::BlockRescheduled { .. } => "scheduling.block.rescheduled",
            DomainEvent::BlockCompleted { .. } => "scheduling.block.completed",
            DomainEvent::BlockMissed { .. } => "scheduling.block.missed",
        }
    }

    pub fn block_id(&self) -> BlockId {
        match self {
            DomainEvent::BlockScheduled { block_id, .. }
            | DomainEvent::BlockRescheduled { block_id, .. }
            | DomainEvent::BlockCompleted { block_id, .. }
            | DomainEvent::BlockMissed { block_id, .. } => *block_id,
        }
    }

    /// Recovers the `'static` routing key constant matching a persisted
    /// string, for repositories that store `routing_key` as text.
    pub fn routing_key_from_str(s: &str) -> Option<&'static str> {
        match s {
            "scheduling.block.scheduled" => Some("scheduling.block.scheduled"),
            "scheduling.block.rescheduled" => Some("scheduling.block.rescheduled"),
            "scheduling.block.completed" => Some("scheduling.block.completed"),
            "scheduling.block.missed" => Some("scheduling.block.missed"),
            _ => None,
        }
    }
}
