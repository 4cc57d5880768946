//! In-memory reference implementation, grounded on the teacher's
//! `LocalRepository`: a `parking_lot`-guarded store, no external
//! dependencies, used as the default backend for tests and local dev.
//!
//! Concurrent commands on the same `(userId, date)` are serialized
//! pessimistically by the single `RwLock` rather than via an optimistic
//! version check (contrast with `postgres::PostgresRepository`, which relies
//! on `SERIALIZABLE` isolation and maps the resulting conflict to
//! `RepositoryError::Serialization`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::domain::{Conflict, ConflictId, RescheduleAttempt, Schedule, ScheduleId, UserId};
use crate::outbox::{OutboxMessage, PublishStatus};

use super::{
    ConflictRepository, FullRepository, OutboxRepository, RepositoryError, RepositoryResult,
    RescheduleAttemptRepository, ScheduleRepository,
};

#[derive(Default)]
pub struct InMemoryRepository {
    schedules: RwLock<HashMap<ScheduleId, Schedule>>,
    attempts: RwLock<Vec<RescheduleAttempt>>,
    conflicts: RwLock<HashMap<ConflictId, Conflict>>,
    outbox: RwLock<Vec<OutboxMessage>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleRepository for InMemoryRepository {
    async fn save(&self, schedule: &Schedule) -> RepositoryResult<()> {
        self.schedules.write().insert(schedule.id, schedule.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ScheduleId) -> RepositoryResult<Option<Schedule>> {
        Ok(self.schedules.read().get(&id).cloned())
    }

    async fn find_by_user_and_date(
        &self,
        user_id: UserId,
        date: DateTime<Utc>,
    ) -> RepositoryResult<Option<Schedule>> {
        let normalized = crate::domain::normalize_to_midnight(date);
        Ok(self
            .schedules
            .read()
            .values()
            .find(|s| s.user_id == user_id && s.date == normalized)
            .cloned())
    }

    async fn find_by_user_date_range(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Schedule>> {
        let mut out: Vec<Schedule> = self
            .schedules
            .read()
            .values()
            .filter(|s| s.user_id == user_id && s.date >= start && s.date < end)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.date);
        Ok(out)
    }

    async fn delete(&self, id: ScheduleId) -> RepositoryResult<()> {
        self.schedules
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found(format!("schedule {id} not found")))
    }
}

#[async_trait]
impl RescheduleAttemptRepository for InMemoryRepository {
    async fn create(&self, attempt: &RescheduleAttempt) -> RepositoryResult<()> {
        self.attempts.write().push(attempt.clone());
        Ok(())
    }

    async fn list_by_user_and_date(
        &self,
        user_id: UserId,
        date: DateTime<Utc>,
    ) -> RepositoryResult<Vec<RescheduleAttempt>> {
        let normalized = crate::domain::normalize_to_midnight(date);
        let schedules = self.schedules.read();
        let schedule_ids: Vec<ScheduleId> = schedules
            .values()
            .filter(|s| s.user_id == user_id && s.date == normalized)
            .map(|s| s.id)
            .collect();
        Ok(self
            .attempts
            .read()
            .iter()
            .filter(|a| schedule_ids.contains(&a.schedule_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ConflictRepository for InMemoryRepository {
    async fn save(&self, conflict: &Conflict) -> RepositoryResult<()> {
        self.conflicts.write().insert(conflict.id, conflict.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ConflictId) -> RepositoryResult<Option<Conflict>> {
        Ok(self.conflicts.read().get(&id).cloned())
    }

    async fn list_pending_by_user(&self, user_id: UserId) -> RepositoryResult<Vec<Conflict>> {
        Ok(self
            .conflicts
            .read()
            .values()
            .filter(|c| c.user_id == user_id && c.resolution == crate::domain::ConflictResolution::Pending)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OutboxRepository for InMemoryRepository {
    async fn append_batch(&self, messages: &[OutboxMessage]) -> RepositoryResult<()> {
        self.outbox.write().extend(messages.iter().cloned());
        Ok(())
    }

    async fn list_pending(&self, limit: usize) -> RepositoryResult<Vec<OutboxMessage>> {
        Ok(self
            .outbox
            .read()
            .iter()
            .filter(|m| m.publish_status == PublishStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FullRepository for InMemoryRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(true)
    }

    /// No separate transactions to coordinate here: the schedule write and
    /// the outbox write are both infallible `RwLock` insertions, so doing
    /// them one after another under `&self` already leaves no window where
    /// one is visible without the other having happened.
    async fn save_and_publish(
        &self,
        schedule: &Schedule,
        messages: &[OutboxMessage],
    ) -> RepositoryResult<()> {
        self.schedules.write().insert(schedule.id, schedule.clone());
        if !messages.is_empty() {
            self.outbox.write().extend(messages.iter().cloned());
        }
        Ok(())
    }

    async fn save_reschedule_results(
        &self,
        schedule: &Schedule,
        messages: &[OutboxMessage],
        attempts: &[RescheduleAttempt],
    ) -> RepositoryResult<()> {
        self.schedules.write().insert(schedule.id, schedule.clone());
        if !messages.is_empty() {
            self.outbox.write().extend(messages.iter().cloned());
        }
        if !attempts.is_empty() {
            self.attempts.write().extend(attempts.iter().cloned());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BlockType;
    use chrono::TimeZone;

    fn day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn save_and_find_by_user_and_date_roundtrips() {
        let repo = InMemoryRepository::new();
        let user_id = UserId::new();
        let mut schedule = Schedule::new(user_id, day(), day());
        schedule
            .add_block(BlockType::Task, None, "a".into(), day() + chrono::Duration::hours(9), day() + chrono::Duration::hours(10), &[], day())
            .unwrap();

        ScheduleRepository::save(&repo, &schedule).await.unwrap();

        let found = repo.find_by_user_and_date(user_id, day()).await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().blocks().len(), 1);
    }

    #[tokio::test]
    async fn delete_missing_schedule_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.delete(ScheduleId::new()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn outbox_append_is_listed_as_pending() {
        let repo = InMemoryRepository::new();
        let msg = OutboxMessage::from_domain_event(
            &crate::domain::DomainEvent::BlockCompleted {
                block_id: crate::domain::BlockId::new(),
                block_type: BlockType::Task,
                reference_id: None,
            },
            ScheduleId::new(),
            UserId::new(),
            uuid::Uuid::new_v4(),
            day(),
        );
        repo.append_batch(std::slice::from_ref(&msg)).await.unwrap();
        let pending = repo.list_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
    }
}
