//! Component H: repository contracts plus reference implementations.
//!
//! `memory` (always available, the default) is the in-memory reference
//! implementation grounded on the teacher's `LocalRepository`. `postgres`
//! (feature `postgres-repo`) is a second reference implementation against a
//! real schema, demonstrating the full-replace-on-save persistence shape of
//! §6 with Diesel, mirroring the teacher's `local-repo`/`postgres-repo`
//! feature split.

pub mod error;
pub mod memory;
#[cfg(feature = "postgres-repo")]
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Conflict, ConflictId, RescheduleAttempt, Schedule, ScheduleId, UserId};
use crate::outbox::OutboxMessage;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

/// Upsert-and-replace-blocks in one transaction; `find_*` return `None` when
/// absent rather than erroring, matching §6's persistence shape.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn save(&self, schedule: &Schedule) -> RepositoryResult<()>;
    async fn find_by_id(&self, id: ScheduleId) -> RepositoryResult<Option<Schedule>>;
    async fn find_by_user_and_date(
        &self,
        user_id: UserId,
        date: DateTime<Utc>,
    ) -> RepositoryResult<Option<Schedule>>;
    async fn find_by_user_date_range(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Schedule>>;
    async fn delete(&self, id: ScheduleId) -> RepositoryResult<()>;
}

/// Append-only (§6).
#[async_trait]
pub trait RescheduleAttemptRepository: Send + Sync {
    async fn create(&self, attempt: &RescheduleAttempt) -> RepositoryResult<()>;
    async fn list_by_user_and_date(
        &self,
        user_id: UserId,
        date: DateTime<Utc>,
    ) -> RepositoryResult<Vec<RescheduleAttempt>>;
}

#[async_trait]
pub trait ConflictRepository: Send + Sync {
    async fn save(&self, conflict: &Conflict) -> RepositoryResult<()>;
    async fn find_by_id(&self, id: ConflictId) -> RepositoryResult<Option<Conflict>>;
    async fn list_pending_by_user(&self, user_id: UserId) -> RepositoryResult<Vec<Conflict>>;
}

/// Write-only from the core's perspective (§5): publication, retry and
/// dead-letter handling belong to an external worker.
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    async fn append_batch(&self, messages: &[OutboxMessage]) -> RepositoryResult<()>;
    async fn list_pending(&self, limit: usize) -> RepositoryResult<Vec<OutboxMessage>>;
}

/// The combined contract a command handler depends on, matching the
/// teacher's `FullRepository` umbrella trait.
///
/// `save_and_publish`/`save_reschedule_results` exist because `save` and
/// `append_batch`/`create` each open their own transaction (§4.H note: no
/// trait method here accepts an ambient transaction handle). A unit of work
/// that called them as two separate statements could durably persist a
/// schedule mutation and then lose its outbox batch to an unrelated failure
/// in between, with nothing to roll back. These two methods give
/// implementations one call spanning everything that must commit or fail
/// together; each backend decides how (one shared `SERIALIZABLE`
/// transaction for Postgres, one critical section for the in-memory store).
#[async_trait]
pub trait FullRepository:
    ScheduleRepository + RescheduleAttemptRepository + ConflictRepository + OutboxRepository
{
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Persists `schedule` and appends `messages` to the outbox atomically
    /// (§4.F, §4.H, §9). `messages` may be empty when a command produced no
    /// domain events; the schedule write still happens.
    async fn save_and_publish(
        &self,
        schedule: &Schedule,
        messages: &[OutboxMessage],
    ) -> RepositoryResult<()>;

    /// Persists a rescheduled `schedule`, its outbox batch, and every
    /// [`RescheduleAttempt`] recorded for the run, atomically (§4.E, §4.H,
    /// §9).
    async fn save_reschedule_results(
        &self,
        schedule: &Schedule,
        messages: &[OutboxMessage],
        attempts: &[RescheduleAttempt],
    ) -> RepositoryResult<()>;
}
