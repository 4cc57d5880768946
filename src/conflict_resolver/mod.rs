//! Component D: detects overlaps between stored schedules and an external
//! calendar, then resolves them per a configured strategy.

pub mod handler_adapter;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::config::{ConflictResolutionConfig, ResolutionStrategy};
use crate::domain::{
    normalize_to_midnight, detect_overlap, AlreadyResolvedError, Conflict, ConflictResolution,
    ConflictType, UserId,
};
use crate::outbox::OutboxMessage;
use crate::repository::{ConflictRepository, FullRepository, RepositoryError};
use crate::scheduler::SchedulerEngine;

pub use handler_adapter::{ConflictsPendingReview, HandlerAdapter};

/// One event on the user's external calendar. `is_orbita_event` marks
/// events this core itself wrote out, which detection skips.
#[derive(Debug, Clone)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_orbita_event: bool,
}

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error(transparent)]
    AlreadyResolved(#[from] AlreadyResolvedError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct ConflictResolver<'a> {
    scheduler: &'a SchedulerEngine,
    config: &'a ConflictResolutionConfig,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(scheduler: &'a SchedulerEngine, config: &'a ConflictResolutionConfig) -> Self {
        Self { scheduler, config }
    }

    /// §4.D detection: spans `[minStart, maxEnd]` in whole local days,
    /// loads each day's schedule if present, and emits a pending `overlap`
    /// [`Conflict`] for every `(block, event)` pair whose half-open
    /// intervals overlap. Orbita-origin events never participate.
    pub async fn detect(
        &self,
        repo: &dyn FullRepository,
        user_id: UserId,
        events: &[CalendarEvent],
        now: DateTime<Utc>,
    ) -> Result<Vec<Conflict>, RepositoryError> {
        let external: Vec<&CalendarEvent> = events.iter().filter(|e| !e.is_orbita_event).collect();
        if external.is_empty() {
            return Ok(Vec::new());
        }

        let min_start = external.iter().map(|e| e.start).min().unwrap();
        let max_end = external.iter().map(|e| e.end).max().unwrap();

        let mut conflicts = Vec::new();
        let mut day = normalize_to_midnight(min_start);
        let last_day = normalize_to_midnight(max_end);

        while day <= last_day {
            if let Some(schedule) = repo.find_by_user_and_date(user_id, day).await? {
                conflicts.extend(self.detect_in_schedule(&schedule, events, now));
            }
            day += Duration::days(1);
        }

        Ok(conflicts)
    }

    /// Same detection as [`detect`](Self::detect) but against an
    /// already-loaded `schedule` instead of fetching it from the
    /// repository — for callers (such as
    /// [`HandlerAdapter`](super::conflict_resolver::HandlerAdapter)) that
    /// already hold the Schedule and would otherwise pay a redundant
    /// round-trip to reload what they already have.
    pub fn detect_in_schedule(
        &self,
        schedule: &crate::domain::Schedule,
        events: &[CalendarEvent],
        now: DateTime<Utc>,
    ) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        for event in events.iter().filter(|e| !e.is_orbita_event) {
            for block in schedule.blocks() {
                if detect_overlap(block.start_time, block.end_time, event.start, event.end) {
                    conflicts.push(Conflict::new_pending(
                        schedule.user_id,
                        ConflictType::Overlap,
                        block.id,
                        block.start_time,
                        block.end_time,
                        event.id.clone(),
                        event.start,
                        event.end,
                        now,
                    ));
                }
            }
        }
        conflicts
    }

    /// §4.D resolution. Mutates `conflict` in place and persists both it and
    /// any schedule it touches; never leaves a conflict `pending` after a
    /// partially-applied move — on any failure the conflict is left exactly
    /// as it was and the failure is logged.
    pub async fn resolve(
        &self,
        repo: &dyn FullRepository,
        conflict: &mut Conflict,
        now: DateTime<Utc>,
    ) -> Result<(), ResolverError> {
        match self.config.strategy {
            ResolutionStrategy::OrbitaWins => {
                conflict.resolve(ConflictResolution::Kept, now)?;
            }
            ResolutionStrategy::Manual => {
                // Already pending by construction; nothing to transition.
            }
            ResolutionStrategy::ExternalWins => {
                self.try_reschedule_orbita_block(repo, conflict, now).await;
            }
            ResolutionStrategy::TimeFirst => {
                // Records intent only: whichever side started first keeps
                // its slot. An actual move for the "external wins" half of
                // this decision reuses the external_wins machinery.
                if conflict.orbita_block_start <= conflict.external_start {
                    conflict.resolve(ConflictResolution::Kept, now)?;
                } else {
                    self.try_reschedule_orbita_block(repo, conflict, now).await;
                }
            }
        }

        ConflictRepository::save(repo, conflict).await?;
        Ok(())
    }

    /// Loads the schedule owning `conflict.orbitaBlockId`, finds a new slot
    /// for it, and reschedules — or logs why it couldn't and leaves the
    /// conflict `pending`.
    async fn try_reschedule_orbita_block(
        &self,
        repo: &dyn FullRepository,
        conflict: &mut Conflict,
        now: DateTime<Utc>,
    ) {
        let Ok(Some(mut schedule)) = repo
            .find_by_user_and_date(conflict.user_id, conflict.orbita_block_start)
            .await
        else {
            warn!(conflict_id = %conflict.id, "schedule missing for conflicting block");
            return;
        };

        let Some(block) = schedule
            .blocks()
            .iter()
            .find(|b| b.id == conflict.orbita_block_id)
            .cloned()
        else {
            warn!(conflict_id = %conflict.id, "orbita block missing from schedule");
            return;
        };

        let duration = block.duration();
        let slot = match self.scheduler.find_optimal_slot(&schedule, duration, None) {
            Ok(slot) => slot,
            Err(err) => {
                warn!(conflict_id = %conflict.id, %err, "no slot available for conflicting block");
                return;
            }
        };

        if let Err(err) = schedule.reschedule_block(block.id, slot.start, slot.start + duration, &[], now) {
            warn!(conflict_id = %conflict.id, %err, "failed to reschedule conflicting block");
            return;
        }

        let events = schedule.drain_events();
        let correlation_id = Uuid::new_v4();
        let messages: Vec<OutboxMessage> = events
            .iter()
            .map(|e| OutboxMessage::from_domain_event(e, schedule.id, conflict.user_id, correlation_id, now))
            .collect();
        if let Err(err) = repo.save_and_publish(&schedule, &messages).await {
            warn!(conflict_id = %conflict.id, %err, "failed to save rescheduled conflicting block");
            return;
        }

        if let Err(err) = conflict.resolve(ConflictResolution::Rescheduled, now) {
            warn!(conflict_id = %conflict.id, %err, "conflict already resolved");
        }
    }
}
