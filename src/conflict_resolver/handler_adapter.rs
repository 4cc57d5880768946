//! Wraps [`ConflictResolver`](super::ConflictResolver) for invocation by an
//! external calendar-import worker, one event at a time.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Schedule, UserId};
use crate::repository::FullRepository;

use super::{CalendarEvent, ConflictResolver, ResolverError};

/// Returned when resolution leaves one or more conflicts `pending` — the
/// caller decides whether to surface them to the user or retry later.
#[derive(Debug, Error)]
#[error("{count} conflict(s) pending review")]
pub struct ConflictsPendingReview {
    pub count: usize,
}

pub struct HandlerAdapter<'a> {
    resolver: ConflictResolver<'a>,
}

impl<'a> HandlerAdapter<'a> {
    pub fn new(resolver: ConflictResolver<'a>) -> Self {
        Self { resolver }
    }

    /// Processes one external-calendar event for `user_id`. Skips it
    /// outright if it's an Orbita-origin event. Returns
    /// `Ok(Some(ConflictsPendingReview))` if any detected conflict is still
    /// `pending` after resolution, `Ok(None)` otherwise.
    pub async fn handle_event(
        &self,
        repo: &dyn FullRepository,
        user_id: UserId,
        event: CalendarEvent,
        now: DateTime<Utc>,
    ) -> Result<Option<ConflictsPendingReview>, ResolverError> {
        if event.is_orbita_event {
            return Ok(None);
        }

        let mut conflicts = self.resolver.detect(repo, user_id, &[event], now).await?;

        let mut pending = 0usize;
        for conflict in &mut conflicts {
            self.resolver.resolve(repo, conflict, now).await?;
            if conflict.resolution == crate::domain::ConflictResolution::Pending {
                pending += 1;
            }
        }

        if pending > 0 {
            Ok(Some(ConflictsPendingReview { count: pending }))
        } else {
            Ok(None)
        }
    }

    /// Same as [`handle_event`](Self::handle_event), but for a caller that
    /// already holds the day's `schedule` — §4.D allows detection either
    /// "from an already-loaded Schedule passed in or supplied directly via
    /// a user-addressed variant", and this is the former: it skips the
    /// repository fetch `handle_event` performs internally.
    pub async fn handle_event_for_schedule(
        &self,
        repo: &dyn FullRepository,
        schedule: &Schedule,
        event: CalendarEvent,
        now: DateTime<Utc>,
    ) -> Result<Option<ConflictsPendingReview>, ResolverError> {
        if event.is_orbita_event {
            return Ok(None);
        }

        let mut conflicts = self.resolver.detect_in_schedule(schedule, &[event], now);

        let mut pending = 0usize;
        for conflict in &mut conflicts {
            self.resolver.resolve(repo, conflict, now).await?;
            if conflict.resolution == crate::domain::ConflictResolution::Pending {
                pending += 1;
            }
        }

        if pending > 0 {
            Ok(Some(ConflictsPendingReview { count: pending }))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConflictResolutionConfig, ResolutionStrategy};
    use crate::domain::{BlockType, Schedule};
    use crate::repository::ScheduleRepository;
    use crate::scheduler::SchedulerEngine;
    use chrono::{Duration, TimeZone};

    fn day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn orbita_origin_events_are_skipped_entirely() {
        let repo = crate::repository::memory::InMemoryRepository::new();
        let scheduler = SchedulerEngine::new(crate::config::SchedulerConfig::default());
        let config = ConflictResolutionConfig {
            strategy: ResolutionStrategy::Manual,
        };
        let adapter = HandlerAdapter::new(ConflictResolver::new(&scheduler, &config));

        let event = CalendarEvent {
            id: "self-written".into(),
            summary: "focus block".into(),
            start: day() + Duration::hours(9),
            end: day() + Duration::hours(10),
            is_orbita_event: true,
        };

        let result = adapter
            .handle_event(&repo, UserId::new(), event, day())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn manual_strategy_leaves_conflict_pending_and_reports_it() {
        let repo = crate::repository::memory::InMemoryRepository::new();
        let user_id = UserId::new();
        let mut schedule = Schedule::new(user_id, day(), day());
        schedule
            .add_block(
                BlockType::Task,
                None,
                "a".into(),
                day() + Duration::hours(10),
                day() + Duration::hours(11),
                &[],
                day(),
            )
            .unwrap();
        schedule.drain_events();
        repo.save(&schedule).await.unwrap();

        let scheduler = SchedulerEngine::new(crate::config::SchedulerConfig::default());
        let config = ConflictResolutionConfig {
            strategy: ResolutionStrategy::Manual,
        };
        let adapter = HandlerAdapter::new(ConflictResolver::new(&scheduler, &config));

        let event = CalendarEvent {
            id: "ext-1".into(),
            summary: "doctor".into(),
            start: day() + Duration::hours(10) + Duration::minutes(30),
            end: day() + Duration::hours(11) + Duration::minutes(30),
            is_orbita_event: false,
        };

        let result = adapter
            .handle_event(&repo, user_id, event, day())
            .await
            .unwrap();
        assert!(matches!(result, Some(ConflictsPendingReview { count: 1 })));
    }

    #[tokio::test]
    async fn handle_event_for_schedule_detects_without_a_repository_fetch() {
        let repo = crate::repository::memory::InMemoryRepository::new();
        let user_id = UserId::new();
        let mut schedule = Schedule::new(user_id, day(), day());
        schedule
            .add_block(
                BlockType::Task,
                None,
                "a".into(),
                day() + Duration::hours(10),
                day() + Duration::hours(11),
                &[],
                day(),
            )
            .unwrap();
        schedule.drain_events();
        // Deliberately not saved to the repository: handle_event_for_schedule
        // must not need to fetch it.

        let scheduler = SchedulerEngine::new(crate::config::SchedulerConfig::default());
        let config = ConflictResolutionConfig {
            strategy: ResolutionStrategy::Manual,
        };
        let adapter = HandlerAdapter::new(ConflictResolver::new(&scheduler, &config));

        let event = CalendarEvent {
            id: "ext-1".into(),
            summary: "doctor".into(),
            start: day() + Duration::hours(10) + Duration::minutes(30),
            end: day() + Duration::hours(11) + Duration::minutes(30),
            is_orbita_event: false,
        };

        let result = adapter
            .handle_event_for_schedule(&repo, &schedule, event, day())
            .await
            .unwrap();
        assert!(matches!(result, Some(ConflictsPendingReview { count: 1 })));
    }
}
