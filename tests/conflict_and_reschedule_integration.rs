//! Cross-module coverage for the conflict resolver, handler adapter, and
//! auto-reschedule engine against the in-memory repository.

use chrono::{DateTime, Duration, TimeZone, Utc};

use scheduling_core::config::{ConflictResolutionConfig, ResolutionStrategy, SchedulerConfig};
use scheduling_core::conflict_resolver::{CalendarEvent, ConflictResolver, HandlerAdapter};
use scheduling_core::domain::{BlockType, ConflictResolution, Schedule, UserId};
use scheduling_core::handlers::QueryHandlers;
use scheduling_core::repository::memory::InMemoryRepository;
use scheduling_core::repository::{OutboxRepository, ScheduleRepository};
use scheduling_core::reschedule::AutoRescheduleEngine;
use scheduling_core::scheduler::SchedulerEngine;

fn day() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap()
}

#[tokio::test]
async fn external_wins_moves_the_orbita_block_and_appends_one_outbox_message() {
    let repo = InMemoryRepository::new();
    let user_id = UserId::new();

    let mut schedule = Schedule::new(user_id, day(), day());
    schedule
        .add_block(
            BlockType::Task,
            None,
            "focus".into(),
            day() + Duration::hours(10),
            day() + Duration::hours(11),
            &[],
            day(),
        )
        .unwrap();
    schedule.drain_events();
    repo.save(&schedule).await.unwrap();

    let scheduler = SchedulerEngine::new(SchedulerConfig::default());
    let config = ConflictResolutionConfig {
        strategy: ResolutionStrategy::ExternalWins,
    };
    let resolver = ConflictResolver::new(&scheduler, &config);
    let adapter = HandlerAdapter::new(ConflictResolver::new(&scheduler, &config));

    let event = CalendarEvent {
        id: "doctor".into(),
        summary: "doctor".into(),
        start: day() + Duration::hours(10) + Duration::minutes(30),
        end: day() + Duration::hours(11) + Duration::minutes(30),
        is_orbita_event: false,
    };

    let outcome = adapter
        .handle_event(&repo, user_id, event, day())
        .await
        .unwrap();
    assert!(outcome.is_none(), "external_wins always resolves, never leaves pending");

    let updated = QueryHandlers::get_schedule(&repo, user_id, day())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.blocks().len(), 1);
    assert_ne!(updated.blocks()[0].start_time, day() + Duration::hours(10));

    let outbox = repo.list_pending(10).await.unwrap();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].routing_key, "scheduling.block.rescheduled");

    let _ = resolver;
}

#[tokio::test]
async fn auto_reschedule_after_conflict_resolution_places_the_missed_block() {
    let repo = InMemoryRepository::new();
    let user_id = UserId::new();

    let mut schedule = Schedule::new(user_id, day(), day());
    let block = schedule
        .add_block(
            BlockType::Task,
            None,
            "deep work".into(),
            day() + Duration::hours(9),
            day() + Duration::hours(10),
            &[],
            day(),
        )
        .unwrap();
    schedule.miss_block(block.id, day()).unwrap();
    schedule.drain_events();
    repo.save(&schedule).await.unwrap();

    let scheduler = SchedulerEngine::new(SchedulerConfig::default());
    let config = SchedulerConfig::default();
    let engine = AutoRescheduleEngine::new(&scheduler, &config);

    let attempts = engine.run(&repo, user_id, day(), None, day()).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].success);

    let recorded = QueryHandlers::list_reschedule_attempts(&repo, user_id, day())
        .await
        .unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].block_id, block.id);

    let updated = QueryHandlers::get_schedule(&repo, user_id, day())
        .await
        .unwrap()
        .unwrap();
    assert!(!updated.blocks()[0].missed);
}

#[tokio::test]
async fn orbita_wins_resolution_is_idempotent_on_a_second_call() {
    let repo = InMemoryRepository::new();
    let scheduler = SchedulerEngine::new(SchedulerConfig::default());
    let config = ConflictResolutionConfig {
        strategy: ResolutionStrategy::OrbitaWins,
    };
    let resolver = ConflictResolver::new(&scheduler, &config);

    let mut conflict = scheduling_core::domain::Conflict::new_pending(
        UserId::new(),
        scheduling_core::domain::ConflictType::Overlap,
        scheduling_core::domain::BlockId::new(),
        day() + Duration::hours(10),
        day() + Duration::hours(11),
        "ext-1".into(),
        day() + Duration::hours(10) + Duration::minutes(30),
        day() + Duration::hours(11) + Duration::minutes(30),
        day(),
    );

    resolver.resolve(&repo, &mut conflict, day()).await.unwrap();
    assert_eq!(conflict.resolution, ConflictResolution::Kept);

    let err = resolver.resolve(&repo, &mut conflict, day()).await;
    assert!(err.is_err(), "resolving an already-resolved conflict must not silently re-apply");
}
