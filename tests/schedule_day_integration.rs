//! End-to-end: collector → scheduler → handlers → repository → outbox.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use scheduling_core::collector::sources::{HabitRecord, MeetingRecord, PreferredTime, TaskPriority, TaskRecord};
use scheduling_core::collector::{HabitSource, MeetingSource, TaskSource};
use scheduling_core::config::{CommandDeadline, SchedulerConfig};
use scheduling_core::domain::UserId;
use scheduling_core::handlers::{CommandHandlers, QueryHandlers};
use scheduling_core::repository::memory::InMemoryRepository;
use scheduling_core::repository::OutboxRepository;
use scheduling_core::scheduler::SchedulerEngine;

fn day() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap()
}

struct FixedTasks(Vec<TaskRecord>);
#[async_trait]
impl TaskSource for FixedTasks {
    async fn pending_tasks(&self, _user_id: UserId) -> anyhow::Result<Vec<TaskRecord>> {
        Ok(self.0.clone())
    }
    async fn get_task(&self, id: &str) -> anyhow::Result<Option<TaskRecord>> {
        Ok(self.0.iter().find(|t| t.id == id).cloned())
    }
}

struct FixedHabits(Vec<HabitRecord>);
#[async_trait]
impl HabitSource for FixedHabits {
    async fn due_today(&self, _u: UserId, _d: DateTime<Utc>) -> anyhow::Result<Vec<HabitRecord>> {
        Ok(self.0.clone())
    }
    async fn get_habit(&self, id: &str) -> anyhow::Result<Option<HabitRecord>> {
        Ok(self.0.iter().find(|h| h.id == id).cloned())
    }
}

struct FixedMeetings(Vec<MeetingRecord>);
#[async_trait]
impl MeetingSource for FixedMeetings {
    async fn occurring_on(&self, _u: UserId, _d: DateTime<Utc>) -> anyhow::Result<Vec<MeetingRecord>> {
        Ok(self.0.clone())
    }
    async fn get_meeting(&self, id: &str) -> anyhow::Result<Option<MeetingRecord>> {
        Ok(self.0.iter().find(|m| m.id == id).cloned())
    }
}

#[tokio::test]
async fn schedule_day_places_tasks_habits_and_meetings_without_overlap() {
    let repo = InMemoryRepository::new();
    let scheduler = SchedulerEngine::new(SchedulerConfig::default());
    let config = SchedulerConfig::default();
    let handlers = CommandHandlers::new(&scheduler, &config);
    let user_id = UserId::new();

    let tasks = FixedTasks(vec![TaskRecord {
        id: "task-1".into(),
        title: "write report".into(),
        completed: false,
        due_date: Some(day()),
        duration_minutes: Some(45),
        priority: TaskPriority::Urgent,
    }]);
    let habits = FixedHabits(vec![HabitRecord {
        id: "habit-1".into(),
        title: "stretch".into(),
        duration_minutes: None,
        preferred_time: PreferredTime::Morning,
    }]);
    let meetings = FixedMeetings(vec![MeetingRecord {
        id: "meeting-1".into(),
        title: "standup".into(),
        duration_minutes: Some(15),
        preferred_hour: Some(10),
    }]);

    let results = handlers
        .schedule_day(
            &repo,
            user_id,
            day(),
            &tasks,
            &habits,
            &meetings,
            CommandDeadline::unbounded(),
            day(),
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.scheduled));

    let schedule = QueryHandlers::get_schedule(&repo, user_id, day())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(schedule.blocks().len(), 3);
    for pair in schedule.blocks().windows(2) {
        assert!(pair[0].end_time <= pair[1].start_time);
    }

    let outbox = repo.list_pending(10).await.unwrap();
    assert_eq!(outbox.len(), 3);
}

#[tokio::test]
async fn schedule_day_reports_failure_when_task_cannot_fit() {
    let repo = InMemoryRepository::new();
    let scheduler = SchedulerEngine::new(SchedulerConfig::default());
    let config = SchedulerConfig::default();
    let handlers = CommandHandlers::new(&scheduler, &config);
    let user_id = UserId::new();

    // Fill the entire working day with one meeting.
    let meetings = FixedMeetings(vec![MeetingRecord {
        id: "all-day".into(),
        title: "offsite".into(),
        duration_minutes: Some(470),
        preferred_hour: None,
    }]);
    let tasks = FixedTasks(vec![TaskRecord {
        id: "task-1".into(),
        title: "squeeze me in".into(),
        completed: false,
        due_date: None,
        duration_minutes: Some(30),
        priority: TaskPriority::Medium,
    }]);

    let results = handlers
        .schedule_day(
            &repo,
            user_id,
            day(),
            &tasks,
            &FixedHabits(vec![]),
            &meetings,
            CommandDeadline::unbounded(),
            day(),
        )
        .await
        .unwrap();

    let task_result = results.iter().find(|r| r.task_id == "task-1").unwrap();
    assert!(!task_result.scheduled);
    assert_eq!(task_result.reason.as_deref(), Some("no available time slots"));
}
