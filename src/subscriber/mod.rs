//! Component G: reacts to upstream entity-created events by auto-scheduling
//! a single candidate. At-least-once delivery is assumed; the engine never
//! fails an event back to the consumer.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::collector::{CandidateCollector, HabitSource, MeetingSource, TaskSource};
use crate::config::{CommandDeadline, SchedulerConfig};
use crate::domain::UserId;
use crate::handlers::CommandHandlers;
use crate::repository::FullRepository;
use crate::scheduler::SchedulerEngine;

/// One of the three routing keys this subscriber reacts to (§4.G, §6).
#[derive(Clone)]
pub enum IncomingEvent {
    TaskCreated { task_id: String },
    HabitCreated { habit_id: String },
    MeetingCreated { meeting_id: String },
}

/// Process-wide kill switch: lets an operator disable auto-scheduling
/// without tearing down the subscription itself.
pub struct EventSubscriber<'a> {
    config: &'a SchedulerConfig,
    handlers: CommandHandlers<'a>,
    enabled: AtomicBool,
}

impl<'a> EventSubscriber<'a> {
    pub fn new(scheduler: &'a SchedulerEngine, config: &'a SchedulerConfig) -> Self {
        Self {
            config,
            handlers: CommandHandlers::new(scheduler, config),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Never returns an error: every failure is logged via `tracing::warn!`
    /// and swallowed, so the upstream consumer can always acknowledge.
    #[allow(clippy::too_many_arguments)]
    pub async fn handle(
        &self,
        repo: &dyn FullRepository,
        tasks: &dyn TaskSource,
        habits: &dyn HabitSource,
        meetings: &dyn MeetingSource,
        user_id: UserId,
        event: IncomingEvent,
        now: DateTime<Utc>,
    ) {
        if !self.is_enabled() {
            return;
        }

        if let Err(err) = self
            .try_handle(repo, tasks, habits, meetings, user_id, event.clone(), now)
            .await
        {
            warn!(?event, %err, "auto-schedule from subscriber event failed");
        }
    }

    async fn try_handle(
        &self,
        repo: &dyn FullRepository,
        tasks: &dyn TaskSource,
        habits: &dyn HabitSource,
        meetings: &dyn MeetingSource,
        user_id: UserId,
        event: IncomingEvent,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let collector = CandidateCollector::new(self.config);
        let date = crate::domain::normalize_to_midnight(now);

        let candidate = match event {
            IncomingEvent::TaskCreated { task_id } => {
                let Some(record) = tasks.get_task(&task_id).await? else {
                    return Ok(());
                };
                collector.task_candidate(date, record)
            }
            IncomingEvent::HabitCreated { habit_id } => {
                let Some(record) = habits.get_habit(&habit_id).await? else {
                    return Ok(());
                };
                collector.habit_candidate(record)
            }
            IncomingEvent::MeetingCreated { meeting_id } => {
                let Some(record) = meetings.get_meeting(&meeting_id).await? else {
                    return Ok(());
                };
                collector.meeting_candidate(date, record)
            }
        };

        self.handlers
            .auto_schedule(repo, user_id, date, vec![candidate], CommandDeadline::unbounded(), now)
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for IncomingEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncomingEvent::TaskCreated { task_id } => write!(f, "TaskCreated({task_id})"),
            IncomingEvent::HabitCreated { habit_id } => write!(f, "HabitCreated({habit_id})"),
            IncomingEvent::MeetingCreated { meeting_id } => write!(f, "MeetingCreated({meeting_id})"),
        }
    }
}
