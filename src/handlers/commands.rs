//! Component F command handlers: one unit of work per command, wired to
//! Components B (scheduler) and C (collector).

use chrono::{DateTime, Utc};

use crate::collector::{CandidateCollector, HabitSource, MeetingSource, TaskSource};
use crate::config::{CommandDeadline, SchedulerConfig};
use crate::domain::{BlockType, Constraint, RescheduleAttempt, TimeBlock, UserId};
use crate::repository::FullRepository;
use crate::reschedule::AutoRescheduleEngine;
use crate::scheduler::{PlacementResult, SchedulableTask, SchedulerEngine};

use super::error::CommandError;
use super::unit_of_work::UnitOfWork;

pub struct CommandHandlers<'a> {
    scheduler: &'a SchedulerEngine,
    config: &'a SchedulerConfig,
}

impl<'a> CommandHandlers<'a> {
    pub fn new(scheduler: &'a SchedulerEngine, config: &'a SchedulerConfig) -> Self {
        Self { scheduler, config }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn add_block(
        &self,
        repo: &dyn FullRepository,
        user_id: UserId,
        date: DateTime<Utc>,
        block_type: BlockType,
        reference_id: Option<String>,
        title: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        extra_constraints: &[Constraint],
        deadline: CommandDeadline,
        now: DateTime<Utc>,
    ) -> Result<TimeBlock, CommandError> {
        let uow = UnitOfWork::new(repo, deadline);
        let mut schedule = uow.load_or_create(user_id, date, now).await?;
        let block = schedule.add_block(block_type, reference_id, title, start, end, extra_constraints, now)?;
        uow.commit(&mut schedule, now).await?;
        Ok(block)
    }

    pub async fn remove_block(
        &self,
        repo: &dyn FullRepository,
        user_id: UserId,
        date: DateTime<Utc>,
        block_id: crate::domain::BlockId,
        deadline: CommandDeadline,
        now: DateTime<Utc>,
    ) -> Result<TimeBlock, CommandError> {
        let uow = UnitOfWork::new(repo, deadline);
        let mut schedule = uow.load(user_id, date).await?.ok_or(CommandError::ScheduleNotFound)?;
        let removed = schedule.remove_block(block_id, now)?;
        uow.commit(&mut schedule, now).await?;
        Ok(removed)
    }

    pub async fn complete_block(
        &self,
        repo: &dyn FullRepository,
        user_id: UserId,
        date: DateTime<Utc>,
        block_id: crate::domain::BlockId,
        deadline: CommandDeadline,
        now: DateTime<Utc>,
    ) -> Result<(), CommandError> {
        let uow = UnitOfWork::new(repo, deadline);
        let mut schedule = uow.load(user_id, date).await?.ok_or(CommandError::ScheduleNotFound)?;
        schedule.complete_block(block_id, now)?;
        uow.commit(&mut schedule, now).await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn reschedule_block(
        &self,
        repo: &dyn FullRepository,
        user_id: UserId,
        date: DateTime<Utc>,
        block_id: crate::domain::BlockId,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
        extra_constraints: &[Constraint],
        deadline: CommandDeadline,
        now: DateTime<Utc>,
    ) -> Result<TimeBlock, CommandError> {
        let uow = UnitOfWork::new(repo, deadline);
        let mut schedule = uow.load(user_id, date).await?.ok_or(CommandError::ScheduleNotFound)?;
        let updated = schedule.reschedule_block(block_id, new_start, new_end, extra_constraints, now)?;
        uow.commit(&mut schedule, now).await?;
        Ok(updated)
    }

    pub async fn auto_schedule(
        &self,
        repo: &dyn FullRepository,
        user_id: UserId,
        date: DateTime<Utc>,
        tasks: Vec<SchedulableTask>,
        deadline: CommandDeadline,
        now: DateTime<Utc>,
    ) -> Result<Vec<PlacementResult>, CommandError> {
        let uow = UnitOfWork::new(repo, deadline);
        let mut schedule = uow.load_or_create(user_id, date, now).await?;
        let results = self.scheduler.auto_schedule(&mut schedule, tasks, now);
        uow.commit(&mut schedule, now).await?;
        Ok(results)
    }

    /// §4.C + §4.B combined: collect candidates from the three sources, then
    /// run the same placement path as [`auto_schedule`](Self::auto_schedule).
    #[allow(clippy::too_many_arguments)]
    pub async fn schedule_day(
        &self,
        repo: &dyn FullRepository,
        user_id: UserId,
        date: DateTime<Utc>,
        tasks: &dyn TaskSource,
        habits: &dyn HabitSource,
        meetings: &dyn MeetingSource,
        deadline: CommandDeadline,
        now: DateTime<Utc>,
    ) -> Result<Vec<PlacementResult>, CommandError> {
        let collector = CandidateCollector::new(self.config);
        let candidates = collector.collect(user_id, date, tasks, habits, meetings).await?;
        self.auto_schedule(repo, user_id, date, candidates, deadline, now).await
    }

    /// Thin wrapper over Component E — which persists and publishes itself,
    /// outside this command's unit of work.
    pub async fn auto_reschedule(
        &self,
        repo: &dyn FullRepository,
        engine: &AutoRescheduleEngine<'_>,
        user_id: UserId,
        date: DateTime<Utc>,
        after: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Vec<RescheduleAttempt>, CommandError> {
        Ok(engine.run(repo, user_id, date, after, now).await?)
    }
}
