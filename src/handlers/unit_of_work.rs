//! Per-command unit of work: load, mutate, persist, append outbox — honoring
//! the command's [`CommandDeadline`] at each suspension point (§5).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::CommandDeadline;
use crate::domain::{Schedule, UserId};
use crate::outbox::OutboxMessage;
use crate::repository::FullRepository;

use super::error::CommandError;

pub struct UnitOfWork<'a> {
    repo: &'a dyn FullRepository,
    deadline: CommandDeadline,
}

impl<'a> UnitOfWork<'a> {
    pub fn new(repo: &'a dyn FullRepository, deadline: CommandDeadline) -> Self {
        Self { repo, deadline }
    }

    fn check_deadline(&self) -> Result<(), CommandError> {
        if self.deadline.expired() {
            Err(CommandError::DeadlineExceeded)
        } else {
            Ok(())
        }
    }

    /// Loads the day's schedule, creating a fresh one in memory if absent.
    pub async fn load_or_create(
        &self,
        user_id: UserId,
        date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Schedule, CommandError> {
        self.check_deadline()?;
        match self.repo.find_by_user_and_date(user_id, date).await? {
            Some(schedule) => Ok(schedule),
            None => Ok(Schedule::new(user_id, date, now)),
        }
    }

    /// Loads the day's schedule; `None` if one hasn't been created yet.
    pub async fn load(
        &self,
        user_id: UserId,
        date: DateTime<Utc>,
    ) -> Result<Option<Schedule>, CommandError> {
        self.check_deadline()?;
        Ok(self.repo.find_by_user_and_date(user_id, date).await?)
    }

    /// Persists `schedule` and its drained events' outbox batch in one call
    /// to [`FullRepository::save_and_publish`] — P7: the batch written here
    /// always has exactly as many messages as events drained, and the two
    /// writes commit or roll back together rather than as two independent
    /// repository calls with a deadline check sitting between them. Returns
    /// the number of events committed.
    pub async fn commit(
        &self,
        schedule: &mut Schedule,
        now: DateTime<Utc>,
    ) -> Result<usize, CommandError> {
        self.check_deadline()?;
        let events = schedule.drain_events();
        let correlation_id = Uuid::new_v4();
        let messages: Vec<OutboxMessage> = events
            .iter()
            .map(|e| OutboxMessage::from_domain_event(e, schedule.id, schedule.user_id, correlation_id, now))
            .collect();
        debug_assert_eq!(events.len(), messages.len());
        self.repo.save_and_publish(schedule, &messages).await?;
        Ok(messages.len())
    }
}
