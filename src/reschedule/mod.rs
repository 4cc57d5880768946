//! Component E: re-places blocks that were missed, one day at a time.

use chrono::{DateTime, Duration, Utc};

use crate::config::SchedulerConfig;
use crate::domain::{normalize_to_midnight, AttemptType, RescheduleAttempt, UserId};
use crate::repository::{FullRepository, RepositoryError};
use crate::scheduler::SchedulerEngine;

pub struct AutoRescheduleEngine<'a> {
    scheduler: &'a SchedulerEngine,
    config: &'a SchedulerConfig,
}

impl<'a> AutoRescheduleEngine<'a> {
    pub fn new(scheduler: &'a SchedulerEngine, config: &'a SchedulerConfig) -> Self {
        Self { scheduler, config }
    }

    /// §4.E. Loads the day's schedule (a no-op if there isn't one), collects
    /// blocks that are `missed AND NOT completed` ordered by their original
    /// `startTime`, and tries to place each one at the first open slot at or
    /// after `after` (defaulting to the start of the working day).
    pub async fn run(
        &self,
        repo: &dyn FullRepository,
        user_id: UserId,
        date: DateTime<Utc>,
        after: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Vec<RescheduleAttempt>, RepositoryError> {
        let Some(mut schedule) = repo.find_by_user_and_date(user_id, date).await? else {
            return Ok(Vec::new());
        };

        let day_start = normalize_to_midnight(date);
        let work_start = day_start + self.config.work_start();
        let work_end = day_start + self.config.work_end();
        let min_break = self.config.min_break_between();
        let slot_start = after.map(|a| a.max(work_start)).unwrap_or(work_start);

        let mut missed: Vec<_> = schedule
            .blocks()
            .iter()
            .filter(|b| b.missed && !b.completed)
            .cloned()
            .collect();
        missed.sort_by_key(|b| b.start_time);

        let mut attempts = Vec::with_capacity(missed.len());

        for block in missed {
            let required = block.duration() + min_break;
            let candidate = schedule
                .find_available_slots_excluding(Some(block.id), work_start, work_end, required)
                .into_iter()
                .find(|slot| slot.start >= slot_start);

            let Some(slot) = candidate else {
                attempts.push(RescheduleAttempt::failure(
                    user_id,
                    schedule.id,
                    block.id,
                    AttemptType::AutoMissed,
                    now,
                    block.start_time,
                    block.end_time,
                    "no available time slots",
                ));
                continue;
            };

            let mut new_start = slot.start;
            if min_break > Duration::zero() && new_start != day_start {
                new_start += min_break;
            }
            let new_end = new_start + block.duration();

            if new_end > slot.end {
                attempts.push(RescheduleAttempt::failure(
                    user_id,
                    schedule.id,
                    block.id,
                    AttemptType::AutoMissed,
                    now,
                    block.start_time,
                    block.end_time,
                    "candidate slot too short once the break is applied",
                ));
                continue;
            }

            match schedule.reschedule_block(block.id, new_start, new_end, &[], now) {
                Ok(_) => attempts.push(RescheduleAttempt::success(
                    user_id,
                    schedule.id,
                    block.id,
                    AttemptType::AutoMissed,
                    now,
                    block.start_time,
                    block.end_time,
                    new_start,
                    new_end,
                )),
                Err(err) => attempts.push(RescheduleAttempt::failure(
                    user_id,
                    schedule.id,
                    block.id,
                    AttemptType::AutoMissed,
                    now,
                    block.start_time,
                    block.end_time,
                    err.message(),
                )),
            }
        }

        let events = schedule.drain_events();
        let correlation_id = uuid::Uuid::new_v4();
        let messages: Vec<_> = events
            .iter()
            .map(|e| {
                crate::outbox::OutboxMessage::from_domain_event(
                    e,
                    schedule.id,
                    user_id,
                    correlation_id,
                    now,
                )
            })
            .collect();
        repo.save_reschedule_results(&schedule, &messages, &attempts).await?;

        Ok(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BlockType, Schedule};
    use crate::repository::ScheduleRepository;
    use chrono::TimeZone;

    fn day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn scenario_6_missed_block_is_rescheduled() {
        let repo = crate::repository::memory::InMemoryRepository::new();
        let user_id = UserId::new();
        let mut schedule = Schedule::new(user_id, day(), day());
        let block = schedule
            .add_block(
                BlockType::Task,
                None,
                "a".into(),
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

        let reloaded = repo.find_by_user_and_date(user_id, day()).await.unwrap().unwrap();
        assert!(!reloaded.blocks()[0].missed);
    }

    #[tokio::test]
    async fn scenario_7_no_slot_records_failure_and_block_stays_missed() {
        let repo = crate::repository::memory::InMemoryRepository::new();
        let user_id = UserId::new();
        let mut schedule = Schedule::new(user_id, day(), day());
        let missed_block = schedule
            .add_block(
                BlockType::Task,
                None,
                "a".into(),
                day() + Duration::hours(9),
                day() + Duration::hours(10),
                &[],
                day(),
            )
            .unwrap();
        schedule
            .add_block(
                BlockType::Meeting,
                None,
                "blocker".into(),
                day() + Duration::hours(10),
                day() + Duration::hours(17),
                &[],
                day(),
            )
            .unwrap();
        schedule.miss_block(missed_block.id, day()).unwrap();
        schedule.drain_events();
        repo.save(&schedule).await.unwrap();

        let scheduler = SchedulerEngine::new(SchedulerConfig::default());
        let config = SchedulerConfig::default();
        let engine = AutoRescheduleEngine::new(&scheduler, &config);

        let attempts = engine
            .run(&repo, user_id, day(), Some(day() + Duration::hours(9)), day())
            .await
            .unwrap();
        assert_eq!(attempts.len(), 1);
        assert!(!attempts[0].success);

        let reloaded = repo.find_by_user_and_date(user_id, day()).await.unwrap().unwrap();
        let block = reloaded
            .blocks()
            .iter()
            .find(|b| b.id == missed_block.id)
            .unwrap();
        assert!(block.missed);
    }
}
