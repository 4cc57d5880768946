//! Component C: pulls schedulable items from task/habit/meeting sources for
//! `(userId, date)` and attaches per-candidate constraints.

pub mod sources;

use chrono::{DateTime, Duration, Utc};

use crate::config::SchedulerConfig;
use crate::domain::{BlockType, Constraint, ConstraintKind};
use crate::domain::UserId;
use crate::scheduler::SchedulableTask;

pub use sources::{HabitSource, MeetingSource, PreferredTime, TaskPriority, TaskSource};

pub struct CandidateCollector<'a> {
    config: &'a SchedulerConfig,
}

impl<'a> CandidateCollector<'a> {
    pub fn new(config: &'a SchedulerConfig) -> Self {
        Self { config }
    }

    /// Candidates are concatenated tasks -> habits -> meetings; the
    /// scheduler re-sorts by its own ordering.
    pub async fn collect(
        &self,
        user_id: UserId,
        date: DateTime<Utc>,
        tasks: &dyn TaskSource,
        habits: &dyn HabitSource,
        meetings: &dyn MeetingSource,
    ) -> anyhow::Result<Vec<SchedulableTask>> {
        let mut candidates = Vec::new();
        candidates.extend(self.collect_tasks(user_id, date, tasks).await?);
        candidates.extend(self.collect_habits(user_id, date, habits).await?);
        candidates.extend(self.collect_meetings(user_id, date, meetings).await?);
        Ok(candidates)
    }

    async fn collect_tasks(
        &self,
        user_id: UserId,
        date: DateTime<Utc>,
        source: &dyn TaskSource,
    ) -> anyhow::Result<Vec<SchedulableTask>> {
        let records = source.pending_tasks(user_id).await?;
        let out = records
            .into_iter()
            .filter(|t| !t.completed)
            .filter(|t| match t.due_date {
                Some(due) => due.date_naive() >= date.date_naive(),
                None => true,
            })
            .map(|t| self.task_candidate(date, t))
            .collect();
        Ok(out)
    }

    async fn collect_habits(
        &self,
        user_id: UserId,
        date: DateTime<Utc>,
        source: &dyn HabitSource,
    ) -> anyhow::Result<Vec<SchedulableTask>> {
        let records = source.due_today(user_id, date).await?;
        Ok(records.into_iter().map(|h| self.habit_candidate(h)).collect())
    }

    async fn collect_meetings(
        &self,
        user_id: UserId,
        date: DateTime<Utc>,
        source: &dyn MeetingSource,
    ) -> anyhow::Result<Vec<SchedulableTask>> {
        let records = source.occurring_on(user_id, date).await?;
        Ok(records
            .into_iter()
            .map(|m| self.meeting_candidate(date, m))
            .collect())
    }

    /// §4.C task defaults — also used directly by the event subscriber
    /// (§4.G) to convert a single just-created task.
    pub(crate) fn task_candidate(&self, date: DateTime<Utc>, t: sources::TaskRecord) -> SchedulableTask {
        let duration = Duration::minutes(
            t.duration_minutes
                .unwrap_or(self.config.task_defaults.duration_minutes),
        );
        let mut constraints = Vec::new();
        if let Some(due) = t.due_date {
            if due.date_naive() == date.date_naive() {
                constraints.push(Constraint::TimeRange {
                    kind: ConstraintKind::Hard,
                    range_start_hour: 9,
                    range_end_hour: 17,
                    penalty: self.config.task_defaults.same_day_due_penalty,
                });
            }
        }
        SchedulableTask {
            id: t.id,
            title: t.title,
            priority: t.priority.as_numeric(),
            duration,
            due_date: t.due_date,
            constraints,
            block_type: BlockType::Task,
        }
    }

    pub(crate) fn habit_candidate(&self, h: sources::HabitRecord) -> SchedulableTask {
        let duration = Duration::minutes(
            h.duration_minutes
                .unwrap_or(self.config.habit_defaults.duration_minutes),
        );
        let constraints = match h.preferred_time.hour_window() {
            Some((start, end)) => vec![Constraint::TimeRange {
                kind: ConstraintKind::Soft,
                range_start_hour: start,
                range_end_hour: end,
                penalty: self.config.habit_defaults.preferred_time_penalty,
            }],
            None => Vec::new(),
        };
        SchedulableTask {
            id: h.id,
            title: h.title,
            priority: self.config.habit_defaults.priority,
            duration,
            due_date: None,
            constraints,
            block_type: BlockType::Habit,
        }
    }

    pub(crate) fn meeting_candidate(&self, date: DateTime<Utc>, m: sources::MeetingRecord) -> SchedulableTask {
        let duration_minutes = m
            .duration_minutes
            .unwrap_or(self.config.meeting_defaults.duration_minutes);
        let duration = Duration::minutes(duration_minutes);

        let constraints = match m.preferred_hour {
            Some(start_hour) => {
                let duration_hours = (duration_minutes as f64 / 60.0).ceil() as u32;
                let end_hour = (start_hour + duration_hours + 1).min(17);
                vec![Constraint::TimeRange {
                    kind: ConstraintKind::Soft,
                    range_start_hour: start_hour,
                    range_end_hour: end_hour,
                    penalty: self.config.meeting_defaults.preferred_time_penalty,
                }]
            }
            None => Vec::new(),
        };

        SchedulableTask {
            id: m.id,
            title: m.title,
            priority: self.config.meeting_defaults.priority,
            duration,
            due_date: Some(date),
            constraints,
            block_type: BlockType::Meeting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedTasks(Vec<sources::TaskRecord>);
    #[async_trait]
    impl TaskSource for FixedTasks {
        async fn pending_tasks(&self, _user_id: UserId) -> anyhow::Result<Vec<sources::TaskRecord>> {
            Ok(self.0.clone())
        }

        async fn get_task(&self, id: &str) -> anyhow::Result<Option<sources::TaskRecord>> {
            Ok(self.0.iter().find(|t| t.id == id).cloned())
        }
    }

    struct NoHabits;
    #[async_trait]
    impl HabitSource for NoHabits {
        async fn due_today(&self, _u: UserId, _d: DateTime<Utc>) -> anyhow::Result<Vec<sources::HabitRecord>> {
            Ok(vec![])
        }

        async fn get_habit(&self, _id: &str) -> anyhow::Result<Option<sources::HabitRecord>> {
            Ok(None)
        }
    }

    struct NoMeetings;
    #[async_trait]
    impl MeetingSource for NoMeetings {
        async fn occurring_on(&self, _u: UserId, _d: DateTime<Utc>) -> anyhow::Result<Vec<sources::MeetingRecord>> {
            Ok(vec![])
        }

        async fn get_meeting(&self, _id: &str) -> anyhow::Result<Option<sources::MeetingRecord>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn skips_completed_and_stale_due_tasks() {
        use chrono::TimeZone;
        let config = SchedulerConfig::default();
        let collector = CandidateCollector::new(&config);
        let date = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();

        let tasks = FixedTasks(vec![
            sources::TaskRecord {
                id: "done".into(),
                title: "done".into(),
                completed: true,
                due_date: None,
                duration_minutes: None,
                priority: TaskPriority::Medium,
            },
            sources::TaskRecord {
                id: "stale".into(),
                title: "stale".into(),
                completed: false,
                due_date: Some(date - Duration::days(1)),
                duration_minutes: None,
                priority: TaskPriority::Medium,
            },
            sources::TaskRecord {
                id: "live".into(),
                title: "live".into(),
                completed: false,
                due_date: Some(date),
                duration_minutes: None,
                priority: TaskPriority::Urgent,
            },
        ]);

        let out = collector
            .collect(UserId::new(), date, &tasks, &NoHabits, &NoMeetings)
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "live");
        assert_eq!(out[0].priority, 1);
        assert_eq!(out[0].constraints.len(), 1);
    }
}
