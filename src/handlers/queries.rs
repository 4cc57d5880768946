//! Component F read-only queries — no unit of work, no outbox writes.

use chrono::{DateTime, Utc};

use crate::domain::{RescheduleAttempt, Schedule, UserId};
use crate::repository::{FullRepository, RepositoryResult};

pub struct QueryHandlers;

impl QueryHandlers {
    pub async fn get_schedule(
        repo: &dyn FullRepository,
        user_id: UserId,
        date: DateTime<Utc>,
    ) -> RepositoryResult<Option<Schedule>> {
        repo.find_by_user_and_date(user_id, date).await
    }

    pub async fn list_reschedule_attempts(
        repo: &dyn FullRepository,
        user_id: UserId,
        date: DateTime<Utc>,
    ) -> RepositoryResult<Vec<RescheduleAttempt>> {
        repo.list_by_user_and_date(user_id, date).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn get_schedule_returns_none_when_absent() {
        let repo = crate::repository::memory::InMemoryRepository::new();
        let result = QueryHandlers::get_schedule(&repo, UserId::new(), day()).await.unwrap();
        assert!(result.is_none());
    }
}
