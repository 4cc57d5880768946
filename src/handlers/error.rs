//! Error vocabulary for Component F's command/query handlers.

use thiserror::Error;

use crate::domain::DomainError;
use crate::repository::RepositoryError;
use crate::scheduler::SchedulerError;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command deadline exceeded")]
    DeadlineExceeded,

    #[error("schedule not found for the given user and date")]
    ScheduleNotFound,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Collector(#[from] anyhow::Error),
}
