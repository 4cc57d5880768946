//! Postgres repository implementation using Diesel, grounded on the
//! teacher's `db::repositories::postgres` module: connection pooling with
//! r2d2, automatic retry of transient failures, and migrations run once at
//! startup.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: connection string (required)
//! - `PG_POOL_MAX`: maximum pool size (default: 10)
//! - `PG_POOL_MIN`: minimum idle connections (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: initial retry delay in milliseconds (default: 100)

mod models;
mod schema;

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task;

use crate::domain::{Conflict, ConflictId, RescheduleAttempt, Schedule, ScheduleId, UserId};
use crate::outbox::OutboxMessage;

use super::{
    ConflictRepository, FullRepository, OutboxRepository, RepositoryError, RepositoryResult,
    RescheduleAttemptRepository, ScheduleRepository,
};
use models::{
    schedule_from_rows, ConflictRow, OutboxMessageRow, RescheduleAttemptRow, ScheduleRow,
    TimeBlockRow,
};

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connection_timeout_sec: u64,
    pub idle_timeout_sec: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl PostgresConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", 10),
            min_pool_size: env_or("PG_POOL_MIN", 1),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", 30),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", 600),
            max_retries: env_or("PG_MAX_RETRIES", 3),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", 100),
        })
    }

    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Diesel-backed repository for Postgres. Serializes concurrent commands on
/// the same `(userId, date)` via `SERIALIZABLE` isolation rather than the
/// in-memory repository's coarse lock; conflicts surface as
/// `RepositoryError::Serialization` and are retried by the caller.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    total_queries: std::sync::Arc<AtomicU64>,
    failed_queries: std::sync::Arc<AtomicU64>,
    retried_operations: std::sync::Arc<AtomicU64>,
}

impl PostgresRepository {
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| RepositoryError::connection(e.to_string()))?;

        {
            let mut conn = pool
                .get()
                .map_err(|e| RepositoryError::connection(e.to_string()))?;
            conn.run_pending_migrations(MIGRATIONS)
                .map_err(|e| RepositoryError::internal(format!("migration failed: {e}")))?;
        }

        Ok(Self {
            pool,
            config,
            total_queries: Default::default(),
            failed_queries: Default::default(),
            retried_operations: Default::default(),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();
        let retried_operations = self.retried_operations.clone();

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    retried_operations.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection(e.to_string());
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                };

                total_queries.fetch_add(1, Ordering::Relaxed);
                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => {
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }

            failed_queries.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| RepositoryError::internal("max retries exceeded")))
        })
        .await
        .map_err(|e| RepositoryError::internal(format!("task join error: {e}")))?
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

/// Upsert-and-replace-blocks for one schedule, run inside a transaction the
/// caller already opened. Factored out so `save` and the atomic
/// `save_and_publish`/`save_reschedule_results` paths share one write path
/// instead of diverging.
fn write_schedule_tx(
    tx: &mut PgConnection,
    row: &ScheduleRow,
    block_rows: &[TimeBlockRow],
) -> Result<(), diesel::result::Error> {
    diesel::insert_into(schema::schedules::table)
        .values(row)
        .on_conflict(schema::schedules::schedule_id)
        .do_update()
        .set(row)
        .execute(tx)?;

    diesel::delete(
        schema::time_blocks::table.filter(schema::time_blocks::schedule_id.eq(row.schedule_id)),
    )
    .execute(tx)?;

    if !block_rows.is_empty() {
        diesel::insert_into(schema::time_blocks::table)
            .values(block_rows)
            .execute(tx)?;
    }

    Ok(())
}

fn write_outbox_tx(
    tx: &mut PgConnection,
    rows: &[OutboxMessageRow],
) -> Result<(), diesel::result::Error> {
    if rows.is_empty() {
        return Ok(());
    }
    diesel::insert_into(schema::outbox_messages::table)
        .values(rows)
        .execute(tx)?;
    Ok(())
}

fn write_attempts_tx(
    tx: &mut PgConnection,
    rows: &[RescheduleAttemptRow],
) -> Result<(), diesel::result::Error> {
    if rows.is_empty() {
        return Ok(());
    }
    diesel::insert_into(schema::reschedule_attempts::table)
        .values(rows)
        .execute(tx)?;
    Ok(())
}

#[async_trait]
impl ScheduleRepository for PostgresRepository {
    async fn save(&self, schedule: &Schedule) -> RepositoryResult<()> {
        let row = ScheduleRow::from_domain(schedule)?;
        let block_rows: Vec<TimeBlockRow> =
            schedule.blocks().iter().map(TimeBlockRow::from_domain).collect();

        self.with_conn(move |conn| {
            conn.build_transaction()
                .serializable()
                .run(|tx| write_schedule_tx(tx, &row, &block_rows))
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn find_by_id(&self, id: ScheduleId) -> RepositoryResult<Option<Schedule>> {
        let id = id.value();
        self.with_conn(move |conn| {
            let schedule_row = schema::schedules::table
                .filter(schema::schedules::schedule_id.eq(id))
                .select(ScheduleRow::as_select())
                .first::<ScheduleRow>(conn)
                .optional()
                .map_err(map_diesel_error)?;

            let Some(schedule_row) = schedule_row else {
                return Ok(None);
            };

            let block_rows = schema::time_blocks::table
                .filter(schema::time_blocks::schedule_id.eq(id))
                .select(TimeBlockRow::as_select())
                .load::<TimeBlockRow>(conn)
                .map_err(map_diesel_error)?;

            Ok(Some(schedule_from_rows(schedule_row, block_rows)?))
        })
        .await
    }

    async fn find_by_user_and_date(
        &self,
        user_id: UserId,
        date: chrono::DateTime<chrono::Utc>,
    ) -> RepositoryResult<Option<Schedule>> {
        let user_id = user_id.value();
        let date = crate::domain::normalize_to_midnight(date);
        self.with_conn(move |conn| {
            let schedule_row = schema::schedules::table
                .filter(schema::schedules::user_id.eq(user_id))
                .filter(schema::schedules::date.eq(date))
                .select(ScheduleRow::as_select())
                .first::<ScheduleRow>(conn)
                .optional()
                .map_err(map_diesel_error)?;

            let Some(schedule_row) = schedule_row else {
                return Ok(None);
            };

            let block_rows = schema::time_blocks::table
                .filter(schema::time_blocks::schedule_id.eq(schedule_row.schedule_id))
                .select(TimeBlockRow::as_select())
                .load::<TimeBlockRow>(conn)
                .map_err(map_diesel_error)?;

            Ok(Some(schedule_from_rows(schedule_row, block_rows)?))
        })
        .await
    }

    async fn find_by_user_date_range(
        &self,
        user_id: UserId,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    ) -> RepositoryResult<Vec<Schedule>> {
        let user_id = user_id.value();
        self.with_conn(move |conn| {
            let schedule_rows = schema::schedules::table
                .filter(schema::schedules::user_id.eq(user_id))
                .filter(schema::schedules::date.ge(start))
                .filter(schema::schedules::date.lt(end))
                .order(schema::schedules::date.asc())
                .select(ScheduleRow::as_select())
                .load::<ScheduleRow>(conn)
                .map_err(map_diesel_error)?;

            let mut out = Vec::with_capacity(schedule_rows.len());
            for schedule_row in schedule_rows {
                let block_rows = schema::time_blocks::table
                    .filter(schema::time_blocks::schedule_id.eq(schedule_row.schedule_id))
                    .select(TimeBlockRow::as_select())
                    .load::<TimeBlockRow>(conn)
                    .map_err(map_diesel_error)?;
                out.push(schedule_from_rows(schedule_row, block_rows)?);
            }
            Ok(out)
        })
        .await
    }

    async fn delete(&self, id: ScheduleId) -> RepositoryResult<()> {
        let id = id.value();
        self.with_conn(move |conn| {
            let deleted = diesel::delete(
                schema::schedules::table.filter(schema::schedules::schedule_id.eq(id)),
            )
            .execute(conn)
            .map_err(map_diesel_error)?;

            if deleted == 0 {
                return Err(RepositoryError::not_found(format!("schedule {id} not found")));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl RescheduleAttemptRepository for PostgresRepository {
    async fn create(&self, attempt: &RescheduleAttempt) -> RepositoryResult<()> {
        let row = RescheduleAttemptRow::from_domain(attempt);
        self.with_conn(move |conn| {
            diesel::insert_into(schema::reschedule_attempts::table)
                .values(&row)
                .execute(conn)
                .map_err(map_diesel_error)?;
            Ok(())
        })
        .await
    }

    async fn list_by_user_and_date(
        &self,
        user_id: UserId,
        date: chrono::DateTime<chrono::Utc>,
    ) -> RepositoryResult<Vec<RescheduleAttempt>> {
        let user_id = user_id.value();
        let date = crate::domain::normalize_to_midnight(date);
        self.with_conn(move |conn| {
            let schedule_ids: Vec<uuid::Uuid> = schema::schedules::table
                .filter(schema::schedules::user_id.eq(user_id))
                .filter(schema::schedules::date.eq(date))
                .select(schema::schedules::schedule_id)
                .load(conn)
                .map_err(map_diesel_error)?;

            let rows = schema::reschedule_attempts::table
                .filter(schema::reschedule_attempts::schedule_id.eq_any(schedule_ids))
                .select(RescheduleAttemptRow::as_select())
                .load::<RescheduleAttemptRow>(conn)
                .map_err(map_diesel_error)?;

            rows.into_iter().map(|r| r.into_domain()).collect()
        })
        .await
    }
}

#[async_trait]
impl ConflictRepository for PostgresRepository {
    async fn save(&self, conflict: &Conflict) -> RepositoryResult<()> {
        let row = ConflictRow::from_domain(conflict);
        self.with_conn(move |conn| {
            diesel::insert_into(schema::conflicts::table)
                .values(&row)
                .on_conflict(schema::conflicts::conflict_id)
                .do_update()
                .set(&row)
                .execute(conn)
                .map_err(map_diesel_error)?;
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: ConflictId) -> RepositoryResult<Option<Conflict>> {
        let id = id.value();
        self.with_conn(move |conn| {
            let row = schema::conflicts::table
                .filter(schema::conflicts::conflict_id.eq(id))
                .select(ConflictRow::as_select())
                .first::<ConflictRow>(conn)
                .optional()
                .map_err(map_diesel_error)?;
            row.map(|r| r.into_domain()).transpose()
        })
        .await
    }

    async fn list_pending_by_user(&self, user_id: UserId) -> RepositoryResult<Vec<Conflict>> {
        let user_id = user_id.value();
        self.with_conn(move |conn| {
            let rows = schema::conflicts::table
                .filter(schema::conflicts::user_id.eq(user_id))
                .filter(schema::conflicts::resolution.eq("pending"))
                .select(ConflictRow::as_select())
                .load::<ConflictRow>(conn)
                .map_err(map_diesel_error)?;
            rows.into_iter().map(|r| r.into_domain()).collect()
        })
        .await
    }
}

#[async_trait]
impl OutboxRepository for PostgresRepository {
    async fn append_batch(&self, messages: &[OutboxMessage]) -> RepositoryResult<()> {
        let rows: Vec<OutboxMessageRow> = messages.iter().map(OutboxMessageRow::from_domain).collect();
        if rows.is_empty() {
            return Ok(());
        }
        self.with_conn(move |conn| {
            diesel::insert_into(schema::outbox_messages::table)
                .values(&rows)
                .execute(conn)
                .map_err(map_diesel_error)?;
            Ok(())
        })
        .await
    }

    async fn list_pending(&self, limit: usize) -> RepositoryResult<Vec<OutboxMessage>> {
        self.with_conn(move |conn| {
            let rows = schema::outbox_messages::table
                .filter(schema::outbox_messages::publish_status.eq("pending"))
                .order(schema::outbox_messages::created_at.asc())
                .limit(limit as i64)
                .select(OutboxMessageRow::as_select())
                .load::<OutboxMessageRow>(conn)
                .map_err(map_diesel_error)?;
            rows.into_iter().map(|r| r.into_domain()).collect()
        })
        .await
    }
}

#[async_trait]
impl FullRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    /// One `SERIALIZABLE` transaction covering the schedule upsert, its
    /// block replacement, and the outbox insert, so a failure partway
    /// through (lost connection, retry exhaustion) rolls back the schedule
    /// write instead of leaving it committed with its events gone.
    async fn save_and_publish(
        &self,
        schedule: &Schedule,
        messages: &[OutboxMessage],
    ) -> RepositoryResult<()> {
        let row = ScheduleRow::from_domain(schedule)?;
        let block_rows: Vec<TimeBlockRow> =
            schedule.blocks().iter().map(TimeBlockRow::from_domain).collect();
        let outbox_rows: Vec<OutboxMessageRow> =
            messages.iter().map(OutboxMessageRow::from_domain).collect();

        self.with_conn(move |conn| {
            conn.build_transaction()
                .serializable()
                .run(|tx| {
                    write_schedule_tx(tx, &row, &block_rows)?;
                    write_outbox_tx(tx, &outbox_rows)
                })
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn save_reschedule_results(
        &self,
        schedule: &Schedule,
        messages: &[OutboxMessage],
        attempts: &[RescheduleAttempt],
    ) -> RepositoryResult<()> {
        let row = ScheduleRow::from_domain(schedule)?;
        let block_rows: Vec<TimeBlockRow> =
            schedule.blocks().iter().map(TimeBlockRow::from_domain).collect();
        let outbox_rows: Vec<OutboxMessageRow> =
            messages.iter().map(OutboxMessageRow::from_domain).collect();
        let attempt_rows: Vec<RescheduleAttemptRow> =
            attempts.iter().map(RescheduleAttemptRow::from_domain).collect();

        self.with_conn(move |conn| {
            conn.build_transaction()
                .serializable()
                .run(|tx| {
                    write_schedule_tx(tx, &row, &block_rows)?;
                    write_outbox_tx(tx, &outbox_rows)?;
                    write_attempts_tx(tx, &attempt_rows)
                })
                .map_err(map_diesel_error)
        })
        .await
    }
}
