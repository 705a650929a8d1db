use crate::domain::{
    models::pass::{PassJob, PassRequest, DEFAULT_PROCESSING_LEASE_SECS, JOB_COMPLETED, JOB_DEAD, JOB_PENDING},
    ports::PassQueue,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

pub struct SqlitePassQueue {
    pool: SqlitePool,
    queue: String,
    lease: Duration,
}

impl SqlitePassQueue {
    pub fn new(pool: SqlitePool, queue: impl Into<String>) -> Self {
        Self { pool, queue: queue.into(), lease: Duration::seconds(DEFAULT_PROCESSING_LEASE_SECS) }
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }
}

#[async_trait]
impl PassQueue for SqlitePassQueue {
    async fn enqueue(&self, request: &PassRequest) -> Result<PassJob, AppError> {
        let job = PassJob::new(&self.queue, request.to_payload()?, Utc::now());
        sqlx::query_as::<_, PassJob>(
            "INSERT INTO pass_jobs (id, queue, payload, status, attempts, available_at, last_error, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *"
        )
            .bind(&job.id)
            .bind(&job.queue)
            .bind(&job.payload)
            .bind(&job.status)
            .bind(job.attempts)
            .bind(job.available_at)
            .bind(&job.last_error)
            .bind(job.created_at)
            .bind(job.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    /// Due PENDING jobs plus PROCESSING jobs whose lease ran out, which
    /// covers a worker that died between claim and settle.
    async fn claim(&self, limit: i64) -> Result<Vec<PassJob>, AppError> {
        let now = Utc::now();
        sqlx::query_as::<_, PassJob>(
            r#"
            UPDATE pass_jobs
            SET status = 'PROCESSING', attempts = attempts + 1, updated_at = ?
            WHERE id IN (
                SELECT id FROM pass_jobs
                WHERE queue = ?
                  AND ((status = 'PENDING' AND available_at <= ?)
                    OR (status = 'PROCESSING' AND updated_at <= ?))
                ORDER BY available_at ASC
                LIMIT ?
            )
            RETURNING *
            "#
        )
            .bind(now)
            .bind(&self.queue)
            .bind(now)
            .bind(now - self.lease)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn complete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE pass_jobs SET status = ?, last_error = NULL, updated_at = ? WHERE id = ?")
            .bind(JOB_COMPLETED)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn fail(&self, id: &str, error: &str, retry_at: Option<DateTime<Utc>>) -> Result<(), AppError> {
        let now = Utc::now();
        let (status, available_at) = match retry_at {
            Some(at) => (JOB_PENDING, at),
            None => (JOB_DEAD, now),
        };
        sqlx::query("UPDATE pass_jobs SET status = ?, available_at = ?, last_error = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(available_at)
            .bind(error)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}
