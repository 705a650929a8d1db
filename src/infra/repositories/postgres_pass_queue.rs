use crate::domain::{
    models::pass::{PassJob, PassRequest, DEFAULT_PROCESSING_LEASE_SECS, JOB_COMPLETED, JOB_DEAD, JOB_PENDING},
    ports::PassQueue,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

pub struct PostgresPassQueue {
    pool: PgPool,
    queue: String,
    lease: Duration,
}

impl PostgresPassQueue {
    pub fn new(pool: PgPool, queue: impl Into<String>) -> Self {
        Self { pool, queue: queue.into(), lease: Duration::seconds(DEFAULT_PROCESSING_LEASE_SECS) }
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }
}

#[async_trait]
impl PassQueue for PostgresPassQueue {
    async fn enqueue(&self, request: &PassRequest) -> Result<PassJob, AppError> {
        let job = PassJob::new(&self.queue, request.to_payload()?, Utc::now());
        sqlx::query_as::<_, PassJob>(
            "INSERT INTO pass_jobs (id, queue, payload, status, attempts, available_at, last_error, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *"
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

    /// Due PENDING jobs plus PROCESSING jobs whose lease ran out.
    async fn claim(&self, limit: i64) -> Result<Vec<PassJob>, AppError> {
        let now = Utc::now();
        let jobs = sqlx::query_as::<_, PassJob>(
            r#"
            UPDATE pass_jobs
            SET status = 'PROCESSING', attempts = attempts + 1, updated_at = $1
            WHERE id IN (
                SELECT id
                FROM pass_jobs
                WHERE queue = $2
                  AND ((status = 'PENDING' AND available_at <= $1)
                    OR (status = 'PROCESSING' AND updated_at <= $4))
                ORDER BY available_at ASC
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#
        )
            .bind(now)
            .bind(&self.queue)
            .bind(limit)
            .bind(now - self.lease)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(jobs)
    }

    async fn complete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE pass_jobs SET status = $1, last_error = NULL, updated_at = $2 WHERE id = $3")
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
        sqlx::query("UPDATE pass_jobs SET status = $1, available_at = $2, last_error = $3, updated_at = $4 WHERE id = $5")
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
