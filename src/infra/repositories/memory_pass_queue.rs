use crate::domain::{
    models::pass::{PassJob, PassRequest, DEFAULT_PROCESSING_LEASE_SECS, JOB_DEAD, JOB_PENDING, JOB_PROCESSING},
    ports::PassQueue,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// DEAD jobs kept for inspection; older ones are dropped first.
pub const MAX_PARKED_JOBS: usize = 100;

/// In-process queue. Completed jobs are removed and parked ones are capped,
/// so memory stays bounded over a long-running process.
pub struct InMemoryPassQueue {
    queue: String,
    lease: Duration,
    jobs: Mutex<Vec<PassJob>>,
}

impl InMemoryPassQueue {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            lease: Duration::seconds(DEFAULT_PROCESSING_LEASE_SECS),
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Copy of the jobs still held, in insertion order.
    pub fn snapshot(&self) -> Vec<PassJob> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PassJob>> {
        // A poisoned lock only means another holder panicked mid-update; the Vec is still usable.
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn position(jobs: &[PassJob], id: &str) -> Result<usize, AppError> {
        jobs.iter()
            .position(|j| j.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Pass job {} not found", id)))
    }
}

#[async_trait]
impl PassQueue for InMemoryPassQueue {
    async fn enqueue(&self, request: &PassRequest) -> Result<PassJob, AppError> {
        let job = PassJob::new(&self.queue, request.to_payload()?, Utc::now());
        self.lock().push(job.clone());
        Ok(job)
    }

    async fn claim(&self, limit: i64) -> Result<Vec<PassJob>, AppError> {
        let now = Utc::now();
        let stale_before = now - self.lease;
        let mut jobs = self.lock();
        let mut due: Vec<&mut PassJob> = jobs
            .iter_mut()
            .filter(|j| {
                (j.status == JOB_PENDING && j.available_at <= now)
                    || (j.status == JOB_PROCESSING && j.updated_at <= stale_before)
            })
            .collect();
        due.sort_by_key(|j| j.available_at);

        Ok(due
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|job| {
                job.status = JOB_PROCESSING.to_string();
                job.attempts += 1;
                job.updated_at = now;
                job.clone()
            })
            .collect())
    }

    async fn complete(&self, id: &str) -> Result<(), AppError> {
        let mut jobs = self.lock();
        let index = Self::position(&jobs, id)?;
        jobs.remove(index);
        Ok(())
    }

    async fn fail(&self, id: &str, error: &str, retry_at: Option<DateTime<Utc>>) -> Result<(), AppError> {
        let mut jobs = self.lock();
        let index = Self::position(&jobs, id)?;
        let job = &mut jobs[index];
        job.last_error = Some(error.to_string());
        job.updated_at = Utc::now();
        match retry_at {
            Some(at) => {
                job.status = JOB_PENDING.to_string();
                job.available_at = at;
            }
            None => {
                job.status = JOB_DEAD.to_string();
                let parked = jobs.iter().filter(|j| j.status == JOB_DEAD).count();
                if parked > MAX_PARKED_JOBS {
                    let mut excess = parked - MAX_PARKED_JOBS;
                    jobs.retain(|j| {
                        if excess > 0 && j.status == JOB_DEAD {
                            excess -= 1;
                            false
                        } else {
                            true
                        }
                    });
                }
            }
        }
        Ok(())
    }
}
