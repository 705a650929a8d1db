use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use tokio::time::sleep;
use tracing::{error, info, warn, info_span, Instrument};

use crate::domain::models::pass::{PassJob, PassRequest};
use crate::error::AppError;
use crate::infra::factory::PASS_EMAIL_TEMPLATE;
use crate::infra::pass::link_signer::PASS_LINK_TTL_HOURS;
use crate::infra::pass::qr_renderer::{pass_artifact_name, render_qr_svg, PASS_CONTENT_TYPE};
use crate::state::AppState;

pub const CLAIM_BATCH: i64 = 10;
const RETRY_BASE_SECS: i64 = 30;
const RETRY_CAP_SECS: i64 = 3600;
const PASS_EMAIL_SUBJECT: &str = "Your campus visitor pass";

/// Delay before the next delivery attempt after `attempts` failures.
pub fn retry_delay(attempts: i32) -> chrono::Duration {
    let exp = attempts.clamp(0, 16) as u32;
    let secs = RETRY_BASE_SECS.saturating_mul(1i64 << exp).min(RETRY_CAP_SECS);
    chrono::Duration::seconds(secs)
}

/// Public URL of the signed pass route for artifact `name`.
pub fn pass_route_url(public_base_url: &str, name: &str) -> String {
    format!("{}/passes/{}", public_base_url.trim_end_matches('/'), name)
}

/// Turns queued pass requests into stored QR artifacts and emails.
pub struct PassWorker {
    state: Arc<AppState>,
}

impl PassWorker {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn run(self) {
        let poll = Duration::from_secs(self.state.config.worker_poll_secs.max(1));
        info!(queue = %self.state.config.pass_queue_name, "Starting pass worker...");

        loop {
            if let Err(e) = self.run_once().await {
                error!("Failed to fetch pending pass jobs: {:?}", e);
            }
            sleep(poll).await;
        }
    }

    /// Claims one batch of due jobs and settles each. Returns how many were claimed.
    pub async fn run_once(&self) -> Result<usize, AppError> {
        let jobs = self.state.pass_queue.claim(CLAIM_BATCH).await?;
        let count = jobs.len();

        for job in jobs {
            let span = info_span!("pass_job", job_id = %job.id, attempt = job.attempts);
            self.handle(job).instrument(span).await;
        }

        Ok(count)
    }

    async fn handle(&self, job: PassJob) {
        let queue = &self.state.pass_queue;

        let request = match PassRequest::from_payload(&job.payload) {
            Ok(r) => r,
            Err(e) => {
                error!("Dropping malformed pass job: {}", e);
                if let Err(up_err) = queue.fail(&job.id, &e.to_string(), None).await {
                    error!("Failed to park malformed job: {:?}", up_err);
                }
                return;
            }
        };

        let span = info_span!("deliver", visitor_id = %request.visitor_id);
        match self.deliver(&request).instrument(span).await {
            Ok(()) => {
                info!("Pass job completed");
                if let Err(e) = queue.complete(&job.id).await {
                    error!("Failed to mark pass job as completed: {:?}", e);
                }
            }
            Err(e) => {
                let retry_at = (job.attempts < self.state.config.pass_max_attempts)
                    .then(|| Utc::now() + retry_delay(job.attempts));
                match retry_at {
                    Some(at) => warn!("Pass job failed, retrying at {}: {}", at, e),
                    None => error!("Pass job failed after {} attempts, giving up: {}", job.attempts, e),
                }
                if let Err(up_err) = queue.fail(&job.id, &e.to_string(), retry_at).await {
                    error!("Failed to record pass job failure: {:?}", up_err);
                }
            }
        }
    }

    /// Rendering and storage are fatal; the visitor patch and email are not.
    async fn deliver(&self, request: &PassRequest) -> Result<(), AppError> {
        let state = &self.state;
        let svg = render_qr_svg(&request.visitor_id)?;
        let name = pass_artifact_name(&request.visitor_id);

        let stored_at = state.artifact_store.put(&name, PASS_CONTENT_TYPE, svg.clone()).await?;
        info!(artifact = %name, %stored_at, "Pass artifact stored");

        // Visitors always go through /passes, which enforces expiry whatever the backing store.
        let link = state.link_signer.sign(&pass_route_url(&state.config.public_base_url, &name), &name, Utc::now());

        let first_name = match state.visitor_service.attach_pass(&request.visitor_id, &link).await {
            Ok(visitor) => visitor.first_name,
            Err(e) => {
                warn!("Could not attach pass link to visitor: {}", e);
                String::from("visitor")
            }
        };

        let Some(email) = &state.email_service else {
            warn!("Email not configured, skipping pass email");
            return Ok(());
        };

        let mut context = tera::Context::new();
        context.insert("first_name", &first_name);
        context.insert("visitor_id", &request.visitor_id);
        context.insert("pass_link", &link);
        context.insert("ttl_hours", &PASS_LINK_TTL_HOURS);

        let body = match state.templates.render(PASS_EMAIL_TEMPLATE, &context) {
            Ok(body) => body,
            Err(e) => {
                warn!("Pass email template failed to render, skipping email: {:?}", e);
                return Ok(());
            }
        };

        match email.send(&request.email, PASS_EMAIL_SUBJECT, &body, Some(&name), Some(&svg)).await {
            Ok(()) => info!("Pass email sent"),
            Err(e) => warn!("Pass email failed, pass remains available by link: {}", e),
        }

        Ok(())
    }
}

pub async fn start_background_worker(state: Arc<AppState>) {
    PassWorker::new(state).run().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        assert_eq!(retry_delay(0).num_seconds(), 30);
        assert_eq!(retry_delay(1).num_seconds(), 60);
        assert_eq!(retry_delay(3).num_seconds(), 240);
        assert_eq!(retry_delay(12).num_seconds(), RETRY_CAP_SECS);
    }

    #[test]
    fn test_pass_route_url() {
        assert_eq!(pass_route_url("https://gate.campus.edu/", "VIS-1.svg"), "https://gate.campus.edu/passes/VIS-1.svg");
    }
}
