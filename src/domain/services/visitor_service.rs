use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::models::pass::PassRequest;
use crate::domain::models::visitor::{
    NewVisitor, TransitionOutcome, Visitor, VisitorFilter, VisitorLabel, VisitorStats, VisitorStatus,
};
use crate::domain::ports::{clamp_limit, PassQueue, VisitorRepository};
use crate::domain::services::classifier::Classifier;
use crate::error::AppError;

pub const RECENT_LIMIT: i64 = 10;
pub const MANUAL_CONFIDENCE: f64 = 1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReclassifyReport {
    pub updated: usize,
    pub failed: usize,
}

/// Owns every write to visitor records and drives the lifecycle.
pub struct VisitorService {
    repo: Arc<dyn VisitorRepository>,
    classifier: Arc<dyn Classifier>,
    queue: Arc<dyn PassQueue>,
}

impl VisitorService {
    pub fn new(
        repo: Arc<dyn VisitorRepository>,
        classifier: Arc<dyn Classifier>,
        queue: Arc<dyn PassQueue>,
    ) -> Self {
        Self { repo, classifier, queue }
    }

    pub async fn create(&self, input: NewVisitor) -> Result<Visitor, AppError> {
        let input = input.validated()?;
        let classification = self.classifier.classify(&input.reason_for_visit).await;
        let visitor = Visitor::new(input, classification.label, classification.confidence, Utc::now());

        let saved = self.repo.upsert(&visitor).await?;
        info!(visitor_id = %saved.id, label = %saved.label, "Visitor registered");
        Ok(saved)
    }

    pub async fn get(&self, id: &str) -> Result<Visitor, AppError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Visitor not found".into()))
    }

    pub async fn list(&self, filter: &VisitorFilter, limit: i64) -> Result<Vec<Visitor>, AppError> {
        self.repo.list(filter, clamp_limit(limit)).await
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<Visitor>, AppError> {
        self.repo.list(&VisitorFilter::default(), clamp_limit(limit)).await
    }

    pub async fn transition(
        &self,
        id: &str,
        target: VisitorStatus,
        actor: Option<&str>,
    ) -> Result<Visitor, AppError> {
        let mut visitor = self.get(id).await?;
        let from = visitor.status;

        if visitor.apply_transition(target, actor, Utc::now())? == TransitionOutcome::Unchanged {
            info!(visitor_id = %id, status = %target, "Transition already applied, nothing to do");
            return Ok(visitor);
        }

        let saved = self.repo.upsert(&visitor).await?;
        info!(visitor_id = %id, %from, to = %target, "Visitor status changed");

        if target == VisitorStatus::Approved {
            self.dispatch_pass(&saved).await;
        }

        Ok(saved)
    }

    /// Best effort: a queue outage must not undo an approval.
    async fn dispatch_pass(&self, visitor: &Visitor) {
        let request = PassRequest::new(&visitor.id, &visitor.email);
        match self.queue.enqueue(&request).await {
            Ok(job) => info!(visitor_id = %visitor.id, job_id = %job.id, "Pass job queued"),
            Err(e) => error!(visitor_id = %visitor.id, "Failed to queue pass job: {}", e),
        }
    }

    /// Re-sends the pass on demand. Unlike approval, queue errors reach the caller.
    pub async fn send_pass(&self, id: &str) -> Result<(), AppError> {
        let visitor = self.get(id).await?;
        let request = PassRequest::new(&visitor.id, &visitor.email);
        let job = self.queue.enqueue(&request).await.map_err(|e| match e {
            AppError::Dependency(_) => e,
            other => AppError::Dependency(other.to_string()),
        })?;
        info!(visitor_id = %id, job_id = %job.id, "Pass job re-queued");
        Ok(())
    }

    pub async fn override_label(&self, id: &str, label: VisitorLabel) -> Result<Visitor, AppError> {
        let mut visitor = self.get(id).await?;
        visitor.set_label(label, MANUAL_CONFIDENCE, Utc::now());
        let saved = self.repo.upsert(&visitor).await?;
        info!(visitor_id = %id, %label, "Label overridden by admin");
        Ok(saved)
    }

    pub async fn reclassify(&self, id: &str) -> Result<Visitor, AppError> {
        let mut visitor = self.get(id).await?;
        let classification = self.classifier.classify(&visitor.reason_for_visit).await;
        visitor.set_label(classification.label, classification.confidence, Utc::now());
        self.repo.upsert(&visitor).await
    }

    pub async fn reclassify_many(&self, ids: &[String]) -> ReclassifyReport {
        let mut report = ReclassifyReport::default();
        for id in ids {
            match self.reclassify(id).await {
                Ok(_) => report.updated += 1,
                Err(e) => {
                    warn!(visitor_id = %id, "Reclassification failed: {}", e);
                    report.failed += 1;
                }
            }
        }
        info!(updated = report.updated, failed = report.failed, "Batch reclassification finished");
        report
    }

    /// Reclassifies the newest `limit` visitors.
    pub async fn reclassify_all(&self, limit: i64) -> Result<ReclassifyReport, AppError> {
        let ids: Vec<String> = self
            .repo
            .list(&VisitorFilter::default(), clamp_limit(limit))
            .await?
            .into_iter()
            .map(|v| v.id)
            .collect();
        Ok(self.reclassify_many(&ids).await)
    }

    /// Called by the pass worker once the artifact is stored.
    /// Field-level write so a concurrent gate movement is never rolled back.
    pub async fn attach_pass(&self, id: &str, qr_url: &str) -> Result<Visitor, AppError> {
        self.repo
            .set_qr_url(id, qr_url, Utc::now())
            .await?
            .ok_or(AppError::NotFound("Visitor not found".into()))
    }

    pub async fn stats(&self) -> Result<VisitorStats, AppError> {
        self.stats_at(Utc::now()).await
    }

    /// Four independent counts; no cross-query consistency is promised.
    pub async fn stats_at(&self, now: DateTime<Utc>) -> Result<VisitorStats, AppError> {
        let today = now.date_naive();
        let today_filter = VisitorFilter::on_date(today);
        let inside_filter = VisitorFilter::with_status(VisitorStatus::CheckedIn);
        let pending_filter = VisitorFilter::with_status(VisitorStatus::Pending);
        let month_filter = VisitorFilter::in_month_of(today);

        let (total_today, inside_now, pending, month_total) = tokio::try_join!(
            self.repo.count(&today_filter),
            self.repo.count(&inside_filter),
            self.repo.count(&pending_filter),
            self.repo.count(&month_filter),
        )?;

        Ok(VisitorStats { total_today, inside_now, pending, month_total })
    }

    pub fn storage_backend(&self) -> &'static str {
        self.repo.backend_name()
    }
}
