use crate::domain::models::{
    pass::{PassJob, PassRequest},
    visitor::{Visitor, VisitorFilter},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Upper bound applied to every listing, whatever the caller asks for.
pub const MAX_LIST_LIMIT: i64 = 500;

pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_LIST_LIMIT)
}

#[async_trait]
pub trait VisitorRepository: Send + Sync {
    async fn upsert(&self, visitor: &Visitor) -> Result<Visitor, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Visitor>, AppError>;
    /// Newest first by creation time.
    async fn list(&self, filter: &VisitorFilter, limit: i64) -> Result<Vec<Visitor>, AppError>;
    async fn count(&self, filter: &VisitorFilter) -> Result<i64, AppError>;
    /// Touches only `qr_url` and `updated_at`, leaving the lifecycle fields
    /// to whoever owns them. `None` when the id is unknown.
    async fn set_qr_url(&self, id: &str, qr_url: &str, now: DateTime<Utc>) -> Result<Option<Visitor>, AppError>;
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
pub trait PassQueue: Send + Sync {
    async fn enqueue(&self, request: &PassRequest) -> Result<PassJob, AppError>;
    /// Moves up to `limit` due jobs to PROCESSING and returns them.
    async fn claim(&self, limit: i64) -> Result<Vec<PassJob>, AppError>;
    async fn complete(&self, id: &str) -> Result<(), AppError>;
    /// `retry_at = None` parks the job as DEAD.
    async fn fail(&self, id: &str, error: &str, retry_at: Option<DateTime<Utc>>) -> Result<(), AppError>;
}

#[async_trait]
pub trait LlmService: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
    ) -> Result<String, AppError>;
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str, attachment_name: Option<&str>, attachment_data: Option<&[u8]>) -> Result<(), AppError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub content_type: String,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Stores the object and returns where the store keeps it. Visitors are
    /// never sent this URL directly.
    async fn put(&self, name: &str, content_type: &str, data: Vec<u8>) -> Result<String, AppError>;
    async fn fetch(&self, name: &str) -> Result<Option<StoredArtifact>, AppError>;
}
