use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

/// Message shared between the API and the pass worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassRequest {
    #[serde(rename = "id")]
    pub visitor_id: String,
    pub email: String,
}

impl PassRequest {
    pub fn new(visitor_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            visitor_id: visitor_id.into(),
            email: email.into(),
        }
    }

    pub fn to_payload(&self) -> Result<String, AppError> {
        serde_json::to_string(self)
            .map_err(|e| AppError::InternalWithMsg(format!("Pass request encoding failed: {}", e)))
    }

    pub fn from_payload(payload: &str) -> Result<Self, AppError> {
        let request: PassRequest = serde_json::from_str(payload)
            .map_err(|e| AppError::Validation(format!("Invalid pass payload: {}", e)))?;
        if request.visitor_id.trim().is_empty() || request.email.trim().is_empty() {
            return Err(AppError::Validation("Pass payload must include id and email".into()));
        }
        Ok(request)
    }
}

pub const JOB_PENDING: &str = "PENDING";
pub const JOB_PROCESSING: &str = "PROCESSING";
pub const JOB_COMPLETED: &str = "COMPLETED";
pub const JOB_DEAD: &str = "DEAD";

/// How long a claimed job may stay PROCESSING before another claim takes it back.
pub const DEFAULT_PROCESSING_LEASE_SECS: i64 = 300;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PassJob {
    pub id: String,
    pub queue: String,
    pub payload: String,
    pub status: String,
    pub attempts: i32,
    pub available_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PassJob {
    pub fn new(queue: &str, payload: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            queue: queue.to_string(),
            payload,
            status: JOB_PENDING.to_string(),
            attempts: 0,
            available_at: now,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}
