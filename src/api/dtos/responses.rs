use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::models::visitor::{Visitor, VisitorStats};
use crate::domain::services::assistant::{ApprovalSuggestion, OperationsSummary};
use crate::domain::services::visitor_service::ReclassifyReport;

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct VisitorEnvelope {
    pub ok: bool,
    pub visitor: Visitor,
}

#[derive(Serialize)]
pub struct ReclassifyResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub report: ReclassifyReport,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub stats: VisitorStats,
    pub recent: Vec<Visitor>,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub summary: OperationsSummary,
}

#[derive(Serialize)]
pub struct SuggestionResponse {
    pub ok: bool,
    pub suggestion: ApprovalSuggestion,
}

#[derive(Serialize)]
pub struct ApiHealthResponse {
    pub ok: bool,
    pub time: DateTime<Utc>,
    pub storage: &'static str,
}
