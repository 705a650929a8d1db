use axum::{body::Bytes, extract::{Path, State}, response::IntoResponse, Json};
use std::sync::Arc;

use crate::api::dtos::requests::{ReclassifyAllRequest, SuggestApprovalRequest, DEFAULT_RECLASSIFY_LIMIT};
use crate::api::dtos::responses::{ReclassifyResponse, SuggestionResponse, SummaryResponse, VisitorEnvelope};
use crate::api::extractors::{admin::AdminUser, json::AppJson};
use crate::error::AppError;
use crate::state::AppState;

pub async fn reclassify_visitor(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let visitor = state.visitor_service.reclassify(&id).await?;
    Ok(Json(VisitorEnvelope { ok: true, visitor }))
}

/// Body is optional; an empty POST reclassifies the newest visitors.
pub async fn reclassify_all(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let request: ReclassifyAllRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ReclassifyAllRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))?
    };

    let report = match request.ids {
        Some(ids) => state.visitor_service.reclassify_many(&ids).await,
        None => {
            state
                .visitor_service
                .reclassify_all(request.limit.unwrap_or(DEFAULT_RECLASSIFY_LIMIT))
                .await?
        }
    };

    Ok(Json(ReclassifyResponse { ok: true, report }))
}

pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let summary = state.assistant.summary().await?;
    Ok(Json(SummaryResponse { ok: true, summary }))
}

pub async fn suggest_approval(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    AppJson(payload): AppJson<SuggestApprovalRequest>,
) -> Result<impl IntoResponse, AppError> {
    let visitor = payload
        .visitor
        .ok_or_else(|| AppError::Validation("visitor required".into()))?;
    let suggestion = state.assistant.suggest_approval(&visitor).await;
    Ok(Json(SuggestionResponse { ok: true, suggestion }))
}
