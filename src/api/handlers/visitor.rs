use axum::{extract::{Path, Query, State}, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::{ListVisitorsQuery, UpdateLabelRequest, UpdateStatusRequest, DEFAULT_LIST_LIMIT};
use crate::api::dtos::responses::{OkResponse, VisitorEnvelope};
use crate::api::extractors::{admin::AdminUser, json::AppJson};
use crate::domain::models::visitor::{NewVisitor, VisitorFilter, VisitorLabel, VisitorStatus};
use crate::error::AppError;
use crate::state::AppState;

pub async fn create_visitor(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<NewVisitor>,
) -> Result<impl IntoResponse, AppError> {
    let visitor = state.visitor_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(VisitorEnvelope { ok: true, visitor })))
}

pub async fn list_visitors(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<ListVisitorsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut filter = VisitorFilter::default();
    if let Some(status) = query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        filter.status = Some(status.parse::<VisitorStatus>()?);
    }
    if query.today_only() {
        filter.date = Some(Utc::now().date_naive());
    }

    let rows = state
        .visitor_service
        .list(&filter, query.limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .await?;
    Ok(Json(rows))
}

pub async fn get_visitor(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let visitor = state.visitor_service.get(&id).await?;
    Ok(Json(visitor))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let target = payload
        .status
        .as_deref()
        .ok_or_else(|| AppError::InvalidStatus(String::new()))?
        .parse::<VisitorStatus>()?;

    let actor = payload.approved_by.as_deref().map(str::trim).filter(|a| !a.is_empty());
    let visitor = state.visitor_service.transition(&id, target, actor).await?;
    Ok(Json(VisitorEnvelope { ok: true, visitor }))
}

pub async fn update_label(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateLabelRequest>,
) -> Result<impl IntoResponse, AppError> {
    let label = payload
        .label
        .as_deref()
        .ok_or_else(|| AppError::InvalidLabel(String::new()))?
        .parse::<VisitorLabel>()?;

    let visitor = state.visitor_service.override_label(&id, label).await?;
    Ok(Json(VisitorEnvelope { ok: true, visitor }))
}

pub async fn send_pass(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.visitor_service.send_pass(&id).await?;
    info!(visitor_id = %id, "Pass resend requested");
    Ok(Json(OkResponse { ok: true }))
}
