use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::api::dtos::responses::DashboardResponse;
use crate::api::extractors::admin::AdminUser;
use crate::domain::services::visitor_service::RECENT_LIMIT;
use crate::error::AppError;
use crate::state::AppState;

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.visitor_service.stats().await?))
}

pub async fn get_recent(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.visitor_service.recent(RECENT_LIMIT).await?))
}

pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let service = &state.visitor_service;
    let (stats, recent) = tokio::try_join!(service.stats(), service.recent(RECENT_LIMIT))?;
    Ok(Json(DashboardResponse { stats, recent }))
}
