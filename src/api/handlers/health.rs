use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use crate::api::dtos::responses::ApiHealthResponse;
use crate::state::AppState;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

pub async fn api_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiHealthResponse {
        ok: true,
        time: Utc::now(),
        storage: state.visitor_service.storage_backend(),
    })
}
