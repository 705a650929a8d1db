use axum::{
    extract::{Path, Query, State},
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::IntoResponse,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

use crate::api::dtos::requests::PassLinkQuery;
use crate::error::AppError;
use crate::state::AppState;

/// Serves a stored pass image behind an expiring signature.
pub async fn get_pass(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<PassLinkQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(expires), Some(sig)) = (query.expires, query.sig.as_deref()) else {
        return Err(AppError::Forbidden("Missing signature".into()));
    };

    if let Err(e) = state.link_signer.verify(&name, expires, sig, Utc::now()) {
        warn!(artifact = %name, "Rejected pass link: {}", e);
        return Err(e);
    }

    let artifact = state
        .artifact_store
        .fetch(&name)
        .await?
        .ok_or(AppError::NotFound("Pass not found".into()))?;

    Ok((
        [(CONTENT_TYPE, artifact.content_type), (CACHE_CONTROL, "private, max-age=300".to_string())],
        artifact.data,
    ))
}
