use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::domain::models::visitor::VisitorStatus;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
    #[error("Invalid label: {0}")]
    InvalidLabel(String),
    #[error("Cannot move visitor from {from} to {to}")]
    InvalidTransition { from: VisitorStatus, to: VisitorStatus },
    #[error("Dependency failure: {0}")]
    Dependency(String),
    #[error("Internal server error")]
    Internal,
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Database(e) => {
                error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Io(e) => {
                error!("I/O error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidStatus(_) => (StatusCode::BAD_REQUEST, "Invalid status".to_string()),
            AppError::InvalidLabel(_) => (StatusCode::BAD_REQUEST, "Invalid label".to_string()),
            AppError::InvalidTransition { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Dependency(msg) => {
                error!("Dependency failure: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Upstream service unavailable".to_string())
            }
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string()),
            AppError::InternalWithMsg(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::InternalWithMsg(format!("Migration failed: {}", e))
    }
}
