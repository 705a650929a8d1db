use axum::{extract::FromRequestParts, http::request::Parts};
use crate::error::AppError;
use crate::state::AppState;
use std::sync::Arc;
use subtle::ConstantTimeEq;

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Guards admin routes. Open when no `ADMIN_TOKEN` is configured.
pub struct AdminUser;

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin_token.as_deref() else {
            return Ok(AdminUser);
        };

        let provided = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        if !token_matches(provided, expected) {
            return Err(AppError::Forbidden("Invalid admin token".into()));
        }

        Ok(AdminUser)
    }
}

/// Constant-time comparison; length mismatches fail without an early exit on content.
pub fn token_matches(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}
