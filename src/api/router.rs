use axum::{
    body::Body,
    extract::Request,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{admin, ai, health, pass, visitor};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/health", get(health::api_health))

        // Intake & lifecycle
        .route("/api/visitors", post(visitor::create_visitor).get(visitor::list_visitors))
        .route("/api/visitors/{id}", get(visitor::get_visitor))
        .route("/api/visitors/{id}/status", patch(visitor::update_status))
        .route("/api/visitors/{id}/label", patch(visitor::update_label))
        .route("/api/visitors/{id}/send-pass", post(visitor::send_pass))

        // Admin dashboard
        .route("/api/admin", get(admin::get_dashboard))
        .route("/api/admin/stats", get(admin::get_stats))
        .route("/api/admin/recent", get(admin::get_recent))

        // AI
        .route("/api/ai/summary", get(ai::get_summary))
        .route("/api/ai/suggest-approval", post(ai::suggest_approval))
        .route("/api/ai/reclassify/{id}", post(ai::reclassify_visitor))
        .route("/api/ai/reclassify-all", post(ai::reclassify_all))

        // Pass artifacts
        .route("/passes/{name}", get(pass::get_pass))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}
