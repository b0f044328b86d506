//! API Router configuration

use crate::handlers;
use crate::middleware::track_requests;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Create the service router
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        // Ingestion
        .route("/metrics-data", post(handlers::ingest_metric))
        // Queries
        .route("/analyze", get(handlers::analyze))
        .route("/stats", get(handlers::stats))
        .route("/history", get(handlers::history))
        .route("/predict", get(handlers::predict))
        // Health and telemetry
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
