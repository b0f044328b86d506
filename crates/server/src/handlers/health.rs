//! Health and telemetry handlers

use crate::error::ApiResult;
use crate::state::AppState;
use axum::{extract::State, http::header, response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub service: String,
    /// `healthy`, `unhealthy` or `disabled`.
    pub cache: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_error: Option<String>,
}

/// `GET /health`
///
/// The service is healthy while it can answer; a failing cache only shows up
/// in the `cache` field.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (cache, cache_error) = match &state.cache {
        None => ("disabled", None),
        Some(cache) => match cache.ping().await {
            Ok(()) => ("healthy", None),
            Err(e) => {
                tracing::warn!(backend = cache.backend(), "Cache health check failed: {e}");
                ("unhealthy", Some(e.to_string()))
            }
        },
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().timestamp(),
        service: "pulse".to_string(),
        cache: cache.to_string(),
        cache_error,
    })
}

/// `GET /metrics`: Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let body = state.metrics.export()?;
    Ok(([(header::CONTENT_TYPE, state.metrics.content_type())], body))
}
