//! Analytics query handlers

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderName,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use pulse_core::Sample;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cache key of the latest `/analyze` response.
pub const ANALYTICS_CACHE_KEY: &str = "analytics:latest";

/// Reports whether `/analyze` was served from the cache.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Default number of samples returned by `/history`.
const DEFAULT_HISTORY: usize = 100;

/// Current analytics, as served by `GET /analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResponse {
    pub rolling_average: f64,
    pub z_score: f64,
    pub is_anomaly: bool,
    pub total_metrics: u64,
    pub anomalies_count: u64,
    /// When this response was built; drives cache freshness.
    pub timestamp: DateTime<Utc>,
    pub window_size: usize,
}

impl AnalyticsResponse {
    fn is_fresh(&self, now: DateTime<Utc>, freshness: Duration) -> bool {
        // A timestamp in the future (clock skew) counts as stale.
        now.signed_duration_since(self.timestamp)
            .to_std()
            .map_or(false, |age| age < freshness)
    }
}

/// `GET /analyze`
pub async fn analyze(State(state): State<AppState>) -> Response {
    let Some(cache) = &state.cache else {
        return with_cache_header(fresh_analytics(&state), "MISS");
    };

    match pulse_cache::get_json::<AnalyticsResponse>(cache.as_ref(), ANALYTICS_CACHE_KEY).await {
        Ok(Some(cached)) if cached.is_fresh(Utc::now(), state.cache_config.analytics_freshness()) => {
            return with_cache_header(cached, "HIT");
        }
        Ok(_) => {}
        Err(e) => tracing::debug!("Cache read failed, serving fresh analytics: {e}"),
    }

    let response = fresh_analytics(&state);
    let ttl = state.cache_config.analytics_ttl();
    if let Err(e) = pulse_cache::set_json(cache.as_ref(), ANALYTICS_CACHE_KEY, &response, ttl).await
    {
        tracing::debug!("Cache write failed: {e}");
    }
    with_cache_header(response, "MISS")
}

fn fresh_analytics(state: &AppState) -> AnalyticsResponse {
    let stats = state.stats.current_stats();
    AnalyticsResponse {
        rolling_average: stats.rolling_average,
        z_score: stats.current_z_score,
        is_anomaly: stats.is_anomaly,
        total_metrics: stats.total_samples_seen,
        anomalies_count: stats.anomalies_detected,
        timestamp: Utc::now(),
        window_size: state.stats.window_size(),
    }
}

fn with_cache_header(body: AnalyticsResponse, status: &'static str) -> Response {
    ([(X_CACHE, status)], Json(body)).into_response()
}

/// Service-level counters, as served by `GET /stats`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_requests: u64,
    pub total_anomalies: u64,
    /// `total_anomalies / total_requests`, `0` before the first sample.
    pub anomaly_ratio: f64,
    pub rolling_average: f64,
    /// Samples shed by the ingestion queue since start.
    pub samples_dropped: u64,
    /// Samples waiting for the analytics worker.
    pub queue_depth: usize,
    pub uptime: String,
    pub uptime_secs: u64,
    pub started_at: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

/// `GET /stats`
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.stats.current_stats();

    Json(StatsResponse {
        total_requests: stats.total_samples_seen,
        total_anomalies: stats.anomalies_detected,
        anomaly_ratio: stats.anomaly_ratio(),
        rolling_average: stats.rolling_average,
        samples_dropped: state.queue.dropped(),
        queue_depth: state.queue.pending(),
        uptime: state.uptime(),
        uptime_secs: state.stats.uptime().as_secs(),
        started_at: state.stats.started_at(),
        timestamp: Utc::now(),
    })
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub n: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub count: usize,
    /// Oldest first.
    pub samples: Vec<Sample>,
}

/// `GET /history?n=N`
pub async fn history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<HistoryResponse>> {
    let Query(query) =
        query.map_err(|e| ApiError::BadRequest(format!("Invalid query: {}", e.body_text())))?;
    let n = query.n.unwrap_or(DEFAULT_HISTORY).min(state.max_history);

    let samples = state.stats.recent_samples(n);
    Ok(Json(HistoryResponse {
        count: samples.len(),
        samples,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: f64,
    pub window_size: usize,
    pub timestamp: DateTime<Utc>,
}

/// `GET /predict`
pub async fn predict(State(state): State<AppState>) -> Json<PredictResponse> {
    Json(PredictResponse {
        prediction: state.stats.predict_next(),
        window_size: state.stats.window_size(),
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_at(timestamp: DateTime<Utc>) -> AnalyticsResponse {
        AnalyticsResponse {
            rolling_average: 0.0,
            z_score: 0.0,
            is_anomaly: false,
            total_metrics: 0,
            anomalies_count: 0,
            timestamp,
            window_size: 50,
        }
    }

    #[test]
    fn freshness_window() {
        let now = Utc::now();
        let freshness = Duration::from_secs(5);

        assert!(response_at(now - chrono::Duration::seconds(2)).is_fresh(now, freshness));
        assert!(!response_at(now - chrono::Duration::seconds(5)).is_fresh(now, freshness));
        assert!(!response_at(now + chrono::Duration::seconds(30)).is_fresh(now, freshness));
    }
}
