//! Sample ingestion

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use pulse_core::Sample;
use serde::{Deserialize, Serialize};

/// Body of `POST /metrics-data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPayload {
    /// Unix seconds; `0` or absent means "now".
    #[serde(default)]
    pub timestamp: i64,
    /// CPU utilisation in percent.
    pub cpu: f64,
    /// Requests per second; the value analysed.
    pub rps: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,
}

impl MetricPayload {
    pub fn validate(&self) -> ApiResult<()> {
        if !self.rps.is_finite() || self.rps < 0.0 {
            return Err(ApiError::BadRequest(format!(
                "rps must be a non-negative number, got {}",
                self.rps
            )));
        }
        if !(0.0..=100.0).contains(&self.cpu) {
            return Err(ApiError::BadRequest(format!(
                "cpu must be between 0 and 100, got {}",
                self.cpu
            )));
        }
        for (name, value) in [("memory", self.memory), ("latency", self.latency)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(ApiError::BadRequest(format!(
                        "{name} must be a non-negative number, got {v}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Resolve the timestamp, substituting `now` for `0`.
    pub fn resolve_timestamp(&self, now: DateTime<Utc>) -> ApiResult<DateTime<Utc>> {
        if self.timestamp == 0 {
            return Ok(now);
        }
        DateTime::from_timestamp(self.timestamp, 0).ok_or_else(|| {
            ApiError::BadRequest(format!("timestamp {} is out of range", self.timestamp))
        })
    }

    /// Build the sample analysed downstream: `rps` is the value, the rest
    /// rides along as auxiliary fields.
    pub fn to_sample(&self, timestamp: DateTime<Utc>) -> Sample {
        let mut sample = Sample::new(timestamp, self.rps).with_aux("cpu", self.cpu);
        if let Some(memory) = self.memory {
            sample = sample.with_aux("memory", memory);
        }
        if let Some(latency) = self.latency {
            sample = sample.with_aux("latency", latency);
        }
        sample
    }
}

/// Acknowledgement body.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status: String,
    pub message: String,
}

/// `POST /metrics-data`
///
/// Always answers `202` once the payload is valid: a sample shed by a full
/// queue is counted, not reported to the client.
pub async fn ingest_metric(
    State(state): State<AppState>,
    payload: Result<Json<MetricPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<IngestResponse>)> {
    let Json(mut payload) =
        payload.map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {}", e.body_text())))?;
    payload.validate()?;

    let timestamp = payload.resolve_timestamp(Utc::now())?;
    payload.timestamp = timestamp.timestamp();

    // Queued before the cache write so a slow cache never delays analysis.
    state.queue.offer(payload.to_sample(timestamp));

    if let Some(cache) = &state.cache {
        let key = format!("metric:{}", payload.timestamp);
        let ttl = state.cache_config.sample_ttl();
        if let Err(e) = pulse_cache::set_json(cache.as_ref(), &key, &payload, ttl).await {
            tracing::warn!(key, "Cache write failed: {e}");
        }
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            status: "accepted".to_string(),
            message: "Metric received successfully".to_string(),
        }),
    ))
}
