//! Request accounting

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use pulse_telemetry::Metrics;
use std::sync::Arc;
use std::time::Instant;

/// Label used for requests that matched no route.
const UNMATCHED: &str = "unmatched";

/// Count, time and track in-flight requests per matched route.
pub async fn track_requests(
    State(metrics): State<Arc<Metrics>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED.to_string(), |path| path.as_str().to_string());

    let _in_flight = InFlight::enter(&metrics);
    let started = Instant::now();
    let response = next.run(request).await;

    metrics.observe_request(
        &method,
        &endpoint,
        response.status().as_u16(),
        started.elapsed(),
    );
    response
}

/// Keeps `active_connections` balanced even if the request future is dropped.
struct InFlight<'a>(&'a Metrics);

impl<'a> InFlight<'a> {
    fn enter(metrics: &'a Metrics) -> Self {
        metrics.active_connections.inc();
        Self(metrics)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.active_connections.dec();
    }
}
