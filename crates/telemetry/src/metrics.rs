//! Prometheus collectors for the service.

use prometheus::{
    core::Collector, Encoder, Gauge, HistogramOpts, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, Opts, Registry, TextEncoder,
};
use pulse_core::{PulseError, Result};
use std::time::Duration;

/// All counters, gauges and histograms the service updates, bound to one
/// private registry.  Cheap to share behind an `Arc`.
pub struct Metrics {
    registry: Registry,

    /// HTTP requests by method, matched route and status code.
    pub requests_total: IntCounterVec,
    /// HTTP request latency by method and matched route.
    pub request_duration: HistogramVec,
    /// Requests currently being served.
    pub active_connections: IntGauge,

    /// Samples classified as anomalous.
    pub anomalies_total: IntCounter,
    /// Mean of the rolling window after the latest sample.
    pub rolling_average: Gauge,

    /// Samples accepted by the ingestion queue.
    pub samples_ingested: IntCounter,
    /// Samples shed because the ingestion queue was full or closed.
    pub samples_dropped: IntCounter,
    /// Samples fully processed by the analytics worker.
    pub samples_processed: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "endpoint", "status"],
        )
        .map_err(telemetry_err)?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request latencies in seconds",
            ),
            &["method", "endpoint"],
        )
        .map_err(telemetry_err)?;
        let active_connections =
            IntGauge::new("active_connections", "Number of active HTTP connections")
                .map_err(telemetry_err)?;
        let anomalies_total =
            IntCounter::new("anomalies_detected_total", "Total number of anomalies detected")
                .map_err(telemetry_err)?;
        let rolling_average =
            Gauge::new("metrics_rolling_average", "Current rolling average of RPS metrics")
                .map_err(telemetry_err)?;
        let samples_ingested = IntCounter::new(
            "samples_ingested_total",
            "Samples accepted by the ingestion queue",
        )
        .map_err(telemetry_err)?;
        let samples_dropped = IntCounter::new(
            "samples_dropped_total",
            "Samples dropped because the ingestion queue was saturated",
        )
        .map_err(telemetry_err)?;
        let samples_processed = IntCounter::new(
            "samples_processed_total",
            "Samples processed by the analytics worker",
        )
        .map_err(telemetry_err)?;

        register(&registry, &requests_total)?;
        register(&registry, &request_duration)?;
        register(&registry, &active_connections)?;
        register(&registry, &anomalies_total)?;
        register(&registry, &rolling_average)?;
        register(&registry, &samples_ingested)?;
        register(&registry, &samples_dropped)?;
        register(&registry, &samples_processed)?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
            active_connections,
            anomalies_total,
            rolling_average,
            samples_ingested,
            samples_dropped,
            samples_processed,
        })
    }

    /// Record one finished HTTP request.
    pub fn observe_request(&self, method: &str, endpoint: &str, status: u16, elapsed: Duration) {
        self.request_duration
            .with_label_values(&[method, endpoint])
            .observe(elapsed.as_secs_f64());
        self.requests_total
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
    }

    /// Export everything in the Prometheus text exposition format.
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer).map_err(telemetry_err)?;
        String::from_utf8(buffer).map_err(|e| PulseError::Telemetry(e.to_string()))
    }

    /// MIME type to serve [`Metrics::export`] output with.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

fn register<C>(registry: &Registry, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(telemetry_err)
}

fn telemetry_err(e: prometheus::Error) -> PulseError {
    PulseError::Telemetry(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_lists_analytics_series() {
        let metrics = Metrics::new().unwrap();
        metrics.anomalies_total.inc();
        metrics.rolling_average.set(18.5);
        metrics.samples_dropped.inc_by(3);

        let output = metrics.export().unwrap();
        assert!(output.contains("anomalies_detected_total 1"));
        assert!(output.contains("metrics_rolling_average 18.5"));
        assert!(output.contains("samples_dropped_total 3"));
    }

    #[test]
    fn observe_request_is_labelled() {
        let metrics = Metrics::new().unwrap();
        metrics.observe_request("POST", "/metrics-data", 202, Duration::from_millis(3));

        let output = metrics.export().unwrap();
        assert!(output.contains(
            r#"http_requests_total{endpoint="/metrics-data",method="POST",status="202"} 1"#
        ));
        assert!(output.contains("http_request_duration_seconds_bucket"));
    }

    #[test]
    fn instances_do_not_share_registries() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.samples_processed.inc();
        assert_eq!(b.samples_processed.get(), 0);
    }
}
