//! Application state for API handlers

use pulse_analytics::{IngestQueue, StatsProvider};
use pulse_cache::ResultCache;
use pulse_config::CacheConfig;
use pulse_telemetry::Metrics;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Producer side of the analytics queue.
    pub queue: IngestQueue,

    /// Read side of the analytics state.
    pub stats: StatsProvider,

    pub metrics: Arc<Metrics>,

    /// `None` when caching is disabled.
    pub cache: Option<Arc<dyn ResultCache>>,

    /// TTLs and freshness for cached responses.
    pub cache_config: CacheConfig,

    /// Upper bound for `GET /history?n=`.
    pub max_history: usize,
}

impl AppState {
    pub fn new(
        queue: IngestQueue,
        stats: StatsProvider,
        metrics: Arc<Metrics>,
        cache: Option<Arc<dyn ResultCache>>,
        cache_config: CacheConfig,
        max_history: usize,
    ) -> Self {
        Self {
            queue,
            stats,
            metrics,
            cache,
            cache_config,
            max_history,
        }
    }

    /// Human-readable uptime, e.g. `3m 12s`.
    pub fn uptime(&self) -> String {
        format_uptime(self.stats.uptime())
    }
}

fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();

    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}
