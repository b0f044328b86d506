use pulse_core::{PulseError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure parsed from `pulse.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Rolling window / detector / queue sizing.
    pub analytics: AnalyticsConfig,
    /// Short-lived result cache.
    pub cache: CacheConfig,
}

impl ServiceConfig {
    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        let a = &self.analytics;
        if a.window_size == 0 {
            return Err(PulseError::Config("analytics.window_size must be at least 1".into()));
        }
        if a.queue_capacity == 0 {
            return Err(PulseError::Config("analytics.queue_capacity must be at least 1".into()));
        }
        validate_threshold(a.z_threshold)?;

        let c = &self.cache;
        if c.analytics_freshness_secs > c.analytics_ttl_secs {
            return Err(PulseError::Config(format!(
                "cache.analytics_freshness_secs ({}) exceeds cache.analytics_ttl_secs ({})",
                c.analytics_freshness_secs, c.analytics_ttl_secs
            )));
        }
        if self.server.max_history == 0 {
            return Err(PulseError::Config("server.max_history must be at least 1".into()));
        }
        Ok(())
    }
}

/// A z-score threshold must be a finite, strictly positive number.
pub fn validate_threshold(z: f64) -> Result<()> {
    if z.is_finite() && z > 0.0 {
        Ok(())
    } else {
        Err(PulseError::Config(format!(
            "z_threshold must be a positive finite number, got {z}"
        )))
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for a single request, including body read.
    pub request_timeout_secs: u64,
    /// Largest `n` accepted by the history endpoint.
    pub max_history: usize,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host:                 "0.0.0.0".to_string(),
            port:                 8080,
            request_timeout_secs: 15,
            max_history:          1000,
        }
    }
}

/// Analytics core sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Number of most recent values kept in the rolling window.
    pub window_size: usize,
    /// `|z| > z_threshold` flags a sample as anomalous.
    pub z_threshold: f64,
    /// Pending samples the ingestion queue holds before shedding.
    pub queue_capacity: usize,
    /// Samples retained for the history endpoint.  `0` keeps everything.
    pub history_capacity: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            window_size:      50,
            z_threshold:      2.0,
            queue_capacity:   1000,
            history_capacity: 10_000,
        }
    }
}

/// Which store backs the result cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Shared Redis server at `cache.addr`.
    #[default]
    Redis,
    /// Process-local map; nothing survives a restart.
    Memory,
}

/// Result cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When `false` the service runs without any cache.
    pub enabled: bool,
    pub backend: CacheBackend,
    /// Redis address, `host:port`.
    pub addr: String,
    /// Sent with `AUTH` when non-empty.
    pub password: String,
    /// Logical database, selected when non-zero.
    pub db: u32,
    /// Per-operation deadline so a slow cache never stalls a request.
    pub timeout_ms: u64,
    /// How long the `/analyze` response stays in the cache.
    pub analytics_ttl_secs: u64,
    /// Cached `/analyze` responses older than this are rebuilt.
    pub analytics_freshness_secs: u64,
    /// How long raw ingested payloads stay in the cache.
    pub sample_ttl_secs: u64,
}

impl CacheConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn analytics_ttl(&self) -> Duration {
        Duration::from_secs(self.analytics_ttl_secs)
    }

    pub fn analytics_freshness(&self) -> Duration {
        Duration::from_secs(self.analytics_freshness_secs)
    }

    pub fn sample_ttl(&self) -> Duration {
        Duration::from_secs(self.sample_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled:                  true,
            backend:                  CacheBackend::Redis,
            addr:                     "localhost:6379".to_string(),
            password:                 String::new(),
            db:                       0,
            timeout_ms:               250,
            analytics_ttl_secs:       10,
            analytics_freshness_secs: 5,
            sample_ttl_secs:          300,
        }
    }
}
