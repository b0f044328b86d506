//! Short-lived result cache.
//!
//! The cache is strictly best-effort: handlers treat every error as a miss
//! and carry on, so an unavailable backend costs latency, never correctness.

pub mod client;
pub mod memory;

pub use client::RedisCache;
pub use memory::MemoryCache;

use async_trait::async_trait;
use pulse_config::{CacheBackend, CacheConfig};
use pulse_core::{PulseError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Key/value store with per-entry expiry.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// `Ok(None)` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`.  A zero `ttl` keeps the entry indefinitely.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Round-trip to the backend; used by `/health`.
    async fn ping(&self) -> Result<()>;

    /// Short backend name for logs and `/health`.
    fn backend(&self) -> &'static str;
}

/// Build the cache described by `config`, or `None` when caching is disabled.
///
/// Fails only on a malformed Redis address; reachability is checked later.
pub fn from_config(config: &CacheConfig) -> Result<Option<Arc<dyn ResultCache>>> {
    if !config.enabled {
        return Ok(None);
    }
    let cache: Arc<dyn ResultCache> = match config.backend {
        CacheBackend::Redis => Arc::new(RedisCache::new(config)?),
        CacheBackend::Memory => Arc::new(MemoryCache::new()),
    };
    Ok(Some(cache))
}

/// Fetch and decode a JSON value.  Undecodable entries read as a miss.
pub async fn get_json<T>(cache: &dyn ResultCache, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    let Some(raw) = cache.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::debug!(key, "Ignoring undecodable cache entry: {e}");
            Ok(None)
        }
    }
}

/// Encode `value` as JSON and store it.
pub async fn set_json<T>(cache: &dyn ResultCache, key: &str, value: &T, ttl: Duration) -> Result<()>
where
    T: Serialize + Sync,
{
    let raw = serde_json::to_string(value)
        .map_err(|e| PulseError::Cache(format!("cannot encode '{key}': {e}")))?;
    cache.set(key, &raw, ttl).await
}
