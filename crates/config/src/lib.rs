pub mod schema;
pub mod watcher;

pub use schema::{
    validate_threshold, AnalyticsConfig, CacheBackend, CacheConfig, ServerConfig, ServiceConfig,
};
pub use watcher::ConfigWatcher;

use pulse_core::{PulseError, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file.  Returns `ServiceConfig::default()` if
/// the file doesn't exist so the service always has sensible defaults.
pub fn load(path: impl AsRef<Path>) -> Result<ServiceConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!(
            "Config file not found at '{}'; using defaults.",
            path.display()
        );
        return Ok(ServiceConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| PulseError::Config(format!("cannot read '{}': {e}", path.display())))?;

    toml::from_str(&raw).map_err(|e| PulseError::Config(format!("TOML parse error: {e}")))
}

/// Load, apply environment overrides and validate in one step.
pub fn load_effective(path: impl AsRef<Path>) -> Result<ServiceConfig> {
    let mut config = load(path)?;
    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Return the default config path: `$PULSE_CONFIG` if set, otherwise
/// `pulse/pulse.toml` under `$XDG_CONFIG_HOME` (or `~/.config`).
pub fn default_path() -> PathBuf {
    if let Ok(path) = std::env::var("PULSE_CONFIG") {
        return PathBuf::from(path);
    }

    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("pulse").join("pulse.toml")
}

/// Overlay deployment-time settings from the process environment.
pub fn apply_env_overrides(config: &mut ServiceConfig) -> Result<()> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Environment variables recognised on top of the TOML file.
fn apply_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("SERVER_PORT") {
        config.server.port = parse_var("SERVER_PORT", &port)?;
    }
    if let Some(addr) = lookup("REDIS_ADDR") {
        config.cache.addr = addr;
    }
    if let Some(password) = lookup("REDIS_PASSWORD") {
        config.cache.password = password;
    }
    if let Some(size) = lookup("WINDOW_SIZE") {
        config.analytics.window_size = parse_var("WINDOW_SIZE", &size)?;
    }
    if let Some(z) = lookup("ANOMALY_Z_SCORE") {
        config.analytics.z_threshold = parse_var("ANOMALY_Z_SCORE", &z)?;
    }
    Ok(())
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| PulseError::Config(format!("invalid {name} '{raw}': {e}")))
}
