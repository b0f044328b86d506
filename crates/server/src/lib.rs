//! HTTP surface of the pulse service and its lifecycle.
//!
//! [`run`] wires configuration, telemetry, the analytics worker and the
//! result cache together, then serves the API until Ctrl+C or SIGTERM.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use router::create_router;
pub use state::AppState;

use pulse_analytics::WorkerHandle;
use pulse_config::{ConfigWatcher, ServiceConfig};
use pulse_core::{PulseError, Result};
use pulse_telemetry::Metrics;
use std::future::IntoFuture;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Run the service until a shutdown signal arrives.
///
/// Only configuration and bind errors are fatal; an unreachable cache is
/// logged and tolerated.
pub async fn run() -> Result<()> {
    let config_path = pulse_config::default_path();
    let config = pulse_config::load_effective(&config_path)?;
    info!(
        window_size = config.analytics.window_size,
        z_threshold = config.analytics.z_threshold,
        "Configuration loaded from {}",
        config_path.display()
    );

    let metrics = Arc::new(Metrics::new()?);
    let analytics = pulse_analytics::spawn(&config.analytics, metrics.clone());

    let cache = match pulse_cache::from_config(&config.cache) {
        Ok(cache) => cache,
        Err(e) => {
            analytics.worker.stop().await;
            return Err(e);
        }
    };
    match &cache {
        Some(cache) => match cache.ping().await {
            Ok(()) => info!(backend = cache.backend(), "Result cache connected"),
            Err(e) => warn!(
                backend = cache.backend(),
                "Result cache unreachable, continuing without it: {e}"
            ),
        },
        None => info!("Result cache disabled"),
    }

    let state = AppState::new(
        analytics.queue.clone(),
        analytics.stats.clone(),
        metrics,
        cache,
        config.cache.clone(),
        config.server.max_history,
    );
    let app = create_router(state, config.server.request_timeout());

    let addr = config.server.bind_addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            analytics.worker.stop().await;
            return Err(PulseError::Server(format!("cannot bind {addr}: {e}")));
        }
    };
    info!("pulse listening on {addr}");

    let (watcher, changes) = ConfigWatcher::spawn(&config_path);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    let served = tokio::select! {
        result = server => result.map_err(PulseError::from),
        () = follow_config(watcher.path(), config, changes, &analytics.worker) => Ok(()),
    };

    info!("pulse shutting down");
    analytics.worker.stop().await;
    served
}

/// Apply config file changes for as long as the server runs.
async fn follow_config(
    path: &Path,
    mut running: ServiceConfig,
    mut changes: mpsc::Receiver<()>,
    worker: &WorkerHandle,
) {
    while changes.recv().await.is_some() {
        let next = match pulse_config::load_effective(path) {
            Ok(next) => next,
            Err(e) => {
                warn!("Ignoring config change: {e}");
                continue;
            }
        };

        let reload = Reload::between(&running, &next);
        if let Some(z) = reload.z_threshold {
            match worker.set_threshold(z) {
                Ok(()) => running.analytics.z_threshold = z,
                Err(e) => warn!("Cannot apply new threshold: {e}"),
            }
        }
        if reload.restart_required {
            warn!("Config changes besides analytics.z_threshold take effect after a restart");
        }
    }

    // Live reload unavailable; keep serving.
    std::future::pending::<()>().await
}

/// What a config change means for the running service.
#[derive(Debug, PartialEq)]
struct Reload {
    /// New threshold to push to the worker.
    z_threshold: Option<f64>,
    restart_required: bool,
}

impl Reload {
    fn between(running: &ServiceConfig, next: &ServiceConfig) -> Self {
        let z = next.analytics.z_threshold;
        let z_threshold = (z != running.analytics.z_threshold).then_some(z);

        let mut rest = next.clone();
        rest.analytics.z_threshold = running.analytics.z_threshold;

        Self {
            z_threshold,
            restart_required: rest != *running,
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
