//! Streaming analytics core.
//!
//! Producers hand [`Sample`](pulse_core::Sample)s to an [`IngestQueue`]; a single worker task owns
//! the [`RollingWindow`], [`AnomalyDetector`] and history, and publishes
//! [`DerivedStats`] that request handlers read through [`StatsProvider`].

pub mod detector;
pub mod history;
pub mod queue;
pub mod snapshot;
pub mod state;
pub mod window;
pub mod worker;

pub use detector::{AnomalyDetector, Evaluation, MIN_SAMPLES};
pub use history::{HistoryLog, SharedHistory};
pub use queue::IngestQueue;
pub use snapshot::StatsProvider;
pub use state::AnalyticsState;
pub use window::RollingWindow;
pub use worker::WorkerHandle;

use pulse_config::AnalyticsConfig;
use pulse_core::DerivedStats;
use pulse_telemetry::Metrics;
use std::sync::Arc;
use tokio::sync::watch;

/// The three faces of a running analytics pipeline.
#[derive(Debug)]
pub struct Analytics {
    /// Producer handle, clone one per request handler.
    pub queue: IngestQueue,
    /// Reader handle for statistics and history.
    pub stats: StatsProvider,
    /// Lifecycle and tuning control of the worker task.
    pub worker: WorkerHandle,
}

/// Build the queue, history and worker described by `config` and start the
/// worker on the current Tokio runtime.
pub fn spawn(config: &AnalyticsConfig, metrics: Arc<Metrics>) -> Analytics {
    let history = history::shared(config.history_capacity);
    let (queue, rx) = IngestQueue::bounded(config.queue_capacity, metrics.clone());
    let (publish, _) = watch::channel(DerivedStats::default());

    let state = AnalyticsState::new(
        config.window_size,
        config.z_threshold,
        history.clone(),
        publish,
        metrics,
    );
    let stats_rx = state.subscribe();
    let worker = WorkerHandle::spawn(state, rx);
    let stats = StatsProvider::new(
        stats_rx,
        worker.subscribe_threshold(),
        history,
        config.window_size,
    );

    Analytics {
        queue,
        stats,
        worker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pulse_core::Sample;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn config(window_size: usize, queue_capacity: usize) -> AnalyticsConfig {
        AnalyticsConfig {
            window_size,
            z_threshold: 2.0,
            queue_capacity,
            history_capacity: 0,
        }
    }

    fn start(config: &AnalyticsConfig) -> Analytics {
        spawn(config, Arc::new(Metrics::new().unwrap()))
    }

    async fn wait_for_total(stats: &StatsProvider, total: u64) -> DerivedStats {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let current = stats.current_stats();
                if current.total_samples_seen >= total {
                    return current;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("worker did not catch up")
    }

    fn offer_all(queue: &IngestQueue, values: &[f64]) -> usize {
        values
            .iter()
            .filter(|v| queue.offer(Sample::new(Utc::now(), **v)))
            .count()
    }

    #[tokio::test]
    async fn worker_flags_spike_after_flat_run() {
        let analytics = start(&config(10, 1000));
        let mut values = vec![10.0; 10];
        values.push(100.0);
        offer_all(&analytics.queue, &values);

        let stats = wait_for_total(&analytics.stats, 11).await;
        assert!(stats.is_anomaly);
        assert_eq!(stats.anomalies_detected, 1);
        assert_eq!(stats.rolling_average, 19.0);

        analytics.worker.stop().await;
    }

    #[tokio::test]
    async fn short_stream_is_never_anomalous() {
        let analytics = start(&config(50, 1000));
        offer_all(&analytics.queue, &[3.0, 900.0, 4.0, -50.0, 7.0]);

        let stats = wait_for_total(&analytics.stats, 5).await;
        assert!(!stats.is_anomaly);
        assert_eq!(stats.current_z_score, 0.0);
        assert_eq!(stats.anomalies_detected, 0);

        analytics.worker.stop().await;
    }

    #[tokio::test]
    async fn burst_beyond_capacity_is_shed() {
        // Current-thread runtime: the worker cannot run until this task
        // yields, so the whole burst hits a full queue.
        let analytics = start(&config(50, 1000));
        let values: Vec<f64> = (0..1500u32).map(f64::from).collect();

        let accepted = offer_all(&analytics.queue, &values);
        assert_eq!(accepted, 1000);
        assert_eq!(analytics.queue.dropped(), 500);

        let stats = wait_for_total(&analytics.stats, accepted as u64).await;
        assert_eq!(stats.total_samples_seen, accepted as u64);
        assert!(stats.total_samples_seen <= values.len() as u64);

        analytics.worker.stop().await;
    }

    #[tokio::test]
    async fn reads_are_stable_between_samples() {
        let analytics = start(&config(10, 100));
        offer_all(&analytics.queue, &[1.0, 2.0, 3.0]);
        wait_for_total(&analytics.stats, 3).await;

        let first = analytics.stats.current_stats();
        let second = analytics.stats.current_stats();
        assert_eq!(first, second);
        assert_eq!(analytics.stats.predict_next(), 2.0);

        analytics.worker.stop().await;
    }

    #[tokio::test]
    async fn history_request_larger_than_stored_returns_all() {
        let analytics = start(&config(10, 100));
        offer_all(&analytics.queue, &[1.0, 2.0, 3.0, 4.0]);
        wait_for_total(&analytics.stats, 4).await;

        let recent = analytics.stats.recent_samples(100);
        let values: Vec<f64> = recent.iter().map(Sample::value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);

        analytics.worker.stop().await;
    }

    #[tokio::test]
    async fn stopped_worker_closes_the_queue() {
        let analytics = start(&config(10, 100));
        offer_all(&analytics.queue, &[1.0]);
        wait_for_total(&analytics.stats, 1).await;

        analytics.worker.stop().await;

        assert!(analytics.queue.is_closed());
        assert!(!analytics.queue.offer(Sample::new(Utc::now(), 2.0)));
        assert_eq!(analytics.stats.current_stats().total_samples_seen, 1);
    }

    #[tokio::test]
    async fn threshold_updates_reach_the_worker() {
        let mut cfg = config(10, 100);
        cfg.z_threshold = 100.0;
        let analytics = start(&cfg);

        let mut values = vec![10.0; 10];
        values.push(100.0);
        offer_all(&analytics.queue, &values);
        assert!(!wait_for_total(&analytics.stats, 11).await.is_anomaly);

        analytics.worker.set_threshold(1.0).unwrap();
        assert_eq!(analytics.stats.z_threshold(), 1.0);
        tokio::task::yield_now().await;

        offer_all(&analytics.queue, &[100.0]);
        assert!(wait_for_total(&analytics.stats, 12).await.is_anomaly);

        assert!(analytics.worker.set_threshold(-1.0).is_err());
        analytics.worker.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn readers_never_see_history_ahead_of_stats() {
        const SAMPLES: u32 = 6000;
        let analytics = start(&config(50, SAMPLES as usize));
        let done = Arc::new(AtomicBool::new(false));

        let reader = {
            let stats = analytics.stats.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                let mut ahead = 0u32;
                while !done.load(Ordering::Relaxed) {
                    let stored = stats.recent_samples(usize::MAX).len() as u64;
                    if stored > stats.current_stats().total_samples_seen {
                        ahead += 1;
                    }
                }
                ahead
            })
        };

        let values: Vec<f64> = (0..SAMPLES).map(f64::from).collect();
        assert_eq!(offer_all(&analytics.queue, &values), SAMPLES as usize);
        wait_for_total(&analytics.stats, u64::from(SAMPLES)).await;

        done.store(true, Ordering::Relaxed);
        assert_eq!(reader.join().unwrap(), 0);

        analytics.worker.stop().await;
    }
}
