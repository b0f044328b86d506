use crate::history::SharedHistory;
use chrono::{DateTime, Utc};
use pulse_core::{DerivedStats, Sample};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Read-only view of the analytics state for request handlers.
///
/// Statistics come from the value the worker last published as a whole, so a
/// reader sees either the previous or the new snapshot, never a mix.  History
/// reads copy the requested tail out from under a short read lock.
#[derive(Debug, Clone)]
pub struct StatsProvider {
    stats:       watch::Receiver<DerivedStats>,
    threshold:   watch::Receiver<f64>,
    history:     SharedHistory,
    window_size: usize,
    started:     Instant,
    started_at:  DateTime<Utc>,
}

impl StatsProvider {
    pub fn new(
        stats: watch::Receiver<DerivedStats>,
        threshold: watch::Receiver<f64>,
        history: SharedHistory,
        window_size: usize,
    ) -> Self {
        Self {
            stats,
            threshold,
            history,
            window_size,
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Most recently published statistics.
    pub fn current_stats(&self) -> DerivedStats {
        *self.stats.borrow()
    }

    /// Copy of up to the last `n` processed samples, oldest first.
    pub fn recent_samples(&self, n: usize) -> Vec<Sample> {
        self.history.read().recent(n)
    }

    /// Naive one-step forecast: the current rolling average.
    pub fn predict_next(&self) -> f64 {
        self.current_stats().rolling_average
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Threshold currently configured for the detector.
    pub fn z_threshold(&self) -> f64 {
        *self.threshold.borrow()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}
