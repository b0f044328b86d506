use crate::detector::{AnomalyDetector, MIN_SAMPLES};
use crate::history::SharedHistory;
use crate::window::RollingWindow;
use pulse_core::{DerivedStats, Sample};
use pulse_telemetry::Metrics;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

/// Everything the analytics worker mutates.
///
/// Owned by exactly one task; other components only see the
/// [`DerivedStats`] it publishes and copies of the history.
#[derive(Debug)]
pub struct AnalyticsState {
    window:   RollingWindow,
    detector: AnomalyDetector,
    history:  SharedHistory,
    stats:    DerivedStats,
    publish:  watch::Sender<DerivedStats>,
    metrics:  Arc<Metrics>,
}

impl AnalyticsState {
    pub fn new(
        window_size: usize,
        z_threshold: f64,
        history: SharedHistory,
        publish: watch::Sender<DerivedStats>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            window: RollingWindow::new(window_size),
            detector: AnomalyDetector::new(z_threshold),
            history,
            stats: DerivedStats::default(),
            publish,
            metrics,
        }
    }

    /// Fold one sample into the window, publish the resulting statistics and
    /// return them.
    pub fn process(&mut self, sample: Sample) -> DerivedStats {
        let value = sample.value();

        self.window.push(value);
        self.stats.total_samples_seen += 1;

        self.stats.rolling_average = self.window.mean();
        self.metrics.rolling_average.set(self.stats.rolling_average);

        if self.window.len() >= MIN_SAMPLES {
            let eval = self.detector.evaluate(&self.window, value);
            self.stats.current_z_score = eval.z_score;
            self.stats.is_anomaly = eval.is_anomaly;

            if eval.is_anomaly {
                self.stats.anomalies_detected += 1;
                self.metrics.anomalies_total.inc();
                warn!(
                    value,
                    mean = self.stats.rolling_average,
                    z_score = eval.z_score,
                    "Anomaly detected"
                );
            }
        }

        // History and stats change together: a reader holding the history
        // read lock never sees a sample the published stats do not count.
        let mut history = self.history.write();
        history.append(sample);
        self.publish.send_replace(self.stats);
        drop(history);

        self.metrics.samples_processed.inc();
        self.stats
    }

    /// Receiver for the statistics published after every sample.
    pub fn subscribe(&self) -> watch::Receiver<DerivedStats> {
        self.publish.subscribe()
    }

    pub fn stats(&self) -> DerivedStats {
        self.stats
    }

    pub fn z_threshold(&self) -> f64 {
        self.detector.z_threshold()
    }

    pub fn set_z_threshold(&mut self, z_threshold: f64) {
        self.detector.set_z_threshold(z_threshold);
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }
}
