use serde::{Deserialize, Serialize};

/// Point-in-time statistics derived by the analytics worker.
///
/// The worker is the only writer; everyone else receives copies of the most
/// recently published value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedStats {
    /// Mean of the values currently inside the rolling window.
    pub rolling_average: f64,
    /// Z-score of the latest sample that went through the detector.
    pub current_z_score: f64,
    /// Whether that sample was classified as anomalous.
    pub is_anomaly: bool,
    /// Samples processed since start.  Never decreases.
    pub total_samples_seen: u64,
    /// Samples classified as anomalous since start.  Never decreases.
    pub anomalies_detected: u64,
}

impl DerivedStats {
    /// Share of processed samples that were flagged, in `[0, 1]`.
    #[must_use]
    pub fn anomaly_ratio(&self) -> f64 {
        if self.total_samples_seen == 0 {
            return 0.0;
        }
        self.anomalies_detected as f64 / self.total_samples_seen as f64
    }
}
