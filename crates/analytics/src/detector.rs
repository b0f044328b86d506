use crate::window::RollingWindow;

/// Fewer values than this and the detector stays silent.
pub const MIN_SAMPLES: usize = 10;

/// Standard deviations below this are treated as a flat window.
pub const STD_DEV_EPSILON: f64 = 1e-4;

/// Outcome of scoring one value against the window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Evaluation {
    pub z_score:    f64,
    pub is_anomaly: bool,
}

impl Evaluation {
    const INACTIVE: Self = Self {
        z_score:    0.0,
        is_anomaly: false,
    };
}

/// Rolling z-score test.
///
/// The window passed to [`AnomalyDetector::evaluate`] is expected to already
/// contain the value being scored, so the mean and standard deviation include
/// it.  For a single spike this pulls the score toward zero (a spike in a
/// window of `n` values can never score above `sqrt(n - 1)`).
#[derive(Debug, Clone, Copy)]
pub struct AnomalyDetector {
    z_threshold: f64,
}

impl AnomalyDetector {
    pub fn new(z_threshold: f64) -> Self {
        Self { z_threshold }
    }

    pub fn z_threshold(&self) -> f64 {
        self.z_threshold
    }

    pub fn set_z_threshold(&mut self, z_threshold: f64) {
        self.z_threshold = z_threshold;
    }

    pub fn evaluate(&self, window: &RollingWindow, value: f64) -> Evaluation {
        if window.len() < MIN_SAMPLES {
            return Evaluation::INACTIVE;
        }

        let std_dev = window.std_dev();
        if std_dev < STD_DEV_EPSILON {
            return Evaluation::INACTIVE;
        }

        let z_score = (value - window.mean()) / std_dev;
        Evaluation {
            z_score,
            is_anomaly: z_score.abs() > self.z_threshold,
        }
    }
}
