use crate::state::AnalyticsState;
use pulse_config::validate_threshold;
use pulse_core::{Result, Sample};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Control side of a running analytics worker.
///
/// Dropping the handle stops the worker at the next sample boundary, the same
/// as [`WorkerHandle::stop`] without waiting for it.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown:  watch::Sender<bool>,
    threshold: watch::Sender<f64>,
    task:      JoinHandle<()>,
}

impl WorkerHandle {
    /// Spawn the worker on the current Tokio runtime.
    ///
    /// Statistics are published through the state's own channel, see
    /// [`AnalyticsState::subscribe`].
    pub fn spawn(state: AnalyticsState, rx: mpsc::Receiver<Sample>) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (threshold, threshold_rx) = watch::channel(state.z_threshold());

        let task = tokio::spawn(run(state, rx, shutdown_rx, threshold_rx));

        Self {
            shutdown,
            threshold,
            task,
        }
    }

    /// Change the anomaly threshold.  Takes effect before the next sample.
    pub fn set_threshold(&self, z_threshold: f64) -> Result<()> {
        validate_threshold(z_threshold)?;
        self.threshold.send_replace(z_threshold);
        Ok(())
    }

    /// Threshold most recently requested through this handle.
    pub fn threshold(&self) -> f64 {
        *self.threshold.borrow()
    }

    /// Follow threshold changes from elsewhere (the stats provider does).
    pub fn subscribe_threshold(&self) -> watch::Receiver<f64> {
        self.threshold.subscribe()
    }

    /// Ask the worker to stop and wait until it has.  A sample already being
    /// processed completes; samples still queued are discarded.
    pub async fn stop(self) {
        self.shutdown.send_replace(true);
        if let Err(e) = self.task.await {
            tracing::error!("Analytics worker terminated abnormally: {e}");
        }
    }
}

async fn run(
    mut state: AnalyticsState,
    mut rx: mpsc::Receiver<Sample>,
    mut shutdown: watch::Receiver<bool>,
    mut threshold: watch::Receiver<f64>,
) {
    info!(
        window_size = state.window().capacity(),
        z_threshold = state.z_threshold(),
        "Analytics worker started"
    );

    loop {
        tokio::select! {
            // Control signals win over queued samples.
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow_and_update() {
                    break;
                }
            }
            changed = threshold.changed() => {
                if changed.is_err() {
                    break; // handle dropped
                }
                let z = *threshold.borrow_and_update();
                info!(z_threshold = z, "Anomaly threshold updated");
                state.set_z_threshold(z);
            }
            next = rx.recv() => match next {
                Some(sample) => {
                    state.process(sample);
                }
                None => break, // every producer gone
            },
        }
    }

    rx.close();
    let mut discarded = 0usize;
    while rx.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        debug!(discarded, "Pending samples discarded at shutdown");
    }

    let stats = state.stats();
    info!(
        total_samples = stats.total_samples_seen,
        anomalies = stats.anomalies_detected,
        "Analytics worker stopped"
    );
}
