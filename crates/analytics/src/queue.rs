use pulse_core::Sample;
use pulse_telemetry::Metrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Drops are logged on the first occurrence and then once per this many.
const DROP_LOG_EVERY: u64 = 1000;

/// Producer side of the bounded hand-off to the analytics worker.
///
/// [`IngestQueue::offer`] never waits: when the queue is full the sample is
/// shed and counted.  Clones share the same queue and drop counter.
#[derive(Debug, Clone)]
pub struct IngestQueue {
    tx:      mpsc::Sender<Sample>,
    dropped: Arc<AtomicU64>,
    metrics: Arc<Metrics>,
}

impl IngestQueue {
    /// Create a queue holding up to `capacity` pending samples (at least one).
    /// The receiver belongs to the analytics worker.
    pub fn bounded(capacity: usize, metrics: Arc<Metrics>) -> (Self, mpsc::Receiver<Sample>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let queue = Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
            metrics,
        };
        (queue, rx)
    }

    /// Hand a sample to the worker.  Returns `false` if it was dropped.
    pub fn offer(&self, sample: Sample) -> bool {
        match self.tx.try_send(sample) {
            Ok(()) => {
                self.metrics.samples_ingested.inc();
                true
            }
            Err(TrySendError::Full(_)) => {
                let total = self.record_drop();
                if total == 1 || total % DROP_LOG_EVERY == 0 {
                    warn!(
                        dropped_total = total,
                        capacity = self.capacity(),
                        "Ingestion queue full; shedding samples"
                    );
                }
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.record_drop();
                debug!("Analytics worker stopped; sample discarded");
                false
            }
        }
    }

    /// Samples shed since start.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Samples waiting for the worker.  Approximate under concurrency.
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn record_drop(&self) -> u64 {
        self.metrics.samples_dropped.inc();
        self.dropped.fetch_add(1, Ordering::Relaxed) + 1
    }
}
