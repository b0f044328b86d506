use parking_lot::RwLock;
use pulse_core::Sample;
use std::collections::VecDeque;
use std::sync::Arc;

/// Append-only log of processed samples, oldest first.
///
/// Bounded by `capacity`; a capacity of `0` retains every sample.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries:  VecDeque<Sample>,
    capacity: usize,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub fn append(&mut self, sample: Sample) {
        if self.capacity > 0 && self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(sample);
    }

    /// Copy of the last `min(n, len)` samples, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Sample> {
        let start = self.entries.len().saturating_sub(n);
        self.entries.range(start..).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// History log shared between the worker (appends) and readers (copies).
pub type SharedHistory = Arc<RwLock<HistoryLog>>;

pub fn shared(capacity: usize) -> SharedHistory {
    Arc::new(RwLock::new(HistoryLog::new(capacity)))
}
