use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One ingested measurement.
///
/// `value` is the scalar the analytics pipeline tracks (requests per second);
/// `auxiliary` carries the tags that arrived with it (`cpu`, `memory`,
/// `latency`).  Fields are private so a sample cannot change after it has
/// been handed to the ingestion queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    timestamp: DateTime<Utc>,
    value:     f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    auxiliary: BTreeMap<String, f64>,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value,
            auxiliary: BTreeMap::new(),
        }
    }

    /// Attach an auxiliary field while building the sample.
    #[must_use]
    pub fn with_aux(mut self, key: impl Into<String>, value: f64) -> Self {
        self.auxiliary.insert(key.into(), value);
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn aux(&self, key: &str) -> Option<f64> {
        self.auxiliary.get(key).copied()
    }

    pub fn auxiliary(&self) -> &BTreeMap<String, f64> {
        &self.auxiliary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aux_fields_are_looked_up_by_name() {
        let sample = Sample::new(Utc::now(), 100.0)
            .with_aux("cpu", 42.5)
            .with_aux("latency", 12.0);

        assert_eq!(sample.value(), 100.0);
        assert_eq!(sample.aux("cpu"), Some(42.5));
        assert_eq!(sample.aux("latency"), Some(12.0));
        assert_eq!(sample.aux("memory"), None);
    }

    #[test]
    fn empty_auxiliary_is_omitted_from_json() {
        let sample = Sample::new(Utc::now(), 1.0);
        let json = serde_json::to_value(&sample).unwrap();
        assert!(json.get("auxiliary").is_none());
        assert_eq!(json["value"], 1.0);
    }
}
