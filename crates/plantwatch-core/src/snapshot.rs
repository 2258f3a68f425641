// ── Snapshot ──
//
// The aggregator's complete externally visible state. Published as
// `Arc<Snapshot>` through a watch channel; consumers hold read-only
// references and never mutate.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Classification, Metric};

/// Sentinel shown for a metric that has never reported.
pub const NO_READING: &str = "--";

/// Latest-known value per metric plus classification and connectivity.
///
/// Values are the raw wire strings -- a snapshot may legitimately mix a
/// fresh temperature with a stale humidity; arrival order per topic is
/// the only ordering guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub temperature: String,
    pub humidity: String,
    pub light: String,
    pub moisture: String,

    /// Raw classification label, verbatim from the wire.
    pub classification: String,

    /// Whether the telemetry channel currently has a live connection.
    pub connected: bool,

    /// Arrival time of the most recent reading, across all topics.
    pub last_reading_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// All-sentinel snapshot for a freshly mounted dashboard.
    pub fn new() -> Self {
        Self {
            temperature: NO_READING.into(),
            humidity: NO_READING.into(),
            light: NO_READING.into(),
            moisture: NO_READING.into(),
            classification: Classification::UNKNOWN_LABEL.into(),
            connected: false,
            last_reading_at: None,
        }
    }

    /// Current raw value for a metric.
    pub fn metric(&self, metric: Metric) -> &str {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Humidity => &self.humidity,
            Metric::Light => &self.light,
            Metric::Moisture => &self.moisture,
        }
    }

    pub(crate) fn set_metric(&mut self, metric: Metric, value: String) {
        match metric {
            Metric::Temperature => self.temperature = value,
            Metric::Humidity => self.humidity = value,
            Metric::Light => self.light = value,
            Metric::Moisture => self.moisture = value,
        }
    }

    /// Classification of the current label (guidance, badge color).
    pub fn health(&self) -> Classification {
        Classification::from_label(&self.classification)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_snapshot_is_all_sentinels() {
        let snap = Snapshot::new();
        for metric in Metric::ALL {
            assert_eq!(snap.metric(metric), NO_READING);
        }
        assert_eq!(snap.classification, "Unknown");
        assert!(!snap.connected);
        assert!(snap.last_reading_at.is_none());
    }

    #[test]
    fn set_metric_touches_exactly_one_field() {
        let mut snap = Snapshot::new();
        snap.set_metric(Metric::Light, "850".into());

        assert_eq!(snap.light, "850");
        assert_eq!(snap.temperature, NO_READING);
        assert_eq!(snap.humidity, NO_READING);
        assert_eq!(snap.moisture, NO_READING);
        assert_eq!(snap.classification, "Unknown");
    }

    #[test]
    fn health_reflects_raw_label() {
        let mut snap = Snapshot::new();
        assert_eq!(snap.health(), Classification::Unknown);

        snap.classification = "Dry".into();
        assert_eq!(snap.health(), Classification::Dry);

        // Verbatim preservation of an unrecognized label.
        snap.classification = "Soggy".into();
        assert_eq!(snap.classification, "Soggy");
        assert_eq!(snap.health(), Classification::Unknown);
    }
}
