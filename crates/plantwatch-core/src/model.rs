// ── Domain model ──
//
// The fixed metric set, the plant-health classification, and the pure
// display helpers. Everything here is deliberately string-tolerant:
// readings arrive as opaque text and are parsed lazily at display time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

// ── Metric ───────────────────────────────────────────────────────────

/// One of the four environmental metrics the dashboard tracks.
///
/// Each metric has a display unit and an expected range used only for
/// scaling the level bar -- never validated against on ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Temperature,
    Humidity,
    Light,
    Moisture,
}

impl Metric {
    /// All metrics in a fixed display order.
    pub const ALL: [Self; 4] = [
        Self::Temperature,
        Self::Humidity,
        Self::Light,
        Self::Moisture,
    ];

    /// Human-readable name for headings.
    pub fn label(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
            Self::Light => "Light",
            Self::Moisture => "Soil Moisture",
        }
    }

    /// Display unit suffix.
    pub fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::Humidity | Self::Moisture => "%",
            Self::Light => "lux",
        }
    }

    /// Upper bound of the expected range, for level-bar scaling only.
    pub fn scale_max(self) -> f64 {
        match self {
            Self::Temperature => 40.0,
            Self::Humidity => 100.0,
            Self::Light => 1000.0,
            Self::Moisture => 500.0,
        }
    }
}

// ── Classification ───────────────────────────────────────────────────

/// Plant-health label derived by an external classifier and delivered
/// over the wire like any other telemetry value.
///
/// The raw label string stays in the snapshot verbatim; this enum only
/// drives guidance text, so anything unrecognized folds to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum Classification {
    Healthy,
    Dry,
    Overwatered,
    Dark,
    Unknown,
}

impl Classification {
    /// Sentinel label shown before any classification arrives.
    pub const UNKNOWN_LABEL: &'static str = "Unknown";

    /// Map a wire label to a classification. Total and case-insensitive;
    /// any label outside the known set is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "healthy" => Self::Healthy,
            "dry" => Self::Dry,
            "overwatered" => Self::Overwatered,
            "dark" => Self::Dark,
            _ => Self::Unknown,
        }
    }

    /// Care recommendation for this classification.
    pub fn guidance(self) -> &'static str {
        match self {
            Self::Healthy => "Your plant is in optimal condition. Keep up the good work!",
            Self::Dry => "Your plant needs water. Consider increasing watering frequency.",
            Self::Overwatered => {
                "Your plant has excess water. Reduce watering and ensure proper drainage."
            }
            Self::Dark => "Your plant needs more light. Consider relocating to a brighter spot.",
            Self::Unknown => "Waiting for plant condition data...",
        }
    }
}

/// Guidance text for a raw wire label.
///
/// Total: unrecognized labels (and the `Unknown` sentinel) get the
/// neutral waiting-for-data message.
pub fn classification_guidance(label: &str) -> &'static str {
    Classification::from_label(label).guidance()
}

// ── Reading ──────────────────────────────────────────────────────────

/// A single decoded reading as received from the telemetry channel.
///
/// The value is opaque text. Numeric metrics are parsed at display time
/// via [`progress_ratio`]; the aggregator never rejects a reading for
/// being non-numeric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub target: crate::topics::TopicTarget,
    pub value: String,
    pub at: DateTime<Utc>,
}

// ── Display scaling ──────────────────────────────────────────────────

/// Convert a raw metric string into a 0-100 level-bar ratio.
///
/// Total over all inputs: unparseable text, NaN, and a non-positive
/// `scale_max` all resolve to 0; everything else is clamped to
/// `[0, 100]`. Malformed numeric input is a first-class expected case,
/// not an error -- the raw string is still shown verbatim elsewhere.
pub fn progress_ratio(raw: &str, scale_max: f64) -> f64 {
    if scale_max <= 0.0 || scale_max.is_nan() {
        return 0.0;
    }
    let Ok(value) = raw.trim().parse::<f64>() else {
        return 0.0;
    };
    if value.is_nan() {
        return 0.0;
    }
    (value / scale_max * 100.0).clamp(0.0, 100.0)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn metric_display_units() {
        assert_eq!(Metric::Temperature.unit(), "°C");
        assert_eq!(Metric::Humidity.unit(), "%");
        assert_eq!(Metric::Light.unit(), "lux");
        assert_eq!(Metric::Moisture.unit(), "%");
    }

    #[test]
    fn metric_lowercase_names() {
        assert_eq!(Metric::Temperature.to_string(), "temperature");
        assert_eq!(Metric::Moisture.to_string(), "moisture");
    }

    #[test]
    fn classification_from_label_is_case_insensitive() {
        assert_eq!(Classification::from_label("Healthy"), Classification::Healthy);
        assert_eq!(Classification::from_label("HEALTHY"), Classification::Healthy);
        assert_eq!(Classification::from_label("dry"), Classification::Dry);
        assert_eq!(
            Classification::from_label("overwatered"),
            Classification::Overwatered
        );
        assert_eq!(Classification::from_label("Dark"), Classification::Dark);
    }

    #[test]
    fn classification_unrecognized_folds_to_unknown() {
        assert_eq!(Classification::from_label("Soggy"), Classification::Unknown);
        assert_eq!(Classification::from_label(""), Classification::Unknown);
        assert_eq!(Classification::from_label("Unknown"), Classification::Unknown);
    }

    #[test]
    fn guidance_is_total_with_fallback() {
        assert!(classification_guidance("Dry").contains("needs water"));
        assert!(classification_guidance("Overwatered").contains("excess water"));
        assert!(classification_guidance("Dark").contains("more light"));
        assert!(classification_guidance("Healthy").contains("optimal"));

        let fallback = Classification::Unknown.guidance();
        assert_eq!(classification_guidance("Soggy"), fallback);
        assert_eq!(classification_guidance(""), fallback);
        assert_eq!(classification_guidance("Unknown"), fallback);
    }

    #[test]
    fn progress_ratio_scenarios() {
        // Spec'd display behavior: unparseable -> 0, half scale -> 50,
        // overshoot clamped to 100.
        assert_eq!(progress_ratio("abc", 40.0), 0.0);
        assert_eq!(progress_ratio("20", 40.0), 50.0);
        assert_eq!(progress_ratio("1000", 40.0), 100.0);
    }

    #[test]
    fn progress_ratio_is_total() {
        let inputs = [
            "", " ", "--", "23.5", "-5", "1e308", "inf", "-inf", "NaN",
            "12abc", "0", "0.0001", "   42   ",
        ];
        for raw in inputs {
            let ratio = progress_ratio(raw, 40.0);
            assert!(
                ratio.is_finite() && (0.0..=100.0).contains(&ratio),
                "progress_ratio({raw:?}) = {ratio} out of range"
            );
        }
    }

    #[test]
    fn progress_ratio_degenerate_scale() {
        assert_eq!(progress_ratio("20", 0.0), 0.0);
        assert_eq!(progress_ratio("20", -40.0), 0.0);
        assert_eq!(progress_ratio("20", f64::NAN), 0.0);
    }

    #[test]
    fn progress_ratio_negative_reading_clamps_to_zero() {
        assert_eq!(progress_ratio("-12.5", 40.0), 0.0);
    }
}
