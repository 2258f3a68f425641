// ── Topic mapping ──
//
// Explicit lookup from wire topic name to the snapshot field it feeds.
// The partial nature of the mapping is part of the contract: unknown
// topics resolve to `None` and fold as a no-op, never an error.

use serde::{Deserialize, Serialize};

use crate::model::Metric;

/// What a topic's payloads are applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicTarget {
    /// Numeric-as-text metric reading.
    Metric(Metric),
    /// Plant-health label from the external classifier.
    Classification,
}

/// The five topic names for one deployment.
///
/// Topic names are configuration, not code -- the defaults match the
/// ThinkIOT firmware this dashboard was built against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConfig {
    pub temperature: String,
    pub humidity: String,
    pub light: String,
    pub moisture: String,
    pub classification: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            temperature: "/ThinkIOT/temp".into(),
            humidity: "/ThinkIOT/hum".into(),
            light: "/ThinkIOT/light".into(),
            moisture: "/ThinkIOT/moist".into(),
            classification: "/ThinkIOT/classification".into(),
        }
    }
}

impl TopicConfig {
    fn entries(&self) -> [(&str, TopicTarget); 5] {
        [
            (&self.temperature, TopicTarget::Metric(Metric::Temperature)),
            (&self.humidity, TopicTarget::Metric(Metric::Humidity)),
            (&self.light, TopicTarget::Metric(Metric::Light)),
            (&self.moisture, TopicTarget::Metric(Metric::Moisture)),
            (&self.classification, TopicTarget::Classification),
        ]
    }
}

/// Resolved topic lookup table.
#[derive(Debug, Clone)]
pub struct TopicMap {
    entries: Vec<(String, TopicTarget)>,
}

impl TopicMap {
    pub fn new(config: &TopicConfig) -> Self {
        Self {
            entries: config
                .entries()
                .into_iter()
                .map(|(name, target)| (name.to_owned(), target))
                .collect(),
        }
    }

    /// Resolve a wire topic to its snapshot field.
    ///
    /// `None` means "not ours" -- the caller ignores the message.
    pub fn resolve(&self, topic: &str) -> Option<TopicTarget> {
        self.entries
            .iter()
            .find(|(name, _)| name == topic)
            .map(|&(_, target)| target)
    }

    /// Topic names in subscription order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Iterate `(name, target)` pairs, e.g. for diagnostics output.
    pub fn iter(&self) -> impl Iterator<Item = (&str, TopicTarget)> {
        self.entries
            .iter()
            .map(|&(ref name, target)| (name.as_str(), target))
    }
}

impl Default for TopicMap {
    fn default() -> Self {
        Self::new(&TopicConfig::default())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_topics_resolve() {
        let map = TopicMap::default();

        assert_eq!(
            map.resolve("/ThinkIOT/temp"),
            Some(TopicTarget::Metric(Metric::Temperature))
        );
        assert_eq!(
            map.resolve("/ThinkIOT/hum"),
            Some(TopicTarget::Metric(Metric::Humidity))
        );
        assert_eq!(
            map.resolve("/ThinkIOT/light"),
            Some(TopicTarget::Metric(Metric::Light))
        );
        assert_eq!(
            map.resolve("/ThinkIOT/moist"),
            Some(TopicTarget::Metric(Metric::Moisture))
        );
        assert_eq!(
            map.resolve("/ThinkIOT/classification"),
            Some(TopicTarget::Classification)
        );
    }

    #[test]
    fn unknown_topic_resolves_to_none() {
        let map = TopicMap::default();
        assert_eq!(map.resolve("/ThinkIOT/unknown"), None);
        assert_eq!(map.resolve(""), None);
        // Exact match only -- no prefix or case folding on the wire.
        assert_eq!(map.resolve("/thinkiot/temp"), None);
    }

    #[test]
    fn custom_topic_names() {
        let config = TopicConfig {
            temperature: "greenhouse/t".into(),
            ..TopicConfig::default()
        };
        let map = TopicMap::new(&config);

        assert_eq!(
            map.resolve("greenhouse/t"),
            Some(TopicTarget::Metric(Metric::Temperature))
        );
        assert_eq!(map.resolve("/ThinkIOT/temp"), None);
        assert_eq!(
            map.resolve("/ThinkIOT/hum"),
            Some(TopicTarget::Metric(Metric::Humidity))
        );
    }

    #[test]
    fn names_cover_all_five_topics() {
        let names = TopicMap::default().names();
        assert_eq!(names.len(), 5);
        assert!(names.contains(&"/ThinkIOT/classification".to_string()));
    }
}
