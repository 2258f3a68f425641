// ── Reading aggregation ──
//
// Folds the channel's discrete events into one latest-value-wins
// snapshot and publishes every change through a watch channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::Reading;
use crate::snapshot::Snapshot;
use crate::topics::{TopicMap, TopicTarget};

/// Latest-value-wins fold over the reading stream.
///
/// Each applied event replaces exactly one snapshot field and publishes
/// a fresh immutable [`Snapshot`]; all other fields carry over
/// untouched. One aggregator per dashboard -- no state is shared across
/// instances.
pub struct ReadingAggregator {
    topics: TopicMap,
    snapshot: watch::Sender<Arc<Snapshot>>,
    closed: AtomicBool,
}

impl ReadingAggregator {
    pub fn new(topics: TopicMap) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::new()));
        Self {
            topics,
            snapshot,
            closed: AtomicBool::new(false),
        }
    }

    /// Fold one reading into the snapshot.
    ///
    /// Unknown topics are ignored -- a no-op fold, not an error. Returns
    /// the resolved reading when it was applied, `None` when the topic
    /// was unrecognized or the aggregator is closed.
    pub fn apply_reading(
        &self,
        topic: &str,
        value: &str,
        at: DateTime<Utc>,
    ) -> Option<Reading> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }

        let target = self.topics.resolve(topic)?;

        self.publish(|snap| {
            match target {
                TopicTarget::Metric(metric) => snap.set_metric(metric, value.to_owned()),
                TopicTarget::Classification => snap.classification = value.to_owned(),
            }
            snap.last_reading_at = Some(at);
        });

        Some(Reading {
            target,
            value: value.to_owned(),
            at,
        })
    }

    /// Flip the connectivity flag. Metric values are left untouched so
    /// last-known-good readings stay visible through a reconnect.
    pub fn set_connected(&self, connected: bool) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        // Skip the publish when nothing changes -- repeated channel
        // errors would otherwise spam subscribers with identical state.
        if self.snapshot.borrow().connected == connected {
            return;
        }
        self.publish(|snap| snap.connected = connected);
    }

    /// Stop accepting updates. After this every apply is a no-op, which
    /// guards a torn-down dashboard against in-flight events.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot.subscribe()
    }

    fn publish<F: FnOnce(&mut Snapshot)>(&self, mutate: F) {
        self.snapshot.send_modify(|current| {
            let mut next = Snapshot::clone(current);
            mutate(&mut next);
            *current = Arc::new(next);
        });
    }
}

impl Default for ReadingAggregator {
    fn default() -> Self {
        Self::new(TopicMap::default())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metric;
    use crate::snapshot::NO_READING;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn connect_then_two_readings() {
        // connect -> reading(temp, "22.3") -> reading(hum, "55")
        let agg = ReadingAggregator::default();
        agg.set_connected(true);
        agg.apply_reading("/ThinkIOT/temp", "22.3", now());
        agg.apply_reading("/ThinkIOT/hum", "55", now());

        let snap = agg.snapshot();
        assert_eq!(snap.temperature, "22.3");
        assert_eq!(snap.humidity, "55");
        assert_eq!(snap.light, NO_READING);
        assert_eq!(snap.moisture, NO_READING);
        assert_eq!(snap.classification, "Unknown");
        assert!(snap.connected);
    }

    #[test]
    fn each_update_touches_exactly_one_field() {
        let agg = ReadingAggregator::default();
        agg.apply_reading("/ThinkIOT/temp", "22.3", now());
        let before = agg.snapshot();

        agg.apply_reading("/ThinkIOT/moist", "412", now());
        let after = agg.snapshot();

        assert_eq!(after.moisture, "412");
        // Everything else identical to the prior snapshot.
        assert_eq!(after.temperature, before.temperature);
        assert_eq!(after.humidity, before.humidity);
        assert_eq!(after.light, before.light);
        assert_eq!(after.classification, before.classification);
        assert_eq!(after.connected, before.connected);
    }

    #[test]
    fn snapshots_are_immutable_once_published() {
        let agg = ReadingAggregator::default();
        let first = agg.snapshot();

        agg.apply_reading("/ThinkIOT/temp", "19", now());

        // The previously handed-out snapshot is untouched.
        assert_eq!(first.temperature, NO_READING);
        assert_eq!(agg.snapshot().temperature, "19");
    }

    #[test]
    fn later_reading_supersedes_earlier_for_same_topic() {
        let agg = ReadingAggregator::default();
        agg.apply_reading("/ThinkIOT/temp", "22.3", now());
        agg.apply_reading("/ThinkIOT/temp", "22.9", now());
        assert_eq!(agg.snapshot().temperature, "22.9");
    }

    #[test]
    fn classification_label_preserved_verbatim() {
        let agg = ReadingAggregator::default();
        agg.apply_reading("/ThinkIOT/classification", "Soggy", now());

        let snap = agg.snapshot();
        assert_eq!(snap.classification, "Soggy");
        assert_eq!(snap.health(), crate::model::Classification::Unknown);
    }

    #[test]
    fn unknown_topic_is_a_noop() {
        let agg = ReadingAggregator::default();
        let before = agg.snapshot();

        assert!(agg.apply_reading("/ThinkIOT/ph", "6.5", now()).is_none());

        // No publication happened at all.
        assert_eq!(agg.snapshot(), before);
    }

    #[test]
    fn non_numeric_reading_is_stored_not_rejected() {
        let agg = ReadingAggregator::default();
        let applied = agg.apply_reading("/ThinkIOT/light", "n/a", now());

        assert!(applied.is_some());
        assert_eq!(agg.snapshot().light, "n/a");
    }

    #[test]
    fn connectivity_flag_follows_events_only() {
        let agg = ReadingAggregator::default();
        assert!(!agg.snapshot().connected);

        agg.set_connected(true);
        assert!(agg.snapshot().connected);

        agg.set_connected(false);
        assert!(!agg.snapshot().connected);

        // Readings never flip the flag.
        agg.apply_reading("/ThinkIOT/temp", "20", now());
        assert!(!agg.snapshot().connected);
    }

    #[test]
    fn readings_still_apply_while_disconnected() {
        // connect -> error -> reading(temp, "19"): stale-but-visible.
        let agg = ReadingAggregator::default();
        agg.set_connected(true);
        agg.set_connected(false);
        agg.apply_reading("/ThinkIOT/temp", "19", now());

        let snap = agg.snapshot();
        assert_eq!(snap.temperature, "19");
        assert!(!snap.connected);
    }

    #[test]
    fn disconnect_keeps_last_known_values() {
        let agg = ReadingAggregator::default();
        agg.set_connected(true);
        agg.apply_reading("/ThinkIOT/hum", "61", now());
        agg.set_connected(false);

        let snap = agg.snapshot();
        assert_eq!(snap.humidity, "61");
        assert!(!snap.connected);
    }

    #[test]
    fn closed_aggregator_ignores_everything() {
        let agg = ReadingAggregator::default();
        agg.apply_reading("/ThinkIOT/temp", "21", now());
        agg.set_connected(true);
        agg.close();

        let before = agg.snapshot();
        assert!(agg.apply_reading("/ThinkIOT/temp", "35", now()).is_none());
        agg.set_connected(false);

        assert_eq!(agg.snapshot(), before);
        assert!(agg.is_closed());
    }

    #[test]
    fn redundant_connectivity_updates_do_not_republish() {
        let agg = ReadingAggregator::default();
        let mut rx = agg.subscribe();
        // Drain the initial value.
        let _ = rx.borrow_and_update();

        agg.set_connected(false);
        assert!(!rx.has_changed().unwrap_or(true));

        agg.set_connected(true);
        assert!(rx.has_changed().unwrap_or(false));
    }

    #[tokio::test]
    async fn subscribers_observe_each_publication() {
        let agg = ReadingAggregator::default();
        let mut rx = agg.subscribe();
        let _ = rx.borrow_and_update();

        agg.apply_reading("/ThinkIOT/moist", "300", now());

        rx.changed().await.expect("sender alive");
        assert_eq!(rx.borrow_and_update().moisture, "300");
    }
}
