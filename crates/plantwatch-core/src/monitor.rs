// ── Monitor abstraction ──
//
// Full lifecycle management for one dashboard's telemetry feed. Owns
// the channel and the aggregator, pumps channel events into the
// snapshot, and guarantees teardown on every exit path.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use plantwatch_telemetry::{ChannelEvent, ChannelOptions, TelemetryChannel};

use crate::config::MonitorConfig;
use crate::error::CoreError;
use crate::snapshot::Snapshot;
use crate::store::ReadingAggregator;
use crate::stream::SnapshotStream;
use crate::topics::TopicMap;

// ── Monitor ──────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<MonitorInner>`. One monitor owns exactly
/// one channel and one aggregator; rendering two dashboards means two
/// monitors with independent connections.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    config: MonitorConfig,
    aggregator: Arc<ReadingAggregator>,
    cancel: CancellationToken,
    channel: Mutex<Option<TelemetryChannel>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl Monitor {
    /// Create a monitor from configuration. Does NOT connect -- call
    /// [`connect()`](Self::connect) to open the channel.
    pub fn new(config: MonitorConfig) -> Self {
        let aggregator = Arc::new(ReadingAggregator::new(TopicMap::new(&config.topics)));

        Self {
            inner: Arc::new(MonitorInner {
                config,
                aggregator,
                cancel: CancellationToken::new(),
                channel: Mutex::new(None),
                pump: Mutex::new(None),
            }),
        }
    }

    /// Access the monitor configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Open the telemetry channel and start folding its events.
    ///
    /// Idempotent per instance: a second call on a live monitor is a
    /// no-op. Returns without waiting for the broker handshake -- the
    /// snapshot's connectivity flag reports the outcome. Only endpoint
    /// validation can fail here.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let mut channel_guard = self.inner.channel.lock().await;
        if channel_guard.is_some() {
            debug!("monitor already connected, ignoring");
            return Ok(());
        }

        let config = &self.inner.config;
        let options = ChannelOptions {
            endpoint: config.endpoint.clone(),
            client_id: config.client_id.clone(),
            topics: TopicMap::new(&config.topics).names(),
            keep_alive: config.keep_alive,
            reconnect: config.reconnect.clone(),
        };

        let channel = TelemetryChannel::open(options, self.inner.cancel.child_token())?;
        let events = channel.subscribe();
        *channel_guard = Some(channel);

        let aggregator = Arc::clone(&self.inner.aggregator);
        let cancel = self.inner.cancel.clone();
        *self.inner.pump.lock().await = Some(tokio::spawn(pump_task(events, aggregator, cancel)));

        debug!(endpoint = %config.endpoint, "monitor started");
        Ok(())
    }

    /// Tear down the channel and stop accepting events.
    ///
    /// Deterministic even while a connection attempt is in flight, and
    /// idempotent. After this, in-flight events are discarded rather
    /// than applied to the defunct aggregator.
    pub async fn disconnect(&self) {
        self.inner.cancel.cancel();

        if let Some(handle) = self.inner.pump.lock().await.take() {
            let _ = handle.await;
        }

        if let Some(channel) = self.inner.channel.lock().await.take() {
            channel.close();
        }

        // Final state: disconnected, then sealed against late events.
        self.inner.aggregator.set_connected(false);
        self.inner.aggregator.close();
        debug!("monitor stopped");
    }

    // ── State observation ────────────────────────────────────────

    /// Current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.aggregator.snapshot()
    }

    /// Whether the channel currently has a live broker connection.
    pub fn connected(&self) -> bool {
        self.inner.aggregator.snapshot().connected
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.inner.aggregator.subscribe())
    }

    /// Raw watch receiver, for select-style consumers.
    pub fn watch(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.inner.aggregator.subscribe()
    }
}

// ── Event pump ───────────────────────────────────────────────────────

/// Fold channel events into the aggregator until cancelled.
async fn pump_task(
    mut events: broadcast::Receiver<ChannelEvent>,
    aggregator: Arc<ReadingAggregator>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv() => {
                match event {
                    Ok(event) => apply_event(&aggregator, event),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // Latest-value-wins makes lost intermediate
                        // readings harmless; the next message per topic
                        // restores currency.
                        warn!(missed, "event pump lagged behind the channel");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    trace!("event pump exiting");
}

/// Apply one channel event to the aggregator.
///
/// Connectivity events flip only the flag; readings replace exactly one
/// field; transport errors are contained here -- nothing escalates.
fn apply_event(aggregator: &ReadingAggregator, event: ChannelEvent) {
    match event {
        ChannelEvent::Connected => aggregator.set_connected(true),
        ChannelEvent::Disconnected => aggregator.set_connected(false),
        ChannelEvent::Error { message } => {
            warn!(error = %message, "telemetry channel error");
            aggregator.set_connected(false);
        }
        ChannelEvent::Reading { topic, value, at } => {
            if aggregator.apply_reading(&topic, &value, at).is_none() {
                trace!(topic = %topic, "ignoring reading for unmapped topic");
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
