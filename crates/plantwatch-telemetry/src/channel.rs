//! MQTT telemetry channel with auto-reconnect.
//!
//! Connects to a publish/subscribe broker, subscribes to a fixed topic
//! list, and streams decoded readings through a
//! [`tokio::sync::broadcast`] channel. Handles reconnection with
//! exponential backoff + jitter automatically.
//!
//! # Example
//!
//! ```rust,ignore
//! use plantwatch_telemetry::channel::{ChannelOptions, TelemetryChannel};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let options = ChannelOptions {
//!     endpoint: "wss://test.mosquitto.org:8081".parse()?,
//!     topics: vec!["/ThinkIOT/temp".into(), "/ThinkIOT/hum".into()],
//!     ..ChannelOptions::default()
//! };
//!
//! let channel = TelemetryChannel::open(options, cancel.clone())?;
//! let mut rx = channel.subscribe();
//!
//! while let Ok(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//!
//! channel.close();
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, Publish, QoS, Transport};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::ChannelError;

// ── Channel capacities ───────────────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const REQUEST_CHANNEL_CAPACITY: usize = 64;

// ── ChannelEvent ─────────────────────────────────────────────────────

/// A discrete event surfaced by the telemetry channel.
///
/// Consumers fold these into their own state. Readings carry the raw
/// payload text verbatim -- numeric parsing happens at display time,
/// never here.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// Broker acknowledged the connection. Fires once per successful
    /// (re)connection, after which all topic subscriptions are reissued.
    Connected,

    /// The connection was lost. A reconnect attempt follows automatically.
    Disconnected,

    /// A transport-level failure. Always followed by [`Disconnected`]
    /// and a reconnect attempt; never terminates the channel.
    ///
    /// [`Disconnected`]: ChannelEvent::Disconnected
    Error { message: String },

    /// One inbound message, in broker arrival order.
    Reading {
        topic: String,
        value: String,
        at: DateTime<Utc>,
    },
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for broker reconnection.
///
/// Telemetry loss is recoverable and non-fatal, so the default retries
/// forever with a capped interval.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── ChannelOptions ───────────────────────────────────────────────────

/// Everything needed to open a telemetry channel.
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// Broker endpoint. Accepted schemes: `mqtt`, `mqtts`, `ws`, `wss`.
    pub endpoint: Url,

    /// MQTT client identifier presented to the broker.
    pub client_id: String,

    /// Topics to subscribe to on every (re)connection.
    pub topics: Vec<String>,

    /// MQTT keep-alive interval.
    pub keep_alive: Duration,

    /// Reconnection backoff policy.
    pub reconnect: ReconnectConfig,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            // Public test broker -- a deployment default, not a fallback.
            endpoint: Url::parse("wss://test.mosquitto.org:8081")
                .unwrap_or_else(|_| unreachable!("static URL is valid")),
            client_id: format!("plantwatch-{}", std::process::id()),
            topics: Vec::new(),
            keep_alive: Duration::from_secs(30),
            reconnect: ReconnectConfig::default(),
        }
    }
}

// ── TelemetryChannel ─────────────────────────────────────────────────

/// Handle to a running telemetry channel.
///
/// Owns the broker connection exclusively. Drop all receivers and call
/// [`close`](Self::close) to tear down the background task; the owning
/// component must call it on every exit path.
pub struct TelemetryChannel {
    event_rx: broadcast::Receiver<ChannelEvent>,
    cancel: CancellationToken,
}

impl TelemetryChannel {
    /// Validate the endpoint and spawn the connection loop.
    ///
    /// Returns immediately once the background task is spawned -- the
    /// first connection attempt happens asynchronously. Observe
    /// [`ChannelEvent::Connected`] on the receiver for the handshake
    /// result. Only endpoint validation can fail synchronously.
    pub fn open(
        options: ChannelOptions,
        cancel: CancellationToken,
    ) -> Result<Self, ChannelError> {
        let mqtt_options = mqtt_options(&options)?;
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            channel_loop(
                mqtt_options,
                options.topics,
                event_tx,
                options.reconnect,
                task_cancel,
            )
            .await;
        });

        Ok(Self { event_rx, cancel })
    }

    /// Get a new broadcast receiver for the event stream.
    ///
    /// Multiple consumers can subscribe concurrently. If a consumer
    /// falls behind, it receives [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.event_rx.resubscribe()
    }

    /// Signal the background task to shut down. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

// ── Endpoint translation ─────────────────────────────────────────────

/// Build [`MqttOptions`] from the endpoint URL.
///
/// Scheme selects the transport: `mqtt` (plain TCP), `mqtts` (TLS),
/// `ws` / `wss` (websocket, as used by browser-facing brokers). For
/// websocket transports rumqttc expects the full URL as the broker
/// address; for TCP transports it expects host + port.
fn mqtt_options(options: &ChannelOptions) -> Result<MqttOptions, ChannelError> {
    let endpoint = &options.endpoint;
    let host = endpoint
        .host_str()
        .ok_or_else(|| ChannelError::MissingHost {
            url: endpoint.to_string(),
        })?;

    let mut mqtt = match endpoint.scheme() {
        "mqtt" => MqttOptions::new(
            options.client_id.clone(),
            host,
            endpoint.port().unwrap_or(1883),
        ),
        "mqtts" => {
            let mut mqtt = MqttOptions::new(
                options.client_id.clone(),
                host,
                endpoint.port().unwrap_or(8883),
            );
            mqtt.set_transport(Transport::tls_with_default_config());
            mqtt
        }
        "ws" => {
            let mut mqtt = MqttOptions::new(
                options.client_id.clone(),
                endpoint.as_str(),
                endpoint.port().unwrap_or(80),
            );
            mqtt.set_transport(Transport::Ws);
            mqtt
        }
        "wss" => {
            let mut mqtt = MqttOptions::new(
                options.client_id.clone(),
                endpoint.as_str(),
                endpoint.port().unwrap_or(443),
            );
            mqtt.set_transport(Transport::wss_with_default_config());
            mqtt
        }
        other => {
            return Err(ChannelError::UnsupportedScheme {
                scheme: other.to_string(),
            });
        }
    };

    mqtt.set_keep_alive(options.keep_alive);
    Ok(mqtt)
}

// ── Background connection loop ───────────────────────────────────────

/// Main loop: poll → dispatch events → on error, backoff → reconnect.
///
/// rumqttc's event loop re-establishes the TCP/TLS session on the next
/// poll after a failure, but subscriptions are not part of that -- they
/// are reissued here on every `ConnAck`.
async fn channel_loop(
    mqtt_options: MqttOptions,
    topics: Vec<String>,
    event_tx: broadcast::Sender<ChannelEvent>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let (client, mut eventloop) = AsyncClient::new(mqtt_options, REQUEST_CHANNEL_CAPACITY);
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = eventloop.poll() => {
                match result {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        tracing::info!("connected to broker");
                        attempt = 0;
                        let _ = event_tx.send(ChannelEvent::Connected);
                        subscribe_all(&client, &topics).await;
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        dispatch_publish(&publish, &event_tx);
                    }
                    // PingResp, SubAck, outgoing echoes -- ignore
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "broker connection error");

                        let _ = event_tx.send(ChannelEvent::Error {
                            message: e.to_string(),
                        });
                        let _ = event_tx.send(ChannelEvent::Disconnected);

                        if let Some(max) = reconnect.max_retries {
                            if attempt >= max {
                                tracing::error!(
                                    max_retries = max,
                                    "broker reconnection limit reached, giving up"
                                );
                                break;
                            }
                        }

                        let delay = calculate_backoff(attempt, &reconnect);
                        tracing::info!(
                            delay_ms = delay.as_millis() as u64,
                            attempt,
                            "waiting before reconnect"
                        );

                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }

                        attempt += 1;
                    }
                }
            }
        }
    }

    // Best-effort clean disconnect; the broker drops the session anyway
    // once the socket goes away.
    let _ = client.try_disconnect();
    tracing::debug!("telemetry channel loop exiting");
}

/// Subscribe to every topic, continuing past per-topic failures.
///
/// One failed subscribe must not block the others -- readings on the
/// remaining topics are still valuable.
async fn subscribe_all(client: &AsyncClient, topics: &[String]) {
    for topic in topics {
        if let Err(e) = client.subscribe(topic.clone(), QoS::AtMostOnce).await {
            tracing::warn!(topic = %topic, error = %e, "subscribe failed");
        } else {
            tracing::debug!(topic = %topic, "subscribed");
        }
    }
}

// ── Message decoding ─────────────────────────────────────────────────

/// Decode one inbound publish and broadcast it as a reading.
///
/// Payloads are opaque UTF-8 text with no envelope, no schema, and no
/// sequence numbers. A payload that is not valid UTF-8 is dropped with
/// a log line; it never affects the connection.
fn dispatch_publish(publish: &Publish, event_tx: &broadcast::Sender<ChannelEvent>) {
    match decode_payload(publish) {
        Ok(value) => {
            // Ignore send errors -- just means no active subscribers.
            let _ = event_tx.send(ChannelEvent::Reading {
                topic: publish.topic.clone(),
                value,
                at: Utc::now(),
            });
        }
        Err(e) => {
            tracing::debug!(error = %e, topic = %publish.topic, "dropping undecodable payload");
        }
    }
}

/// Decode a publish payload as UTF-8 text.
fn decode_payload(publish: &Publish) -> Result<String, ChannelError> {
    std::str::from_utf8(&publish.payload)
        .map(str::to_owned)
        .map_err(|_| ChannelError::Decode {
            topic: publish.topic.clone(),
        })
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min((initial * 2^attempt) * jitter, max)`
///
/// Jitter is +-25% to spread out reconnection storms from multiple
/// dashboards pointed at the same broker. `max_delay` is a hard cap;
/// jitter never pushes the delay past it.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let max = config.max_delay.as_secs_f64();
    let base = config
        .initial_delay
        .as_secs_f64()
        * 2.0_f64.powf(f64::from(attempt));

    // Deterministic "jitter" seeded from the attempt number.
    // Not cryptographically random, but good enough for backoff spread.
    let jitter_factor = 1.0 + 0.25 * ((f64::from(attempt) * 7.3).sin());
    let with_jitter = (base * jitter_factor).clamp(0.0, max);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn options_for(endpoint: &str) -> ChannelOptions {
        ChannelOptions {
            endpoint: Url::parse(endpoint).expect("test URL"),
            client_id: "test-client".into(),
            ..ChannelOptions::default()
        }
    }

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn default_channel_options_point_at_test_broker() {
        let options = ChannelOptions::default();
        assert_eq!(options.endpoint.scheme(), "wss");
        assert_eq!(options.endpoint.host_str(), Some("test.mosquitto.org"));
        assert_eq!(options.keep_alive, Duration::from_secs(30));
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        // Each step should roughly double (within jitter bounds)
        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        // The cap is hard: jitter never pushes past max_delay.
        for attempt in 0..20 {
            let delay = calculate_backoff(attempt, &config);
            assert!(
                delay <= config.max_delay,
                "delay at attempt {attempt} ({delay:?}) exceeds max_delay"
            );
        }
    }

    #[test]
    fn mqtt_scheme_uses_tcp_defaults() {
        let mqtt = mqtt_options(&options_for("mqtt://broker.local")).expect("valid");
        assert_eq!(
            mqtt.broker_address(),
            ("broker.local".to_string(), 1883)
        );
    }

    #[test]
    fn mqtts_scheme_uses_tls_port() {
        let mqtt = mqtt_options(&options_for("mqtts://broker.local")).expect("valid");
        assert_eq!(
            mqtt.broker_address(),
            ("broker.local".to_string(), 8883)
        );
    }

    #[test]
    fn wss_scheme_passes_full_url() {
        let mqtt =
            mqtt_options(&options_for("wss://test.mosquitto.org:8081")).expect("valid");
        let (addr, port) = mqtt.broker_address();
        assert_eq!(addr, "wss://test.mosquitto.org:8081/");
        assert_eq!(port, 8081);
    }

    #[test]
    fn explicit_port_overrides_default() {
        let mqtt = mqtt_options(&options_for("mqtt://broker.local:2883")).expect("valid");
        assert_eq!(mqtt.broker_address().1, 2883);
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let err = mqtt_options(&options_for("https://broker.local")).expect_err("must fail");
        assert!(matches!(
            err,
            ChannelError::UnsupportedScheme { ref scheme } if scheme == "https"
        ));
    }

    #[test]
    fn decode_text_payload() {
        let publish = Publish::new("/ThinkIOT/temp", QoS::AtMostOnce, "23.5");
        assert_eq!(decode_payload(&publish).expect("utf-8"), "23.5");
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let publish = Publish::new(
            "/ThinkIOT/temp",
            QoS::AtMostOnce,
            vec![0xff, 0xfe, 0x80],
        );
        let err = decode_payload(&publish).expect_err("must fail");
        assert!(matches!(err, ChannelError::Decode { ref topic } if topic == "/ThinkIOT/temp"));
    }

    #[test]
    fn decode_allows_empty_payload() {
        // An empty retained message is still a valid (empty) reading;
        // the aggregator decides what to do with it.
        let publish = Publish::new("/ThinkIOT/hum", QoS::AtMostOnce, "");
        assert_eq!(decode_payload(&publish).expect("utf-8"), "");
    }

    #[test]
    fn dispatch_publish_broadcasts_reading() {
        let (tx, mut rx) = broadcast::channel(16);

        let publish = Publish::new("/ThinkIOT/moist", QoS::AtMostOnce, "412");
        dispatch_publish(&publish, &tx);

        match rx.try_recv().expect("one event") {
            ChannelEvent::Reading { topic, value, .. } => {
                assert_eq!(topic, "/ThinkIOT/moist");
                assert_eq!(value, "412");
            }
            other => panic!("expected a reading, got {other:?}"),
        }
    }

    #[test]
    fn dispatch_publish_drops_undecodable_payload() {
        let (tx, mut rx) = broadcast::channel::<ChannelEvent>(16);

        let publish = Publish::new("/ThinkIOT/moist", QoS::AtMostOnce, vec![0xC0u8]);
        dispatch_publish(&publish, &tx);

        // Should not panic, should just log and skip
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn open_rejects_bad_scheme_synchronously() {
        let cancel = CancellationToken::new();
        let result = TelemetryChannel::open(options_for("ftp://broker.local"), cancel);
        assert!(matches!(
            result,
            Err(ChannelError::UnsupportedScheme { .. })
        ));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let cancel = CancellationToken::new();
        let channel = TelemetryChannel::open(options_for("mqtt://127.0.0.1:1883"), cancel)
            .expect("valid options");
        channel.close();
        channel.close();
    }
}
