// ── Runtime monitor configuration ──
//
// These types describe *how* to reach a broker. They carry connection
// tuning only and never touch disk -- the CLI constructs a
// `MonitorConfig` via plantwatch-config and hands it in.

use std::time::Duration;

use url::Url;

use crate::topics::TopicConfig;
pub use plantwatch_telemetry::ReconnectConfig;

/// Configuration for one dashboard's telemetry monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Broker endpoint (`mqtt`, `mqtts`, `ws`, or `wss` scheme).
    pub endpoint: Url,

    /// MQTT client identifier.
    pub client_id: String,

    /// Topic names for this deployment.
    pub topics: TopicConfig,

    /// MQTT keep-alive interval.
    pub keep_alive: Duration,

    /// Reconnect backoff policy.
    pub reconnect: ReconnectConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            // The public Mosquitto test broker is the deployment default
            // when nothing is configured, matching the original firmware.
            endpoint: Url::parse("wss://test.mosquitto.org:8081")
                .unwrap_or_else(|_| unreachable!("static URL is valid")),
            client_id: format!("plantwatch-{}", std::process::id()),
            topics: TopicConfig::default(),
            keep_alive: Duration::from_secs(30),
            reconnect: ReconnectConfig::default(),
        }
    }
}
