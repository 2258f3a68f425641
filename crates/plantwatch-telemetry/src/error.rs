use thiserror::Error;

/// Top-level error type for the `plantwatch-telemetry` crate.
///
/// Only construction-time endpoint problems and per-message decode
/// failures surface as errors. Connection trouble is not represented
/// here at all: the channel reconnects on its own and reports state
/// through [`ChannelEvent`](crate::ChannelEvent) instead.
#[derive(Debug, Error)]
pub enum ChannelError {
    // ── Endpoint ────────────────────────────────────────────────────
    /// Endpoint URL has no host component.
    #[error("Endpoint URL has no host: {url}")]
    MissingHost { url: String },

    /// Endpoint scheme is not one of `mqtt`, `mqtts`, `ws`, `wss`.
    #[error("Unsupported endpoint scheme '{scheme}' (expected mqtt, mqtts, ws, or wss)")]
    UnsupportedScheme { scheme: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Payload was not valid UTF-8. Dropped per-message, never fatal.
    #[error("Payload on topic '{topic}' is not valid UTF-8")]
    Decode { topic: String },
}
