// ── Core error types ──
//
// User-facing errors from plantwatch-core. Consumers never see raw
// transport failures directly; the `From<ChannelError>` impl translates
// them into domain-appropriate variants. Note that most transport
// trouble never surfaces here at all -- connection loss is folded into
// the snapshot's connectivity flag, not raised as an error.

use thiserror::Error;

use plantwatch_telemetry::ChannelError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<ChannelError> for CoreError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::MissingHost { url } => CoreError::Config {
                message: format!("broker URL has no host: {url}"),
            },
            ChannelError::UnsupportedScheme { scheme } => CoreError::Config {
                message: format!(
                    "unsupported broker scheme '{scheme}' (expected mqtt, mqtts, ws, or wss)"
                ),
            },
            ChannelError::Decode { topic } => CoreError::Internal(format!(
                "undecodable payload on topic '{topic}'"
            )),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
