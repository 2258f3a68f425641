// plantwatch-telemetry: MQTT transport boundary for plantwatch

pub mod channel;
pub mod error;

pub use channel::{ChannelEvent, ChannelOptions, ReconnectConfig, TelemetryChannel};
pub use error::ChannelError;
