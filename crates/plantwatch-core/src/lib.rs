// plantwatch-core: Reactive data layer between plantwatch-telemetry and consumers.

pub mod config;
pub mod error;
pub mod model;
pub mod monitor;
pub mod snapshot;
pub mod store;
pub mod stream;
pub mod topics;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{MonitorConfig, ReconnectConfig};
pub use error::CoreError;
pub use monitor::Monitor;
pub use snapshot::{NO_READING, Snapshot};
pub use store::ReadingAggregator;
pub use stream::{SnapshotStream, SnapshotWatchStream};
pub use topics::{TopicConfig, TopicMap, TopicTarget};

// Re-export model types at the crate root for ergonomics.
pub use model::{Classification, Metric, Reading, classification_guidance, progress_ratio};
