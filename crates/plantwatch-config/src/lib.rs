//! Shared configuration for the plantwatch CLI.
//!
//! TOML file + environment loading via figment, and translation to
//! `plantwatch_core::MonitorConfig`. The core crates never read disk;
//! everything file-shaped lives here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use plantwatch_core::{MonitorConfig, ReconnectConfig, TopicConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Broker endpoint URL (`mqtt`, `mqtts`, `ws`, or `wss`).
    #[serde(default = "default_broker")]
    pub broker: String,

    /// MQTT client identifier. Defaults to a per-process id.
    pub client_id: Option<String>,

    /// Keep-alive interval in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    /// Reconnect backoff tuning.
    #[serde(default)]
    pub reconnect: ReconnectSettings,

    /// Topic names for this deployment.
    #[serde(default)]
    pub topics: TopicConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broker: default_broker(),
            client_id: None,
            keep_alive_secs: default_keep_alive(),
            reconnect: ReconnectSettings::default(),
            topics: TopicConfig::default(),
        }
    }
}

fn default_broker() -> String {
    // Public test broker -- the deployment default, not a fallback.
    "wss://test.mosquitto.org:8081".into()
}
fn default_keep_alive() -> u64 {
    30
}

/// Reconnect policy as written in TOML (seconds, not `Duration`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconnectSettings {
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,

    /// `None` (omitted) means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_delay_secs: default_initial_delay(),
            max_delay_secs: default_max_delay(),
            max_retries: None,
        }
    }
}

fn default_initial_delay() -> u64 {
    1
}
fn default_max_delay() -> u64 {
    30
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "plantwatch", "plantwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("plantwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_at(&config_path())
}

/// Load the full Config from a specific file + environment.
///
/// Precedence (low to high): built-in defaults, TOML file, `PLANTWATCH_`
/// environment variables (`PLANTWATCH_BROKER`,
/// `PLANTWATCH_TOPICS__TEMPERATURE`, ...).
pub fn load_config_at(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PLANTWATCH_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, falling back to defaults on any failure.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_at(cfg, &path)?;
    Ok(path)
}

/// Serialize config to TOML and write it to a specific path.
pub fn save_config_at(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to runtime config ───────────────────────────────────

/// Build a [`MonitorConfig`] from the file-level config.
///
/// `broker_override` wins over the file value (CLI `--broker` flag).
pub fn to_monitor_config(
    cfg: &Config,
    broker_override: Option<&str>,
) -> Result<MonitorConfig, ConfigError> {
    let broker = broker_override.unwrap_or(&cfg.broker);
    let endpoint: url::Url = broker.parse().map_err(|_| ConfigError::Validation {
        field: "broker".into(),
        reason: format!("invalid URL: {broker}"),
    })?;

    let client_id = cfg
        .client_id
        .clone()
        .unwrap_or_else(|| format!("plantwatch-{}", std::process::id()));

    Ok(MonitorConfig {
        endpoint,
        client_id,
        topics: cfg.topics.clone(),
        keep_alive: Duration::from_secs(cfg.keep_alive_secs),
        reconnect: ReconnectConfig {
            initial_delay: Duration::from_secs(cfg.reconnect.initial_delay_secs),
            max_delay: Duration::from_secs(cfg.reconnect.max_delay_secs),
            max_retries: cfg.reconnect.max_retries,
        },
    })
}

// ── Tests ────────────────────────────────────────────────────────────
