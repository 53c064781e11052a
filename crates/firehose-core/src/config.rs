use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FirehoseError, Result};

// Wire and sizing constants
pub const EVENT_SIZE: usize = 256; // bytes per event payload
pub const DEFAULT_QUEUE_CAPACITY: usize = 262_144; // ring slots, power of two
pub const RESPONSE_REPEAT: usize = 10; // result lines per response chunk
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Top-level config (firehose.toml + FIREHOSE_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirehoseConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Number of event slots. Must be a non-zero power of two.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Rate search tuning.
///
/// Defaults reproduce the classic probe: a 30 s warm-up, 10 s trials, a
/// single 1 s drain check and a 16 events/sec convergence threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Rate (events/sec) used for warm-up and the first doubling trial.
    #[serde(default = "default_initial_rate")]
    pub initial_rate: u64,
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: u64,
    #[serde(default = "default_trial_secs")]
    pub trial_secs: u64,
    /// Interval between post-window backlog checks.
    #[serde(default = "default_drain_poll_ms")]
    pub drain_poll_ms: u64,
    /// Give up waiting for the backlog to clear after this many polls.
    #[serde(default = "default_max_drain_polls")]
    pub max_drain_polls: u32,
    /// Sleep between catch-up bursts inside a publish window.
    #[serde(default = "default_pace_interval_us")]
    pub pace_interval_us: u64,
    /// Bisection stops once the next midpoint moves less than this.
    #[serde(default = "default_min_rate_delta")]
    pub min_rate_delta: u64,
    /// Start the search as soon as the gateway is up.
    #[serde(default)]
    pub autostart: bool,
    /// Seed for the fixed event payload.
    #[serde(default = "default_payload_seed")]
    pub payload_seed: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            initial_rate: default_initial_rate(),
            warmup_secs: default_warmup_secs(),
            trial_secs: default_trial_secs(),
            drain_poll_ms: default_drain_poll_ms(),
            max_drain_polls: default_max_drain_polls(),
            pace_interval_us: default_pace_interval_us(),
            min_rate_delta: default_min_rate_delta(),
            autostart: false,
            payload_seed: default_payload_seed(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}
fn default_initial_rate() -> u64 {
    1024
}
fn default_warmup_secs() -> u64 {
    30
}
fn default_trial_secs() -> u64 {
    10
}
fn default_drain_poll_ms() -> u64 {
    1000
}
fn default_max_drain_polls() -> u32 {
    30
}
fn default_pace_interval_us() -> u64 {
    10
}
fn default_min_rate_delta() -> u64 {
    16
}
fn default_payload_seed() -> u64 {
    55
}

impl FirehoseConfig {
    /// Load config from a TOML file with FIREHOSE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.firehose/firehose.toml
    ///
    /// A missing file is not an error; every section has defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        debug!(%path, "loading config");

        let config: FirehoseConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("FIREHOSE_").split("__"))
            .extract()
            .map_err(|e| FirehoseError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let cap = self.queue.capacity;
        if cap == 0 || !cap.is_power_of_two() {
            return Err(FirehoseError::Config(format!(
                "queue.capacity must be a non-zero power of two, got {cap}"
            )));
        }
        let c = &self.controller;
        if c.initial_rate == 0 {
            return Err(FirehoseError::Config(
                "controller.initial_rate must be greater than zero".to_string(),
            ));
        }
        if c.warmup_secs == 0 || c.trial_secs == 0 || c.drain_poll_ms == 0 {
            return Err(FirehoseError::Config(
                "controller durations must be greater than zero".to_string(),
            ));
        }
        if c.max_drain_polls == 0 {
            return Err(FirehoseError::Config(
                "controller.max_drain_polls must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.firehose/firehose.toml", home)
}
