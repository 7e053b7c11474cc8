//! Pool configuration and the JSON loader.
//!
//! The loader is layered like the rest of the crate's external interfaces:
//! parse raw optional fields, then normalize into a validated [`PoolConfig`].
//! Unknown keys are ignored so a pool section can live inside a larger
//! application config.

use crate::error::ConfigError;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Deterministic rule applied when an enqueue observes a full queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    /// Wait for space (honors pause and stop).
    Block,
    /// Drop the new task and resolve its handle with a discard rejection.
    Discard,
    /// Displace the oldest pending task in favor of the new one.
    Overwrite,
}

impl QueuePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueuePolicy::Block => "Block",
            QueuePolicy::Discard => "Discard",
            QueuePolicy::Overwrite => "Overwrite",
        }
    }
}

impl fmt::Display for QueuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueuePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "block" => Ok(QueuePolicy::Block),
            "discard" => Ok(QueuePolicy::Discard),
            "overwrite" => Ok(QueuePolicy::Overwrite),
            _ => Err(ConfigError::InvalidPolicy(s.to_string())),
        }
    }
}

/// Construction-time options for a [`ThreadPool`](crate::ThreadPool).
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Bounded queue capacity; rounded up to at least 2 (and internally to a
    /// power of two).
    pub queue_cap: usize,
    /// Minimum resident worker count, at least 1.
    pub core_threads: usize,
    /// Upper bound on the worker count, at least `core_threads`.
    pub max_threads: usize,
    /// Sampling period of the scaling controller.
    pub load_check_interval: Duration,
    /// Idle duration after which a non-core worker exits.
    pub keep_alive: Duration,
    /// Pending ratio at or above which scale-up is considered.
    pub scale_up_threshold: f64,
    /// Pending/active ratio at or below which scale-down is considered.
    pub scale_down_threshold: f64,
    /// Absolute pending count reinforcing the scale-up threshold.
    pub pending_hi: usize,
    /// Absolute pending count reinforcing the scale-down threshold.
    pub pending_low: usize,
    /// Consecutive qualifying samples required before a scaling action.
    pub debounce_hits: usize,
    /// Minimum interval between successive scaling actions.
    pub cooldown: Duration,
    /// Behavior when the queue is full at submission time.
    pub queue_policy: QueuePolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            queue_cap: 1024,
            core_threads: 4,
            max_threads: 8,
            load_check_interval: Duration::from_millis(100),
            keep_alive: Duration::from_millis(5000),
            scale_up_threshold: 0.75,
            scale_down_threshold: 0.25,
            pending_hi: 64,
            pending_low: 8,
            debounce_hits: 3,
            cooldown: Duration::from_millis(500),
            queue_policy: QueuePolicy::Block,
        }
    }
}

/// Raw optional view of the JSON document; every missing key falls back to
/// the [`Default`] value during normalization.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    queue_cap: Option<u64>,
    core_threads: Option<u64>,
    max_threads: Option<u64>,
    load_check_interval_ms: Option<u64>,
    keep_alive_ms: Option<u64>,
    scale_up_threshold: Option<f64>,
    scale_down_threshold: Option<f64>,
    pending_hi: Option<u64>,
    pending_low: Option<u64>,
    debounce_hits: Option<u64>,
    cooldown_ms: Option<u64>,
    queue_policy: Option<String>,
}

impl PoolConfig {
    /// Loads and validates a config from a JSON string.
    pub fn from_json_str(json: &str) -> Result<PoolConfig, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;
        Self::normalize(raw)
    }

    /// Loads and validates a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<PoolConfig, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Loads and validates a config from an already-parsed JSON value.
    pub fn from_json_value(value: &Value) -> Result<PoolConfig, ConfigError> {
        let raw: RawConfig = serde_json::from_value(value.clone())?;
        Self::normalize(raw)
    }

    fn normalize(raw: RawConfig) -> Result<PoolConfig, ConfigError> {
        let defaults = PoolConfig::default();
        let mut cfg = PoolConfig {
            queue_cap: raw.queue_cap.map_or(defaults.queue_cap, |v| v as usize),
            core_threads: raw
                .core_threads
                .map_or(defaults.core_threads, |v| v as usize),
            max_threads: raw.max_threads.map_or(defaults.max_threads, |v| v as usize),
            load_check_interval: raw
                .load_check_interval_ms
                .map_or(defaults.load_check_interval, Duration::from_millis),
            keep_alive: raw
                .keep_alive_ms
                .map_or(defaults.keep_alive, Duration::from_millis),
            scale_up_threshold: raw.scale_up_threshold.unwrap_or(defaults.scale_up_threshold),
            scale_down_threshold: raw
                .scale_down_threshold
                .unwrap_or(defaults.scale_down_threshold),
            pending_hi: raw.pending_hi.map_or(defaults.pending_hi, |v| v as usize),
            pending_low: raw.pending_low.map_or(defaults.pending_low, |v| v as usize),
            debounce_hits: raw
                .debounce_hits
                .map_or(defaults.debounce_hits, |v| v as usize),
            cooldown: raw.cooldown_ms.map_or(defaults.cooldown, Duration::from_millis),
            queue_policy: match raw.queue_policy {
                Some(s) => s.parse()?,
                None => defaults.queue_policy,
            },
        };

        for (name, value) in [
            ("scale_up_threshold", cfg.scale_up_threshold),
            ("scale_down_threshold", cfg.scale_down_threshold),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }
        if cfg.scale_down_threshold > cfg.scale_up_threshold {
            return Err(ConfigError::ThresholdOrder {
                up: cfg.scale_up_threshold,
                down: cfg.scale_down_threshold,
            });
        }

        // Sanity adjustments.
        cfg.queue_cap = cfg.queue_cap.max(2);
        cfg.core_threads = cfg.core_threads.max(1);
        cfg.max_threads = cfg.max_threads.max(cfg.core_threads);
        cfg.pending_low = cfg.pending_low.min(cfg.pending_hi);
        cfg.debounce_hits = cfg.debounce_hits.max(1);
        Ok(cfg)
    }

    /// Serializes the normalized config back to JSON.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "queue_cap": self.queue_cap,
            "core_threads": self.core_threads,
            "max_threads": self.max_threads,
            "load_check_interval_ms": self.load_check_interval.as_millis() as u64,
            "keep_alive_ms": self.keep_alive.as_millis() as u64,
            "scale_up_threshold": self.scale_up_threshold,
            "scale_down_threshold": self.scale_down_threshold,
            "pending_hi": self.pending_hi,
            "pending_low": self.pending_low,
            "debounce_hits": self.debounce_hits,
            "cooldown_ms": self.cooldown.as_millis() as u64,
            "queue_policy": self.queue_policy.as_str(),
        })
    }
}
