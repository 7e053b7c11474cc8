//! Error types surfaced by the pool and the configuration loader.

use thiserror::Error;

/// Terminal outcome of a submitted task, delivered through its
/// [`TaskHandle`](crate::TaskHandle).
///
/// A task resolves with exactly one of these when it does not produce a
/// value: either its closure panicked, or a pool policy rejected it before
/// it ever ran.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The task closure panicked; the payload message is preserved.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The pool was not accepting submissions (not started, stopping, or
    /// stopped).
    #[error("pool is not accepting tasks")]
    Stopped,
    /// The queue was full under the `Discard` policy.
    #[error("task discarded: queue full")]
    Discarded,
    /// The task was displaced from a full queue by a newer submission under
    /// the `Overwrite` policy.
    #[error("task overwritten by a newer submission")]
    Overwritten,
    /// The task was still queued when the pool was force-stopped.
    #[error("task cancelled: pool force-stopped")]
    Cancelled,
}

impl TaskError {
    /// True for the policy/lifecycle rejections, false for a task panic.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, TaskError::Panicked(_))
    }
}

/// Errors produced while loading or validating a [`PoolConfig`](crate::PoolConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid queue_policy {0:?} (expected Block, Discard or Overwrite)")]
    InvalidPolicy(String),
    #[error("{name} must be within [0.0, 1.0], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },
    #[error("scale_down_threshold ({down}) must not exceed scale_up_threshold ({up})")]
    ThresholdOrder { up: f64, down: f64 },
}
