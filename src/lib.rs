//! # dynpool — dynamically scaled thread pool
//!
//! An in-process task executor: callers submit units of work and the pool
//! runs them on a managed set of OS worker threads, with bounded queuing,
//! configurable overflow behavior and automatic scaling of the worker set in
//! response to observed load.
//!
//! ## Architecture
//!
//! Three layers, leaves first:
//!
//! - **[`ring`]**: a fixed-capacity lock-free MPMC slot array with per-slot
//!   sequence numbers (Vyukov's bounded queue)
//! - **[`queue`]**: a blocking adapter adding condition-variable waits, timed
//!   variants, a discard counter and a close latch
//! - **[`pool`]**: the [`ThreadPool`] facade owning the queue, the worker
//!   set, the scaling controller, the lifecycle state machine and the
//!   statistics
//!
//! ## Example
//!
//! ```no_run
//! use dynpool::{StopMode, ThreadPool};
//!
//! let pool = ThreadPool::new(4, 1024); // 4 workers, 1024-slot queue
//! pool.start();
//!
//! let handle = pool.submit(|| 7 + 5);
//! assert_eq!(handle.join().unwrap(), 12);
//!
//! pool.stop(StopMode::Graceful);
//! ```

pub mod config;
pub mod error;
pub mod pool;
pub mod queue;
pub mod ring;
pub mod stats;
pub mod task;
mod worker;

pub use config::{PoolConfig, QueuePolicy};
pub use error::{ConfigError, TaskError};
pub use pool::{PoolState, StopMode, ThreadPool};
pub use stats::StatsSnapshot;
pub use task::TaskHandle;
