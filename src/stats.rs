//! Pool statistics: atomic counters and gauges plus a point-in-time snapshot.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Live statistics storage shared between the pool, its workers and the
/// scaling controller. Counters are monotonic between
/// [`reset`](PoolStats::reset) calls; each field is individually consistent
/// but reads are not atomic across fields.
#[derive(Debug, Default)]
pub(crate) struct PoolStats {
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub cancelled: AtomicU64,
    pub rejected: AtomicU64,
    pub discarded: AtomicU64,
    pub overwritten: AtomicU64,
    pub exec_time_ns: AtomicU64,

    pub current_threads: AtomicUsize,
    pub active_threads: AtomicUsize,
    pub peak_threads: AtomicUsize,
    pub threads_created: AtomicUsize,
    pub threads_destroyed: AtomicUsize,

    pub active_tasks: AtomicUsize,
    /// Callers currently parked because the pool is paused.
    pub paused_wait: AtomicUsize,

    busy_ratio_bits: AtomicU64,
    pending_ratio_bits: AtomicU64,
}

impl PoolStats {
    pub(crate) fn new() -> Self {
        PoolStats::default()
    }

    pub(crate) fn record_complete(&self, ok: bool, elapsed: Duration) {
        self.exec_time_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
        if ok {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_cancel(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reject(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Raises the sticky peak gauge to the current thread count if needed.
    pub(crate) fn update_peak(&self) {
        let current = self.current_threads.load(Ordering::Relaxed);
        let mut peak = self.peak_threads.load(Ordering::Relaxed);
        while current > peak {
            match self.peak_threads.compare_exchange_weak(
                peak,
                current,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => peak = observed,
            }
        }
    }

    pub(crate) fn store_ratios(&self, busy: f64, pending: f64) {
        self.busy_ratio_bits.store(busy.to_bits(), Ordering::Relaxed);
        self.pending_ratio_bits
            .store(pending.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn busy_ratio(&self) -> f64 {
        f64::from_bits(self.busy_ratio_bits.load(Ordering::Relaxed))
    }

    pub(crate) fn snapshot(&self, pending: usize, queue_cap: usize) -> StatsSnapshot {
        let completed = self.completed.load(Ordering::Relaxed);
        let exec_ns = self.exec_time_ns.load(Ordering::Acquire);
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed,
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            overwritten: self.overwritten.load(Ordering::Relaxed),
            total_exec_time: Duration::from_nanos(exec_ns),
            avg_exec_time: if completed == 0 {
                Duration::ZERO
            } else {
                Duration::from_nanos(exec_ns / completed)
            },
            pending_tasks: pending,
            busy_ratio: self.busy_ratio(),
            pending_ratio: if queue_cap == 0 {
                0.0
            } else {
                pending as f64 / queue_cap as f64
            },
            current_threads: self.current_threads.load(Ordering::Relaxed),
            active_threads: self.active_threads.load(Ordering::Relaxed),
            peak_threads: self.peak_threads.load(Ordering::Relaxed),
            threads_created: self.threads_created.load(Ordering::Relaxed),
            threads_destroyed: self.threads_destroyed.load(Ordering::Relaxed),
            paused_wait: self.paused_wait.load(Ordering::Relaxed),
        }
    }

    /// Zeroes every counter and re-bases the peak gauge at the current
    /// thread count. Live gauges (thread counts, parked callers) are left
    /// untouched.
    pub(crate) fn reset(&self) {
        self.submitted.store(0, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.cancelled.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
        self.discarded.store(0, Ordering::Relaxed);
        self.overwritten.store(0, Ordering::Relaxed);
        self.exec_time_ns.store(0, Ordering::Relaxed);
        self.threads_created.store(0, Ordering::Relaxed);
        self.threads_destroyed.store(0, Ordering::Relaxed);
        self.store_ratios(0.0, 0.0);
        self.peak_threads
            .store(self.current_threads.load(Ordering::Relaxed), Ordering::Relaxed);
    }
}

/// Point-in-time view of the pool statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    /// Tasks accepted into the queue.
    pub submitted: u64,
    /// Tasks that ran to completion without panicking.
    pub completed: u64,
    /// Tasks whose closure panicked.
    pub failed: u64,
    /// Queued tasks resolved without running (force stop, overwrite).
    pub cancelled: u64,
    /// Submissions refused by state or policy.
    pub rejected: u64,
    /// Tasks dropped by the `Discard` policy.
    pub discarded: u64,
    /// Tasks displaced by the `Overwrite` policy.
    pub overwritten: u64,
    pub total_exec_time: Duration,
    /// Running mean execution time over completed tasks since the last reset.
    pub avg_exec_time: Duration,
    pub pending_tasks: usize,
    pub busy_ratio: f64,
    pub pending_ratio: f64,
    pub current_threads: usize,
    pub active_threads: usize,
    /// Sticky maximum of `current_threads`; lowers only on reset.
    pub peak_threads: usize,
    pub threads_created: usize,
    pub threads_destroyed: usize,
    pub paused_wait: usize,
}
