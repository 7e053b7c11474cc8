//! Worker thread implementation.
//!
//! Workers pull tasks from the shared queue with a bounded wait equal to the
//! keep-alive interval. A timed-out worker retires itself when the
//! controller has signalled it or when it has sat idle past keep-alive while
//! the pool holds more than its core thread count; a closed queue ends the
//! loop once it is drained.

use crate::error::TaskError;
use crate::pool::PoolShared;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::debug;

/// Book-keeping shared between a worker thread, the pool and the controller.
pub(crate) struct WorkerSlot {
    pub(crate) id: usize,
    pub(crate) created_at: Instant,
    pub(crate) last_activity: Mutex<Instant>,
    /// Thread is alive (cleared as the very last step of the loop).
    pub(crate) running: AtomicBool,
    /// Thread is currently inside a task closure.
    pub(crate) executing: AtomicBool,
    /// Scale-down signal; honored at the next idle timeout.
    pub(crate) should_exit: AtomicBool,
    pub(crate) handle: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerSlot {
    fn new(id: usize) -> Self {
        let now = Instant::now();
        WorkerSlot {
            id,
            created_at: now,
            last_activity: Mutex::new(now),
            running: AtomicBool::new(true),
            executing: AtomicBool::new(false),
            should_exit: AtomicBool::new(false),
            handle: Mutex::new(None),
        }
    }
}

/// Spawns one worker and registers it. The caller holds the workers lock;
/// the thread-count gauge is raised before the thread exists so the count
/// never dips below the live worker set.
pub(crate) fn spawn_worker(shared: &Arc<PoolShared>, workers: &mut Vec<Arc<WorkerSlot>>) {
    let id = shared.next_worker_id();
    let slot = Arc::new(WorkerSlot::new(id));
    shared.stats.current_threads.fetch_add(1, Ordering::AcqRel);
    shared.stats.threads_created.fetch_add(1, Ordering::Relaxed);
    shared.stats.update_peak();

    let thread_shared = Arc::clone(shared);
    let thread_slot = Arc::clone(&slot);
    let handle = thread::spawn(move || worker_loop(&thread_shared, &thread_slot));
    *slot.handle.lock().unwrap() = Some(handle);
    workers.push(slot);
}

pub(crate) fn worker_loop(shared: &Arc<PoolShared>, slot: &Arc<WorkerSlot>) {
    debug!(worker = slot.id, "worker started");
    let keep_alive = shared.cfg.keep_alive;
    let mut idle_since = Instant::now();
    let mut retired = false;

    loop {
        // Pause freezes task fetching; stop transitions fall through.
        if shared.wait_while_paused(false) {
            idle_since = Instant::now();
        }
        if shared.force_stopping() {
            debug!(worker = slot.id, "worker exiting: force stop");
            break;
        }

        match shared.queue.wait_pop_for(keep_alive) {
            Some(task) => {
                if shared.force_stopping() {
                    // Stop raced the pop; resolve the task like any other
                    // cleared pending task.
                    task.cancel(TaskError::Cancelled);
                    shared.stats.record_cancel();
                    break;
                }
                slot.executing.store(true, Ordering::Release);
                shared.stats.active_tasks.fetch_add(1, Ordering::AcqRel);
                shared.stats.active_threads.fetch_add(1, Ordering::AcqRel);

                let started = Instant::now();
                let ok = task.execute();
                let elapsed = started.elapsed();
                shared.stats.record_complete(ok, elapsed);

                shared.stats.active_threads.fetch_sub(1, Ordering::AcqRel);
                shared.stats.active_tasks.fetch_sub(1, Ordering::AcqRel);
                slot.executing.store(false, Ordering::Release);
                *slot.last_activity.lock().unwrap() = Instant::now();
                idle_since = Instant::now();

                if !ok {
                    debug!(
                        worker = slot.id,
                        duration_us = elapsed.as_micros() as u64,
                        "task panicked; worker continues"
                    );
                }
            }
            None => {
                if shared.queue.is_closed() {
                    debug!(worker = slot.id, "worker exiting: queue closed");
                    break;
                }
                if slot.should_exit.load(Ordering::Acquire) {
                    if shared.try_retire() {
                        debug!(worker = slot.id, "worker exiting: scale-down signal");
                        retired = true;
                        break;
                    }
                    // Another worker retired first and we are back at core.
                    slot.should_exit.store(false, Ordering::Release);
                } else if idle_since.elapsed() >= keep_alive && shared.try_retire() {
                    debug!(
                        worker = slot.id,
                        idle_ms = idle_since.elapsed().as_millis() as u64,
                        "idle worker retiring"
                    );
                    retired = true;
                    break;
                }
            }
        }
    }

    if !retired {
        shared.stats.current_threads.fetch_sub(1, Ordering::AcqRel);
    }
    shared.stats.threads_destroyed.fetch_add(1, Ordering::Relaxed);
    slot.running.store(false, Ordering::Release);
    debug!(worker = slot.id, "worker exited");
}
