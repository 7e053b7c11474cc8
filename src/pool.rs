//! Dynamically scaled thread pool over the bounded MPMC queue.
//!
//! The pool owns the queue, the worker set, the lifecycle state machine, the
//! scaling controller and the statistics. Submitters go through the current
//! queue-full policy; workers loop on timed pops; a background controller
//! samples queue depth and worker activity every `load_check_interval` and
//! grows or shrinks the worker set between `core_threads` and `max_threads`.

use crate::config::{PoolConfig, QueuePolicy};
use crate::error::TaskError;
use crate::queue::BlockingQueue;
use crate::stats::{PoolStats, StatsSnapshot};
use crate::task::{Task, TaskHandle};
use crate::worker::{self, WorkerSlot};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Lifecycle of a pool. Transitions:
/// `Created -> Running -> (Paused <-> Running)* -> Stopping -> Stopped`,
/// with `Created -> Stopped` when a never-started pool is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Created,
    Running,
    Paused,
    Stopping,
    Stopped,
}

impl PoolState {
    fn from_u8(value: u8) -> PoolState {
        match value {
            0 => PoolState::Created,
            1 => PoolState::Running,
            2 => PoolState::Paused,
            3 => PoolState::Stopping,
            4 => PoolState::Stopped,
            // Only ever stored through PoolState; anything else is a
            // programmer error.
            _ => unreachable!("invalid pool state {value}"),
        }
    }
}

/// How [`ThreadPool::stop`] treats queued-but-not-started tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Drain the queue to empty before joining the workers.
    Graceful,
    /// Cancel queued tasks; tasks already running finish.
    Force,
}

fn policy_to_u8(policy: QueuePolicy) -> u8 {
    match policy {
        QueuePolicy::Block => 0,
        QueuePolicy::Discard => 1,
        QueuePolicy::Overwrite => 2,
    }
}

fn policy_from_u8(value: u8) -> QueuePolicy {
    match value {
        0 => QueuePolicy::Block,
        1 => QueuePolicy::Discard,
        2 => QueuePolicy::Overwrite,
        _ => unreachable!("invalid queue policy {value}"),
    }
}

/// How many displacement rounds the Overwrite policy attempts before
/// degrading to Block semantics.
const OVERWRITE_ATTEMPTS: usize = 4;

/// State shared between the pool facade, its workers and the controller.
pub(crate) struct PoolShared {
    state: AtomicU8,
    force: AtomicBool,
    policy: AtomicU8,
    pub(crate) queue: BlockingQueue<Task>,
    pub(crate) stats: PoolStats,
    pub(crate) cfg: PoolConfig,

    /// Pause nesting depth; the pool is PAUSED while this is non-zero.
    pause_depth: Mutex<usize>,
    pause_cv: Condvar,

    pub(crate) workers: Mutex<Vec<Arc<WorkerSlot>>>,
    worker_seq: AtomicUsize,

    ctl_stop: AtomicBool,
    ctl_kick: AtomicBool,
    ctl_gate: Mutex<()>,
    ctl_cv: Condvar,
}

impl PoolShared {
    pub(crate) fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: PoolState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn cas_state(&self, from: PoolState, to: PoolState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn force_stopping(&self) -> bool {
        self.force.load(Ordering::Acquire) && self.state() != PoolState::Running
    }

    pub(crate) fn next_worker_id(&self) -> usize {
        self.worker_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Parks the caller while the pool is PAUSED. Returns whether it waited.
    /// `gauge` selects whether the parked caller is counted in the
    /// paused-wait gauge (submitters yes, workers no).
    pub(crate) fn wait_while_paused(&self, gauge: bool) -> bool {
        let guard = self.pause_depth.lock().unwrap();
        if self.state() != PoolState::Paused {
            return false;
        }
        if gauge {
            self.stats.paused_wait.fetch_add(1, Ordering::AcqRel);
        }
        let _guard = self
            .pause_cv
            .wait_while(guard, |_| self.state() == PoolState::Paused)
            .unwrap();
        if gauge {
            self.stats.paused_wait.fetch_sub(1, Ordering::AcqRel);
        }
        true
    }

    /// Lowers the thread-count gauge iff it stays at or above core. The
    /// successful caller owns the decrement and must exit.
    pub(crate) fn try_retire(&self) -> bool {
        let core = self.cfg.core_threads;
        self.stats
            .current_threads
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current > core).then(|| current - 1)
            })
            .is_ok()
    }
}

/// A task executor backed by OS worker threads over a bounded MPMC queue.
///
/// Submissions race FIFO through a single queue; the worker set scales
/// between `core_threads` and `max_threads` in response to observed load.
///
/// # Example
///
/// ```no_run
/// use dynpool::{StopMode, ThreadPool};
///
/// let pool = ThreadPool::new(4, 1024);
/// pool.start();
///
/// let handle = pool.submit(|| expensive_computation());
/// pool.post(|| println!("fire and forget"));
///
/// let value = handle.join().expect("task failed");
/// pool.stop(StopMode::Graceful);
/// # fn expensive_computation() -> u32 { 0 }
/// ```
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    controller: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadPool {
    /// Creates a pool with `core_threads` resident workers and a queue of at
    /// least `queue_cap` slots; every other option keeps its default. The
    /// direct constructor does not scale above core.
    pub fn new(core_threads: usize, queue_cap: usize) -> ThreadPool {
        let core_threads = core_threads.max(1);
        let cfg = PoolConfig {
            queue_cap,
            core_threads,
            max_threads: core_threads,
            pending_hi: (queue_cap / 2).max(1),
            pending_low: (queue_cap / 8).max(1),
            ..PoolConfig::default()
        };
        ThreadPool::with_config(cfg)
    }

    /// Creates a pool from a full configuration. The same sanity
    /// adjustments the JSON loader applies are re-applied here so a
    /// hand-built config cannot violate the worker-count invariants.
    pub fn with_config(cfg: PoolConfig) -> ThreadPool {
        let mut cfg = cfg;
        cfg.queue_cap = cfg.queue_cap.max(2);
        cfg.core_threads = cfg.core_threads.max(1);
        cfg.max_threads = cfg.max_threads.max(cfg.core_threads);
        cfg.pending_low = cfg.pending_low.min(cfg.pending_hi);
        cfg.debounce_hits = cfg.debounce_hits.max(1);

        let shared = Arc::new(PoolShared {
            state: AtomicU8::new(PoolState::Created as u8),
            force: AtomicBool::new(false),
            policy: AtomicU8::new(policy_to_u8(cfg.queue_policy)),
            queue: BlockingQueue::new(cfg.queue_cap),
            stats: PoolStats::new(),
            pause_depth: Mutex::new(0),
            pause_cv: Condvar::new(),
            workers: Mutex::new(Vec::new()),
            worker_seq: AtomicUsize::new(0),
            ctl_stop: AtomicBool::new(false),
            ctl_kick: AtomicBool::new(false),
            ctl_gate: Mutex::new(()),
            ctl_cv: Condvar::new(),
            cfg,
        });
        debug!(
            core_threads = shared.cfg.core_threads,
            max_threads = shared.cfg.max_threads,
            queue_cap = shared.queue.capacity(),
            policy = %shared.cfg.queue_policy,
            "thread pool constructed"
        );
        ThreadPool {
            shared,
            controller: Mutex::new(None),
        }
    }

    /// Spawns the core workers and the scaling controller. Valid only from
    /// `Created`; anything else is ignored.
    pub fn start(&self) {
        if !self.shared.cas_state(PoolState::Created, PoolState::Running) {
            warn!(state = ?self.state(), "start ignored");
            return;
        }
        {
            let mut workers = self.shared.workers.lock().unwrap();
            workers.reserve(self.shared.cfg.max_threads);
            for _ in 0..self.shared.cfg.core_threads {
                worker::spawn_worker(&self.shared, &mut workers);
            }
        }
        self.shared.ctl_stop.store(false, Ordering::Release);
        let ctl_shared = Arc::clone(&self.shared);
        *self.controller.lock().unwrap() = Some(thread::spawn(move || controller_loop(&ctl_shared)));
        info!(
            workers = self.current_threads(),
            max_threads = self.shared.cfg.max_threads,
            queue_cap = self.shared.queue.capacity(),
            policy = %self.queue_policy(),
            interval_ms = self.shared.cfg.load_check_interval.as_millis() as u64,
            keep_alive_ms = self.shared.cfg.keep_alive.as_millis() as u64,
            "thread pool started"
        );
    }

    /// Submits a value-returning task and hands back the handle that will
    /// observe its outcome. Blocks while the pool is paused and, under the
    /// `Block` policy, while the queue is full.
    pub fn submit<F, T>(&self, f: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (task, handle) = Task::with_handle(f);
        match self.dispatch(task) {
            Ok(()) => {
                self.shared.stats.submitted.fetch_add(1, Ordering::Relaxed);
                handle
            }
            Err((task, err)) => {
                self.record_rejection(&err);
                task.cancel(err);
                handle
            }
        }
    }

    /// Fire-and-forget submission. Rejections are visible only through the
    /// pool counters.
    pub fn post<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let task = Task::detached(f);
        match self.dispatch(task) {
            Ok(()) => {
                self.shared.stats.submitted.fetch_add(1, Ordering::Relaxed);
            }
            Err((task, err)) => {
                self.record_rejection(&err);
                task.cancel(err);
            }
        }
    }

    /// Batch fire-and-forget submission: enqueues until the queue fills and
    /// returns how many tasks were accepted. Requires `Running`.
    pub fn post_batch<I>(&self, fs: I) -> usize
    where
        I: IntoIterator,
        I::Item: FnOnce() + Send + 'static,
    {
        if self.state() != PoolState::Running {
            return 0;
        }
        let accepted = self
            .shared
            .queue
            .try_push_batch(fs.into_iter().map(Task::detached));
        self.shared
            .stats
            .submitted
            .fetch_add(accepted as u64, Ordering::Relaxed);
        accepted
    }

    /// Runs the admission state machine and the queue-full policy for one
    /// task. On rejection the task comes back with the error to resolve it
    /// with.
    fn dispatch(&self, task: Task) -> Result<(), (Task, TaskError)> {
        let mut waited_in_pause = false;
        loop {
            match self.shared.state() {
                PoolState::Running => break,
                PoolState::Paused => {
                    debug!("submission parked: pool paused");
                    self.shared.wait_while_paused(true);
                    waited_in_pause = true;
                }
                PoolState::Stopping | PoolState::Stopped => {
                    if waited_in_pause && self.shared.force.load(Ordering::Acquire) {
                        return Err((task, TaskError::Cancelled));
                    }
                    if waited_in_pause && self.shared.state() == PoolState::Stopping {
                        // The pause ended in a graceful stop; the queue is
                        // still draining, so the waiter is allowed through.
                        debug!("submission admitted into graceful drain after pause");
                        break;
                    }
                    return Err((task, TaskError::Stopped));
                }
                PoolState::Created => {
                    return Err((task, TaskError::Stopped));
                }
            }
        }

        match self.queue_policy() {
            QueuePolicy::Block => match self.shared.queue.wait_push(task) {
                Ok(()) => Ok(()),
                Err(task) => Err((task, TaskError::Stopped)),
            },
            QueuePolicy::Discard => match self.shared.queue.try_push(task) {
                Ok(()) => Ok(()),
                Err(task) => {
                    let err = if self.shared.queue.is_closed() {
                        TaskError::Stopped
                    } else {
                        TaskError::Discarded
                    };
                    Err((task, err))
                }
            },
            QueuePolicy::Overwrite => self.dispatch_overwrite(task),
        }
    }

    /// Overwrite policy: displace the oldest pending task, then retry the
    /// push. A bounded number of rounds protects against racing consumers;
    /// past that the submission degrades to Block semantics.
    fn dispatch_overwrite(&self, task: Task) -> Result<(), (Task, TaskError)> {
        let mut task = task;
        for _ in 0..OVERWRITE_ATTEMPTS {
            match self.shared.queue.try_push(task) {
                Ok(()) => return Ok(()),
                Err(rejected) => {
                    task = rejected;
                    if self.shared.queue.is_closed() {
                        return Err((task, TaskError::Stopped));
                    }
                    if let Some(oldest) = self.shared.queue.try_pop() {
                        oldest.cancel(TaskError::Overwritten);
                        self.shared.stats.overwritten.fetch_add(1, Ordering::Relaxed);
                        self.shared.stats.record_cancel();
                        debug!(
                            overwritten = self.overwritten_tasks(),
                            "oldest pending task displaced"
                        );
                    }
                }
            }
        }
        match self.shared.queue.wait_push(task) {
            Ok(()) => Ok(()),
            Err(task) => Err((task, TaskError::Stopped)),
        }
    }

    fn record_rejection(&self, err: &TaskError) {
        match err {
            TaskError::Cancelled => self.shared.stats.record_cancel(),
            TaskError::Discarded => {
                self.shared.stats.discarded.fetch_add(1, Ordering::Relaxed);
                self.shared.stats.record_reject();
            }
            _ => self.shared.stats.record_reject(),
        }
        debug!(error = %err, pending = self.pending(), "submission rejected");
    }

    /// Freezes task fetching and parks new submitters. Calls nest; the pool
    /// stays PAUSED until a matching number of [`resume`](Self::resume)
    /// calls.
    pub fn pause(&self) {
        let mut depth = self.shared.pause_depth.lock().unwrap();
        if *depth > 0 {
            *depth += 1;
            return;
        }
        if self.shared.cas_state(PoolState::Running, PoolState::Paused) {
            *depth = 1;
            info!("pool paused");
        } else {
            debug!(state = ?self.state(), "pause ignored");
        }
    }

    /// Undoes one [`pause`](Self::pause). Unmatched calls are ignored.
    pub fn resume(&self) {
        let mut depth = self.shared.pause_depth.lock().unwrap();
        match *depth {
            0 => debug!("resume ignored: pool not paused"),
            1 => {
                *depth = 0;
                if self.shared.cas_state(PoolState::Paused, PoolState::Running) {
                    self.shared.pause_cv.notify_all();
                    info!("pool resumed");
                }
            }
            _ => *depth -= 1,
        }
    }

    /// Stops the pool and joins every worker plus the controller. Idempotent;
    /// stopping an already-stopped pool is a no-op. A `Force` stop issued
    /// while a graceful stop is draining escalates it.
    pub fn stop(&self, mode: StopMode) {
        info!(mode = ?mode, state = ?self.state(), "stop requested");
        if mode == StopMode::Force {
            self.shared.force.store(true, Ordering::Release);
        }
        loop {
            let state = self.shared.state();
            match state {
                PoolState::Created => {
                    if self.shared.cas_state(PoolState::Created, PoolState::Stopped) {
                        debug!("pool stopped before start");
                        return;
                    }
                }
                PoolState::Running | PoolState::Paused => {
                    if self.shared.cas_state(state, PoolState::Stopping) {
                        break;
                    }
                }
                PoolState::Stopping => break,
                PoolState::Stopped => return,
            }
        }

        self.unpark_paused();
        self.shared.queue.close();
        if self.shared.force_stopping() {
            let pending = self.pending();
            self.shared.queue.clear_with(|task: Task| {
                task.cancel(TaskError::Cancelled);
                self.shared.stats.record_cancel();
            });
            warn!(cancelled = pending, "force stop cleared the queue");
        }
        self.finish_stop();
    }

    /// Graceful stop with a deadline: waits for the queue to drain, and on
    /// deadline expiry escalates to force semantics for whatever is left.
    pub fn shutdown_within(&self, timeout: Duration) {
        info!(timeout_ms = timeout.as_millis() as u64, "timed shutdown requested");
        let deadline = Instant::now() + timeout;
        loop {
            let state = self.shared.state();
            match state {
                PoolState::Created => {
                    if self.shared.cas_state(PoolState::Created, PoolState::Stopped) {
                        return;
                    }
                }
                PoolState::Running | PoolState::Paused => {
                    if self.shared.cas_state(state, PoolState::Stopping) {
                        break;
                    }
                }
                PoolState::Stopping => break,
                PoolState::Stopped => return,
            }
        }

        self.unpark_paused();
        self.shared.queue.close();

        let mut backoff_us = 50u64;
        while Instant::now() < deadline {
            if self.pending() == 0 && self.active_tasks() == 0 {
                break;
            }
            thread::sleep(Duration::from_micros(backoff_us));
            backoff_us = (backoff_us * 2).min(5_000);
        }
        if self.pending() > 0 || self.active_tasks() > 0 {
            warn!(
                pending = self.pending(),
                active = self.active_tasks(),
                "shutdown deadline exceeded; escalating to force stop"
            );
            self.shared.force.store(true, Ordering::Release);
            self.shared.queue.clear_with(|task: Task| {
                task.cancel(TaskError::Cancelled);
                self.shared.stats.record_cancel();
            });
        }
        self.finish_stop();
    }

    fn unpark_paused(&self) {
        let mut depth = self.shared.pause_depth.lock().unwrap();
        *depth = 0;
        self.shared.pause_cv.notify_all();
    }

    /// Joins the controller and every worker, then publishes `Stopped`.
    fn finish_stop(&self) {
        self.shared.ctl_stop.store(true, Ordering::Release);
        {
            let _gate = self.shared.ctl_gate.lock().unwrap();
            self.shared.ctl_cv.notify_all();
        }
        if let Some(handle) = self.controller.lock().unwrap().take() {
            let _ = handle.join();
        }

        let slots: Vec<_> = self.shared.workers.lock().unwrap().drain(..).collect();
        let self_id = thread::current().id();
        for slot in &slots {
            let handle = slot.handle.lock().unwrap().take();
            if let Some(handle) = handle {
                if handle.thread().id() != self_id {
                    let _ = handle.join();
                }
            }
        }
        self.shared.set_state(PoolState::Stopped);
        info!(
            workers_joined = slots.len(),
            pending = self.pending(),
            "pool stopped"
        );
    }

    /// Wakes the controller for an immediate load sample, bypassing the
    /// cooldown gate.
    pub fn trigger_load_check(&self) {
        self.shared.ctl_kick.store(true, Ordering::Release);
        let _gate = self.shared.ctl_gate.lock().unwrap();
        self.shared.ctl_cv.notify_one();
    }

    pub fn state(&self) -> PoolState {
        self.shared.state()
    }

    pub fn paused(&self) -> bool {
        self.state() == PoolState::Paused
    }

    /// Number of callers currently parked because the pool is paused.
    pub fn paused_wait(&self) -> usize {
        self.shared.stats.paused_wait.load(Ordering::Acquire)
    }

    pub fn current_threads(&self) -> usize {
        self.shared.stats.current_threads.load(Ordering::Acquire)
    }

    /// Number of tasks currently executing.
    pub fn active_tasks(&self) -> usize {
        self.shared.stats.active_tasks.load(Ordering::Acquire)
    }

    /// Number of enqueued-but-not-started tasks.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn discarded_tasks(&self) -> u64 {
        self.shared.stats.discarded.load(Ordering::Relaxed)
    }

    pub fn overwritten_tasks(&self) -> u64 {
        self.shared.stats.overwritten.load(Ordering::Relaxed)
    }

    pub fn queue_policy(&self) -> QueuePolicy {
        policy_from_u8(self.shared.policy.load(Ordering::Acquire))
    }

    /// Swaps the queue-full policy; visible to subsequent submissions.
    pub fn set_queue_policy(&self, policy: QueuePolicy) {
        self.shared.policy.store(policy_to_u8(policy), Ordering::Release);
        info!(policy = %policy, "queue-full policy changed");
    }

    pub fn statistics(&self) -> StatsSnapshot {
        self.shared
            .stats
            .snapshot(self.pending(), self.shared.queue.capacity())
    }

    pub fn reset_statistics(&self) {
        self.shared.stats.reset();
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if self.state() != PoolState::Stopped {
            self.stop(StopMode::Graceful);
        }
    }
}

/// Controller loop: one tick per `load_check_interval` (or sooner when
/// kicked), with debounce and cooldown hysteresis around each action.
fn controller_loop(shared: &Arc<PoolShared>) {
    let cfg = &shared.cfg;
    debug!(
        interval_ms = cfg.load_check_interval.as_millis() as u64,
        cooldown_ms = cfg.cooldown.as_millis() as u64,
        debounce_hits = cfg.debounce_hits,
        "scaling controller started"
    );
    let mut up_hits = 0usize;
    let mut down_hits = 0usize;
    let mut last_action: Option<Instant> = None;

    loop {
        {
            let gate = shared.ctl_gate.lock().unwrap();
            let _ = shared
                .ctl_cv
                .wait_timeout_while(gate, cfg.load_check_interval, |_| {
                    !shared.ctl_stop.load(Ordering::Acquire)
                        && !shared.ctl_kick.load(Ordering::Acquire)
                })
                .unwrap();
        }
        if shared.ctl_stop.load(Ordering::Acquire) {
            break;
        }
        let kicked = shared.ctl_kick.swap(false, Ordering::AcqRel);

        reap_retired(shared);

        let pending = shared.queue.len();
        let current = shared.stats.current_threads.load(Ordering::Acquire);
        let active = shared.stats.active_threads.load(Ordering::Acquire);
        let pending_ratio = pending as f64 / shared.queue.capacity() as f64;
        let active_ratio = if current == 0 {
            0.0
        } else {
            active as f64 / current as f64
        };
        shared.stats.store_ratios(active_ratio, pending_ratio);

        let grow = pending_ratio >= cfg.scale_up_threshold || pending >= cfg.pending_hi;
        let shrink = pending_ratio <= cfg.scale_down_threshold
            && pending <= cfg.pending_low
            && active_ratio <= cfg.scale_down_threshold;
        let cooled = kicked || last_action.map_or(true, |at| at.elapsed() >= cfg.cooldown);

        if grow {
            down_hits = 0;
            up_hits += 1;
            if up_hits >= cfg.debounce_hits && cooled {
                up_hits = 0;
                let mut workers = shared.workers.lock().unwrap();
                if shared.stats.current_threads.load(Ordering::Acquire) < cfg.max_threads {
                    worker::spawn_worker(shared, &mut workers);
                    last_action = Some(Instant::now());
                    info!(
                        current = shared.stats.current_threads.load(Ordering::Acquire),
                        pending,
                        pending_ratio,
                        "scaled up"
                    );
                } else {
                    debug!(max_threads = cfg.max_threads, "scale-up skipped: at max");
                }
            }
        } else if shrink {
            up_hits = 0;
            down_hits += 1;
            if down_hits >= cfg.debounce_hits && cooled {
                down_hits = 0;
                let workers = shared.workers.lock().unwrap();
                if shared.stats.current_threads.load(Ordering::Acquire) > cfg.core_threads {
                    // Prefer the worker that has been idle the longest.
                    let victim = workers
                        .iter()
                        .filter(|w| {
                            w.running.load(Ordering::Acquire)
                                && !w.executing.load(Ordering::Acquire)
                                && !w.should_exit.load(Ordering::Acquire)
                        })
                        .min_by_key(|w| *w.last_activity.lock().unwrap());
                    if let Some(victim) = victim {
                        victim.should_exit.store(true, Ordering::Release);
                        last_action = Some(Instant::now());
                        info!(
                            worker = victim.id,
                            age_ms = victim.created_at.elapsed().as_millis() as u64,
                            pending,
                            active_ratio,
                            "scale-down signalled"
                        );
                    } else {
                        debug!("scale-down skipped: no idle worker");
                    }
                }
            }
        } else {
            up_hits = 0;
            down_hits = 0;
        }
    }
    debug!("scaling controller exited");
}

/// Joins and forgets workers whose threads have already finished (idle
/// retirement or scale-down).
fn reap_retired(shared: &Arc<PoolShared>) {
    let mut workers = shared.workers.lock().unwrap();
    workers.retain(|slot| {
        if slot.running.load(Ordering::Acquire) {
            return true;
        }
        let handle = slot.handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        false
    });
}
