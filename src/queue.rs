//! Blocking adapter over the lock-free ring buffer.
//!
//! The ring itself is only ever touched lock-free; the mutex here guards the
//! wait predicates and the closed latch, nothing else. Waiters always
//! re-check the ring under the gate before sleeping, and wakers notify while
//! holding the gate, so a wake published between a failed attempt and the
//! sleep cannot be lost.

use crate::ring::RingBuffer;
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Bounded MPMC queue with blocking and timed variants, a close latch and a
/// discard counter.
///
/// `close` is idempotent: it wakes every waiter, rejects all further
/// producers, and lets consumers drain what is already enqueued before they
/// observe the closure.
pub struct BlockingQueue<T> {
    ring: RingBuffer<T>,
    gate: Mutex<()>,
    not_empty: Condvar,
    not_full: Condvar,
    /// Enqueued-but-not-dequeued count. A successful ring operation and its
    /// counter update are not one atomic step, so a racing consumer can
    /// briefly drive this negative; reads clamp to zero.
    pending: AtomicIsize,
    discards: AtomicUsize,
    closed: AtomicBool,
}

impl<T> BlockingQueue<T> {
    pub fn new(capacity: usize) -> Self {
        BlockingQueue {
            ring: RingBuffer::new(capacity),
            gate: Mutex::new(()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            pending: AtomicIsize::new(0),
            discards: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    fn put(&self, value: T) -> Result<(), T> {
        self.ring.push(value)?;
        self.pending.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn take(&self) -> Option<T> {
        let value = self.ring.pop()?;
        self.pending.fetch_sub(1, Ordering::AcqRel);
        Some(value)
    }

    fn signal_not_empty(&self) {
        let _gate = self.gate.lock().unwrap();
        self.not_empty.notify_one();
    }

    fn signal_not_full(&self) {
        let _gate = self.gate.lock().unwrap();
        self.not_full.notify_one();
    }

    /// Non-blocking enqueue. A full queue increments the discard counter and
    /// hands the value back; a closed queue hands the value back without
    /// counting it as a discard.
    pub fn try_push(&self, value: T) -> Result<(), T> {
        if self.is_closed() {
            return Err(value);
        }
        match self.put(value) {
            Ok(()) => {
                self.signal_not_empty();
                Ok(())
            }
            Err(value) => {
                self.discards.fetch_add(1, Ordering::Relaxed);
                Err(value)
            }
        }
    }

    /// Non-blocking dequeue.
    pub fn try_pop(&self) -> Option<T> {
        let value = self.take()?;
        self.signal_not_full();
        Some(value)
    }

    /// Blocks until the value is enqueued or the queue is closed. Returns
    /// `Err(value)` only on closure.
    pub fn wait_push(&self, value: T) -> Result<(), T> {
        if self.is_closed() {
            return Err(value);
        }
        let mut value = match self.put(value) {
            Ok(()) => {
                self.signal_not_empty();
                return Ok(());
            }
            Err(value) => value,
        };
        let mut gate = self.gate.lock().unwrap();
        loop {
            if self.is_closed() {
                return Err(value);
            }
            match self.put(value) {
                Ok(()) => {
                    self.not_empty.notify_one();
                    return Ok(());
                }
                Err(rejected) => value = rejected,
            }
            gate = self.not_full.wait(gate).unwrap();
        }
    }

    /// As [`wait_push`](Self::wait_push) with a deadline; a timeout counts
    /// as a discard.
    pub fn wait_push_for(&self, value: T, timeout: Duration) -> Result<(), T> {
        if self.is_closed() {
            return Err(value);
        }
        let mut value = match self.put(value) {
            Ok(()) => {
                self.signal_not_empty();
                return Ok(());
            }
            Err(value) => value,
        };
        let deadline = Instant::now() + timeout;
        let mut gate = self.gate.lock().unwrap();
        loop {
            if self.is_closed() {
                return Err(value);
            }
            match self.put(value) {
                Ok(()) => {
                    self.not_empty.notify_one();
                    return Ok(());
                }
                Err(rejected) => value = rejected,
            }
            let now = Instant::now();
            if now >= deadline {
                self.discards.fetch_add(1, Ordering::Relaxed);
                return Err(value);
            }
            let (guard, _) = self.not_full.wait_timeout(gate, deadline - now).unwrap();
            gate = guard;
        }
    }

    /// Constructs the value only after the closed latch has been checked,
    /// then behaves exactly like [`wait_push`](Self::wait_push).
    pub fn wait_push_with(&self, make: impl FnOnce() -> T) -> bool {
        if self.is_closed() {
            return false;
        }
        self.wait_push(make()).is_ok()
    }

    /// Blocks until a value is available or the queue is closed and drained.
    pub fn wait_pop(&self) -> Option<T> {
        if let Some(value) = self.take() {
            self.signal_not_full();
            return Some(value);
        }
        let mut gate = self.gate.lock().unwrap();
        loop {
            if let Some(value) = self.take() {
                self.not_full.notify_one();
                return Some(value);
            }
            if self.is_closed() {
                return None;
            }
            gate = self.not_empty.wait(gate).unwrap();
        }
    }

    /// As [`wait_pop`](Self::wait_pop) with a deadline. `None` means either
    /// the timeout elapsed or the queue is closed and drained; callers
    /// disambiguate through [`is_closed`](Self::is_closed).
    pub fn wait_pop_for(&self, timeout: Duration) -> Option<T> {
        if let Some(value) = self.take() {
            self.signal_not_full();
            return Some(value);
        }
        let deadline = Instant::now() + timeout;
        let mut gate = self.gate.lock().unwrap();
        loop {
            if let Some(value) = self.take() {
                self.not_full.notify_one();
                return Some(value);
            }
            if self.is_closed() {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = self.not_empty.wait_timeout(gate, deadline - now).unwrap();
            gate = guard;
        }
    }

    /// Enqueues items until the first rejection; returns how many were
    /// accepted. Items past the first rejection are not consumed from the
    /// iterator.
    pub fn try_push_batch<I: IntoIterator<Item = T>>(&self, items: I) -> usize {
        if self.is_closed() {
            return 0;
        }
        let mut pushed = 0;
        for item in items {
            if self.put(item).is_err() {
                break;
            }
            pushed += 1;
        }
        if pushed > 0 {
            let _gate = self.gate.lock().unwrap();
            self.not_empty.notify_all();
        }
        pushed
    }

    /// Dequeues up to `max` immediately available items.
    pub fn try_pop_batch(&self, max: usize) -> Vec<T> {
        let mut items = Vec::new();
        while items.len() < max {
            match self.take() {
                Some(value) => items.push(value),
                None => break,
            }
        }
        if !items.is_empty() {
            let _gate = self.gate.lock().unwrap();
            self.not_full.notify_all();
        }
        items
    }

    /// Latches the queue closed and wakes every waiter. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let _gate = self.gate.lock().unwrap();
            self.not_empty.notify_all();
            self.not_full.notify_all();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Drops every currently-enqueued item. Safe while closed.
    pub fn clear(&self) {
        self.clear_with(drop);
    }

    /// Drains every currently-enqueued item through `visit`.
    pub fn clear_with(&self, mut visit: impl FnMut(T)) {
        while let Some(value) = self.take() {
            visit(value);
        }
        let _gate = self.gate.lock().unwrap();
        self.not_full.notify_all();
    }

    /// Number of enqueued-but-not-dequeued items.
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::Acquire).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn discard_count(&self) -> usize {
        self.discards.load(Ordering::Relaxed)
    }

    pub fn reset_discard_counter(&self) {
        self.discards.store(0, Ordering::Relaxed);
    }
}
