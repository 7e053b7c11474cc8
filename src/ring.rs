//! Bounded lock-free MPMC ring buffer.
//!
//! This is the hot path of the pool: a fixed-capacity slot array where every
//! slot carries a sequence number (Vyukov's bounded MPMC design). Producers
//! and consumers claim positions with a compare-and-swap on their respective
//! index and publish through the slot sequence, so neither side ever blocks
//! the other and a failed push observably returns the value to the caller.
//!
//! Sequence protocol: slot `i` starts at sequence `i`. A producer claiming
//! position `p` requires `seq == p` and publishes `seq = p + 1`; a consumer
//! claiming position `c` requires `seq == c + 1` and publishes
//! `seq = c + capacity`, opening the slot for the next lap. Sequences only
//! grow, which rules out ABA.

use crossbeam::utils::{Backoff, CachePadded};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Slot<T> {
    seq: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Fixed-capacity MPMC queue with FIFO ordering across the whole buffer.
///
/// Capacity is rounded up to a power of two (minimum 2) so positions map to
/// slots with a mask instead of a modulo.
pub struct RingBuffer<T> {
    /// Next position a producer will claim.
    head: CachePadded<AtomicUsize>,
    /// Next position a consumer will claim.
    tail: CachePadded<AtomicUsize>,
    buffer: Box<[CachePadded<Slot<T>>]>,
    mask: usize,
}

unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Creates a buffer holding at least `capacity` items.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        let buffer: Box<[CachePadded<Slot<T>>]> = (0..capacity)
            .map(|i| {
                CachePadded::new(Slot {
                    seq: AtomicUsize::new(i),
                    value: UnsafeCell::new(MaybeUninit::uninit()),
                })
            })
            .collect();
        RingBuffer {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            buffer,
            mask: capacity - 1,
        }
    }

    /// Attempts to enqueue `value` without blocking.
    ///
    /// Returns `Err(value)` if the buffer is full at the moment of the
    /// attempt; the value is handed back untouched.
    pub fn push(&self, value: T) -> Result<(), T> {
        let backoff = Backoff::new();
        let mut pos = self.head.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[pos & self.mask];
            let seq = slot.seq.load(Ordering::Acquire);
            let diff = (seq as isize).wrapping_sub(pos as isize);
            if diff == 0 {
                match self.head.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => {
                        unsafe { (*slot.value.get()).write(value) };
                        slot.seq.store(pos.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => {
                        pos = current;
                        backoff.spin();
                    }
                }
            } else if diff < 0 {
                // This lap's slot has not been consumed yet: full.
                return Err(value);
            } else {
                // Another producer claimed the slot first.
                pos = self.head.load(Ordering::Relaxed);
                backoff.spin();
            }
        }
    }

    /// Attempts to dequeue without blocking. Returns `None` if the buffer is
    /// empty at the moment of the attempt.
    pub fn pop(&self) -> Option<T> {
        let backoff = Backoff::new();
        let mut pos = self.tail.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[pos & self.mask];
            let seq = slot.seq.load(Ordering::Acquire);
            let diff = (seq as isize).wrapping_sub(pos.wrapping_add(1) as isize);
            if diff == 0 {
                match self.tail.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => {
                        let value = unsafe { (*slot.value.get()).assume_init_read() };
                        slot.seq
                            .store(pos.wrapping_add(self.capacity()), Ordering::Release);
                        return Some(value);
                    }
                    Err(current) => {
                        pos = current;
                        backoff.spin();
                    }
                }
            } else if diff < 0 {
                // This lap's slot has not been produced yet: empty.
                return None;
            } else {
                // Another consumer claimed the slot first.
                pos = self.tail.load(Ordering::Relaxed);
                backoff.spin();
            }
        }
    }

    /// Number of items currently enqueued. Stale under concurrency but
    /// always within `[0, capacity]`.
    pub fn approx_len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        let diff = head.wrapping_sub(tail) as isize;
        if diff < 0 {
            0
        } else {
            (diff as usize).min(self.capacity())
        }
    }

    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    pub fn is_empty(&self) -> bool {
        self.approx_len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.approx_len() >= self.capacity()
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}
