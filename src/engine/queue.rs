//! Bounded single-producer single-consumer command ring.
//!
//! The single-producer/single-consumer split removes every CAS from the
//! hot path: the producer owns the head, the consumer owns the tail, and
//! one release/acquire pair per transfer publishes slot contents. Slots
//! are fixed-size (`T: Copy`), so nothing allocates after construction.

use crate::errors::EngineError;
use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct RingShared<T> {
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    /// Next sequence the producer will write.
    head: CachePadded<AtomicUsize>,
    /// Next sequence the consumer will read.
    tail: CachePadded<AtomicUsize>,
}

// Safety: the producer and consumer each touch disjoint slots, guarded by
// the head/tail release/acquire protocol; `T: Copy` values carry no drop
// obligations across the boundary.
unsafe impl<T: Copy + Send> Send for RingShared<T> {}
unsafe impl<T: Copy + Send> Sync for RingShared<T> {}

/// Producer half of the ring. Exactly one exists per ring.
pub struct Producer<T: Copy> {
    shared: Arc<RingShared<T>>,
}

/// Consumer half of the ring. Exactly one exists per ring.
pub struct Consumer<T: Copy> {
    shared: Arc<RingShared<T>>,
}

/// Creates a bounded SPSC ring of `capacity` slots.
///
/// # Errors
/// Returns [`EngineError::InvalidCapacity`] unless `capacity` is a
/// non-zero power of two.
pub fn ring<T: Copy + Send>(capacity: usize) -> Result<(Producer<T>, Consumer<T>), EngineError> {
    if capacity == 0 || !capacity.is_power_of_two() {
        return Err(EngineError::InvalidCapacity {
            capacity,
            requirement: "queue capacity must be a non-zero power of two",
        });
    }

    let buffer: Box<[UnsafeCell<MaybeUninit<T>>]> = (0..capacity)
        .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
        .collect();
    let shared = Arc::new(RingShared {
        buffer,
        mask: capacity - 1,
        head: CachePadded::new(AtomicUsize::new(0)),
        tail: CachePadded::new(AtomicUsize::new(0)),
    });

    Ok((
        Producer {
            shared: Arc::clone(&shared),
        },
        Consumer { shared },
    ))
}

impl<T: Copy + Send> Producer<T> {
    /// Publishes one item by copy. Returns `false` when the ring is full;
    /// a full ring applies nothing.
    #[inline]
    pub fn try_push(&mut self, item: T) -> bool {
        let shared = &*self.shared;
        let head = shared.head.load(Ordering::Relaxed);
        let tail = shared.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) > shared.mask {
            return false;
        }

        // Safety: `head` is not yet published, so the consumer cannot read
        // this slot until the release store below.
        unsafe {
            (*shared.buffer[head & shared.mask].get()).write(item);
        }
        shared.head.store(head.wrapping_add(1), Ordering::Release);
        true
    }

    /// Number of occupied slots (approximate from the producer side).
    #[must_use]
    pub fn len(&self) -> usize {
        let shared = &*self.shared;
        shared
            .head
            .load(Ordering::Relaxed)
            .wrapping_sub(shared.tail.load(Ordering::Relaxed))
    }

    /// True when no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ring capacity in slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.mask + 1
    }
}

impl<T: Copy + Send> Consumer<T> {
    /// Consumes one item, or `None` when the ring is empty.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        let shared = &*self.shared;
        let tail = shared.tail.load(Ordering::Relaxed);
        let head = shared.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }

        // Safety: the acquire load of `head` ordered this slot's contents
        // before us, and the producer will not rewrite it until `tail`
        // advances past it.
        let item = unsafe { (*shared.buffer[tail & shared.mask].get()).assume_init_read() };
        shared.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(item)
    }

    /// Dequeues up to `out.len()` items into the front of `out`, returning
    /// how many were written. The worker calls this with a small stack
    /// buffer to amortize the publication cost.
    pub fn pop_batch(&mut self, out: &mut [T]) -> usize {
        let mut count = 0;
        while count < out.len() {
            match self.try_pop() {
                Some(item) => {
                    out[count] = item;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    /// Number of occupied slots (approximate from the consumer side).
    #[must_use]
    pub fn len(&self) -> usize {
        let shared = &*self.shared;
        shared
            .head
            .load(Ordering::Relaxed)
            .wrapping_sub(shared.tail.load(Ordering::Relaxed))
    }

    /// True when no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ring capacity in slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.mask + 1
    }
}
