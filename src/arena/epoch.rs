//! Epoch-based deferred reclamation for order nodes.
//!
//! Event sinks may capture an order id from a `Trade` and later validate it
//! against the pool from another thread. Reclamation of a consumed node is
//! therefore deferred: readers publish their current epoch while inspecting
//! handles, and a node's slot is only returned to the pool once every
//! pinned reader has advanced past the epoch in which the node was retired.
//!
//! The deferred list is owned by the shard worker (the sole caller of
//! `defer`/`try_reclaim`); only the epoch table is shared.

use super::pool::NodePool;
use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::trace;

/// Maximum number of concurrently registered readers.
pub const MAX_READERS: usize = 64;

/// Deferred-list length that triggers an inline reclamation attempt.
pub const RECLAIM_BATCH: usize = 1024;

/// Sentinel published by readers outside any critical section.
const IDLE_EPOCH: u64 = u64::MAX;

/// Handle identifying a registered reader slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderId(usize);

#[derive(Debug, Clone, Copy)]
struct Deferred {
    index: u32,
    epoch: u64,
}

/// Region-based reclaimer: readers pin epochs, the worker defers and frees.
#[derive(Debug)]
pub struct EpochReclaimer {
    global: CachePadded<AtomicU64>,
    readers: Box<[CachePadded<AtomicU64>]>,
    next_reader: AtomicUsize,
    deferred: Vec<Deferred>,
}

impl EpochReclaimer {
    /// Creates a reclaimer with an empty deferred list.
    #[must_use]
    pub fn new() -> Self {
        let readers: Box<[CachePadded<AtomicU64>]> = (0..MAX_READERS)
            .map(|_| CachePadded::new(AtomicU64::new(IDLE_EPOCH)))
            .collect();
        Self {
            global: CachePadded::new(AtomicU64::new(0)),
            readers,
            next_reader: AtomicUsize::new(0),
            deferred: Vec::with_capacity(RECLAIM_BATCH + 1),
        }
    }

    /// Registers a reader slot. Returns `None` once all [`MAX_READERS`]
    /// slots are taken; registration is once per thread, not per read.
    pub fn register_reader(&self) -> Option<ReaderId> {
        let slot = self.next_reader.fetch_add(1, Ordering::Relaxed);
        if slot < MAX_READERS {
            Some(ReaderId(slot))
        } else {
            None
        }
    }

    /// Publishes the reader's entry into a read-side critical section.
    #[inline]
    pub fn pin(&self, reader: ReaderId) {
        let epoch = self.global.load(Ordering::Acquire);
        self.readers[reader.0].store(epoch, Ordering::Release);
    }

    /// Publishes the reader's exit from its critical section.
    #[inline]
    pub fn unpin(&self, reader: ReaderId) {
        self.readers[reader.0].store(IDLE_EPOCH, Ordering::Release);
    }

    /// Number of nodes waiting for reclamation.
    #[inline]
    #[must_use]
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Defers reclamation of a retired node. When the deferred list grows
    /// past [`RECLAIM_BATCH`], a reclamation pass runs inline.
    pub fn defer(&mut self, index: u32, pool: &mut NodePool) {
        let epoch = self.global.load(Ordering::Relaxed);
        self.deferred.push(Deferred { index, epoch });
        if self.deferred.len() > RECLAIM_BATCH {
            self.try_reclaim(pool);
        }
    }

    /// Advances the global epoch and releases every deferred node retired
    /// strictly before the minimum pinned epoch. Returns the number of
    /// nodes released.
    pub fn try_reclaim(&mut self, pool: &mut NodePool) -> usize {
        if self.deferred.is_empty() {
            return 0;
        }

        let advanced = self.global.fetch_add(1, Ordering::AcqRel) + 1;
        let mut min_epoch = advanced;
        for reader in self.readers.iter() {
            let epoch = reader.load(Ordering::Acquire);
            if epoch != IDLE_EPOCH && epoch < min_epoch {
                min_epoch = epoch;
            }
        }

        let mut released = 0;
        let mut i = 0;
        while i < self.deferred.len() {
            if self.deferred[i].epoch < min_epoch {
                let item = self.deferred.swap_remove(i);
                pool.release(item.index);
                released += 1;
            } else {
                i += 1;
            }
        }

        if released > 0 {
            trace!(released, remaining = self.deferred.len(), "epoch reclaim");
        }
        released
    }
}

impl Default for EpochReclaimer {
    fn default() -> Self {
        Self::new()
    }
}
