//! Hot-window matcher: fills up to 16 resting orders at a level against
//! one incoming order per invocation.
//!
//! The contract is purely positional: the first up-to-16 occupied lanes in
//! index order, each clamped to `min(lane_qty, incoming_qty)`. The routine
//! never decrements `incoming_qty` across lanes; the caller applies its own
//! running clamp while walking the pairs. Capping the output at 16 bounds
//! per-invocation event emission and keeps the caller's bookkeeping
//! cache-resident.
//!
//! The implementation processes four lanes per iteration over a fixed-width
//! window so the compiler can vectorize it; the straight scalar loop is
//! kept as the equivalence reference for tests.

use crate::arena::INVALID_INDEX;
use crate::types::Quantity;

/// Number of hot-window slots per price level.
pub const HOT_WINDOW: usize = 32;

/// Maximum `(slot, qty)` pairs produced per invocation.
pub const MAX_MATCHES: usize = 16;

/// One hot-window lane: a node index plus its cached open quantity.
#[derive(Debug, Clone, Copy)]
pub struct HotSlot {
    /// Pool index of the resting node, or [`INVALID_INDEX`] when empty.
    pub node: u32,
    /// Cached remaining quantity; 0 when the lane is empty.
    pub qty: Quantity,
}

impl HotSlot {
    /// An empty lane.
    pub const EMPTY: HotSlot = HotSlot {
        node: INVALID_INDEX,
        qty: 0,
    };

    /// True when a live node occupies the lane.
    #[inline]
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.node != INVALID_INDEX
    }
}

/// Result of one hot-window scan: parallel slot/quantity arrays.
#[derive(Debug, Clone, Copy)]
pub struct MatchScan {
    /// Hot-window slot positions, valid for `[0, count)`.
    pub slots: [u16; MAX_MATCHES],
    /// Clamped matchable quantity per slot, valid for `[0, count)`.
    pub qtys: [Quantity; MAX_MATCHES],
    /// Number of valid pairs.
    pub count: u32,
}

impl MatchScan {
    #[inline]
    fn empty() -> Self {
        Self {
            slots: [0; MAX_MATCHES],
            qtys: [0; MAX_MATCHES],
            count: 0,
        }
    }
}

/// Scans `window[..extent]` and returns the first up-to-16 occupied lanes
/// in index order, each clamped to `min(lane_qty, incoming_qty)`.
#[must_use]
pub fn match_hot_orders(
    window: &[HotSlot; HOT_WINDOW],
    extent: usize,
    incoming_qty: Quantity,
) -> MatchScan {
    let mut scan = MatchScan::empty();
    if incoming_qty <= 0 || extent == 0 {
        return scan;
    }
    let extent = extent.min(HOT_WINDOW);

    let mut produced = 0usize;
    let mut lane = 0usize;
    // Four lanes per iteration; each lane computes its clamp branch-free
    // and only the emit step branches.
    while lane + 4 <= extent && produced < MAX_MATCHES {
        let mut matched = [0 as Quantity; 4];
        for j in 0..4 {
            let slot = window[lane + j];
            let valid = (slot.is_occupied() && slot.qty > 0) as i64;
            matched[j] = valid * slot.qty.min(incoming_qty);
        }
        for (j, &m) in matched.iter().enumerate() {
            if m > 0 && produced < MAX_MATCHES {
                scan.slots[produced] = (lane + j) as u16;
                scan.qtys[produced] = m;
                produced += 1;
            }
        }
        lane += 4;
    }
    while lane < extent && produced < MAX_MATCHES {
        let slot = window[lane];
        if slot.is_occupied() && slot.qty > 0 {
            scan.slots[produced] = lane as u16;
            scan.qtys[produced] = slot.qty.min(incoming_qty);
            produced += 1;
        }
        lane += 1;
    }

    scan.count = produced as u32;
    scan
}

/// Straight scalar reference; the lane-parallel routine must be
/// bit-identical to this.
#[cfg(test)]
pub(crate) fn match_hot_orders_reference(
    window: &[HotSlot; HOT_WINDOW],
    extent: usize,
    incoming_qty: Quantity,
) -> MatchScan {
    let mut scan = MatchScan::empty();
    if incoming_qty <= 0 {
        return scan;
    }
    let mut produced = 0usize;
    for lane in 0..extent.min(HOT_WINDOW) {
        if produced >= MAX_MATCHES {
            break;
        }
        let slot = window[lane];
        if slot.is_occupied() && slot.qty > 0 {
            scan.slots[produced] = lane as u16;
            scan.qtys[produced] = slot.qty.min(incoming_qty);
            produced += 1;
        }
    }
    scan.count = produced as u32;
    scan
}
