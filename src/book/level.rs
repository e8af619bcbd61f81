//! A single price level: fixed hot window plus overflow storage.
//!
//! The first [`HOT_WINDOW`] arrivals occupy the hot window, the only slots
//! touched on the happy matching path. Later arrivals spill into the
//! overflow list and slide forward only when the window is exhausted
//! during a sweep or when off-path compaction runs. Within a level, orders
//! fill strictly in arrival order.

use super::matcher::{HOT_WINDOW, HotSlot, MatchScan, match_hot_orders};
use crate::arena::{INVALID_INDEX, NodePool};
use crate::types::{Price, Quantity};
use std::collections::HashMap;
use tracing::trace;

/// One price level on one side of the book.
#[derive(Debug)]
pub struct PriceLevel {
    /// Tick price of this level (redundant with its index, kept for fast
    /// reads during matching).
    price: Price,
    /// Live resting orders at this level (hot + overflow).
    order_count: u32,
    /// Total open quantity across all live resting orders.
    total_qty: Quantity,
    /// Hot window lanes; lanes at or beyond `hot_len` are empty.
    hot: [HotSlot; HOT_WINDOW],
    /// Append cursor: extent of the window in use. Filled or cancelled
    /// lanes inside the extent stay empty in place so lane order always
    /// equals arrival order.
    hot_len: u32,
    /// Occupied lanes within the extent.
    hot_live: u32,
    /// Spilled node indices in arrival order; holes are `INVALID_INDEX`.
    overflow: Vec<u32>,
    /// Occupied overflow entries.
    overflow_live: u32,
    /// Node index -> overflow position, for O(1) cancels.
    positions: HashMap<u32, usize>,
    /// Set when overflow accumulated holes worth compacting.
    needs_compaction: bool,
}

impl PriceLevel {
    /// Creates an empty level at `price`.
    #[must_use]
    pub fn new(price: Price) -> Self {
        Self {
            price,
            order_count: 0,
            total_qty: 0,
            hot: [HotSlot::EMPTY; HOT_WINDOW],
            hot_len: 0,
            hot_live: 0,
            overflow: Vec::new(),
            overflow_live: 0,
            positions: HashMap::new(),
            needs_compaction: false,
        }
    }

    /// Tick price of this level.
    #[inline]
    #[must_use]
    pub fn price(&self) -> Price {
        self.price
    }

    /// Live resting orders at this level.
    #[inline]
    #[must_use]
    pub fn order_count(&self) -> u32 {
        self.order_count
    }

    /// Total open quantity resting at this level.
    #[inline]
    #[must_use]
    pub fn total_qty(&self) -> Quantity {
        self.total_qty
    }

    /// Occupied hot-window lanes.
    #[inline]
    #[must_use]
    pub fn hot_live(&self) -> u32 {
        self.hot_live
    }

    /// Occupied overflow entries.
    #[inline]
    #[must_use]
    pub fn overflow_live(&self) -> u32 {
        self.overflow_live
    }

    /// True when the overflow list has holes pending compaction.
    #[inline]
    #[must_use]
    pub fn needs_compaction(&self) -> bool {
        self.needs_compaction
    }

    /// Appends a resting order. The hot window takes it only while it has
    /// tail room AND overflow is empty; anything else spills, so every hot
    /// entry is older than every overflow entry and lane order stays FIFO.
    pub fn add(&mut self, node_idx: u32, qty: Quantity) {
        debug_assert!(qty > 0);
        if self.overflow_live == 0 && (self.hot_len as usize) < HOT_WINDOW {
            self.hot[self.hot_len as usize] = HotSlot {
                node: node_idx,
                qty,
            };
            self.hot_len += 1;
            self.hot_live += 1;
        } else {
            self.positions.insert(node_idx, self.overflow.len());
            self.overflow.push(node_idx);
            self.overflow_live += 1;
            trace!(
                price = self.price,
                overflow = self.overflow_live,
                "level spilled to overflow"
            );
        }
        self.order_count += 1;
        self.total_qty += qty;
    }

    /// Removes a resting order (cancel path). The hot lane is emptied in
    /// place rather than swap-compacted so arrival order inside the window
    /// is preserved for later sweeps. Returns false when the node is not
    /// at this level.
    pub fn remove(&mut self, node_idx: u32, qty: Quantity) -> bool {
        for lane in 0..self.hot_len as usize {
            if self.hot[lane].node == node_idx {
                self.hot[lane] = HotSlot::EMPTY;
                self.hot_live -= 1;
                self.order_count -= 1;
                self.total_qty -= qty;
                self.needs_compaction = true;
                return true;
            }
        }
        if let Some(pos) = self.positions.remove(&node_idx) {
            debug_assert_eq!(self.overflow[pos], node_idx);
            self.overflow[pos] = INVALID_INDEX;
            self.overflow_live -= 1;
            self.order_count -= 1;
            self.total_qty -= qty;
            self.needs_compaction = true;
            return true;
        }
        false
    }

    /// Scans the hot window for up to 16 fillable lanes.
    #[inline]
    #[must_use]
    pub fn match_hot(&self, incoming_qty: Quantity) -> MatchScan {
        match_hot_orders(&self.hot, self.hot_len as usize, incoming_qty)
    }

    /// Node index occupying `lane`, or `None` for an emptied lane.
    #[inline]
    #[must_use]
    pub fn hot_node(&self, lane: usize) -> Option<u32> {
        let slot = self.hot[lane];
        slot.is_occupied().then_some(slot.node)
    }

    /// Applies a partial fill to an occupied lane: the cached lane quantity
    /// and the level total move together.
    #[inline]
    pub fn apply_fill(&mut self, lane: usize, qty: Quantity) {
        debug_assert!(self.hot[lane].is_occupied());
        debug_assert!(self.hot[lane].qty >= qty);
        self.hot[lane].qty -= qty;
        self.total_qty -= qty;
    }

    /// Empties a lane whose maker fully filled.
    #[inline]
    pub fn clear_hot_lane(&mut self, lane: usize) {
        debug_assert!(self.hot[lane].is_occupied());
        debug_assert_eq!(self.hot[lane].qty, 0);
        self.hot[lane] = HotSlot::EMPTY;
        self.hot_live -= 1;
        self.order_count -= 1;
    }

    /// Slides overflow into the hot window once the window is exhausted
    /// mid-sweep. Only valid when no hot lane is occupied, so the refill
    /// cannot reorder arrivals.
    pub fn refill_hot_from_overflow(&mut self, pool: &NodePool) {
        debug_assert_eq!(self.hot_live, 0);
        if self.overflow_live == 0 {
            return;
        }

        self.hot = [HotSlot::EMPTY; HOT_WINDOW];
        self.hot_len = 0;
        self.positions.clear();

        let mut remainder = Vec::new();
        for node_idx in self.overflow.drain(..) {
            if node_idx == INVALID_INDEX {
                continue;
            }
            if (self.hot_len as usize) < HOT_WINDOW {
                let qty = pool.node(node_idx).hot.remaining;
                self.hot[self.hot_len as usize] = HotSlot {
                    node: node_idx,
                    qty,
                };
                self.hot_len += 1;
                self.hot_live += 1;
            } else {
                remainder.push(node_idx);
            }
        }
        for (pos, node_idx) in remainder.iter().enumerate() {
            self.positions.insert(*node_idx, pos);
        }
        self.overflow_live = remainder.len() as u32;
        self.overflow = remainder;
        self.needs_compaction = false;
        trace!(
            price = self.price,
            refilled = self.hot_live,
            overflow = self.overflow_live,
            "hot window refilled from overflow"
        );
    }

    /// Off-path maintenance: drops overflow holes, rebuilds the position
    /// index and trims empty lanes off the hot tail.
    pub fn compact_if_needed(&mut self) {
        if !self.needs_compaction {
            return;
        }

        self.overflow.retain(|idx| *idx != INVALID_INDEX);
        self.positions.clear();
        for (pos, idx) in self.overflow.iter().enumerate() {
            self.positions.insert(*idx, pos);
        }
        debug_assert_eq!(self.overflow.len() as u32, self.overflow_live);

        while self.hot_len > 0 && !self.hot[self.hot_len as usize - 1].is_occupied() {
            self.hot_len -= 1;
        }

        self.needs_compaction = false;
    }

    /// Live node indices at this level in priority order (tests and
    /// consistency checks).
    pub fn live_nodes(&self) -> impl Iterator<Item = u32> + '_ {
        let hot = self.hot[..self.hot_len as usize]
            .iter()
            .filter(|slot| slot.is_occupied())
            .map(|slot| slot.node);
        let overflow = self
            .overflow
            .iter()
            .copied()
            .filter(|idx| *idx != INVALID_INDEX);
        hot.chain(overflow)
    }
}
