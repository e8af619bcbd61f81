//! Order node layout: the unit of storage in the pre-allocated pool.

use crate::types::{
    OrderId, OrderKind, OrderStatus, Price, Quantity, Side, SymbolId, TimeInForce, Timestamp,
    UserId,
};

/// Sentinel for "no node" in hot-window slots and overflow lists.
pub const INVALID_INDEX: u32 = u32::MAX;

/// Fields touched on every match, kept in one compact group.
#[derive(Debug, Clone, Copy)]
pub struct OrderHot {
    /// Externally visible order id (`[shard:8][generation:32][index:24]`).
    pub id: OrderId,
    /// Limit price in ticks; 0 for market orders.
    pub price: Price,
    /// Quantity still open.
    pub remaining: Quantity,
    /// Quantity filled so far.
    pub filled: Quantity,
    /// Enqueue timestamp in nanoseconds.
    pub timestamp: Timestamp,
    /// Symbol this order trades.
    pub symbol: SymbolId,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Buy or sell. Immutable after init.
    pub side: Side,
    /// Market or limit. Immutable after init.
    pub kind: OrderKind,
    /// Time-in-force policy. Immutable after init.
    pub tif: TimeInForce,
}

/// Fields only read on attribution paths, kept off the hot line.
#[derive(Debug, Clone, Copy)]
pub struct OrderCold {
    /// Owner identity for attribution and per-user controls.
    pub user_id: UserId,
    /// Producer-supplied correlation id echoed in accept/reject events.
    pub client_id: u64,
}

/// A pooled order node. Identity is `(index, generation)`; the generation
/// is odd while the slot is live and even while it is free, so a stale
/// handle can never alias a reused slot.
#[derive(Debug, Clone, Copy)]
#[repr(C, align(64))]
pub struct OrderNode {
    /// Slot position inside the pool. Never changes.
    pub index: u32,
    /// Reuse counter; parity encodes live/free.
    pub generation: u32,
    /// Hot fields.
    pub hot: OrderHot,
    /// Cold fields. Not zeroed on release; re-initialized on acquire.
    pub cold: OrderCold,
}

impl OrderNode {
    pub(crate) fn empty(index: u32) -> Self {
        Self {
            index,
            generation: 0,
            hot: OrderHot {
                id: 0,
                price: 0,
                remaining: 0,
                filled: 0,
                timestamp: 0,
                symbol: 0,
                status: OrderStatus::New,
                side: Side::Buy,
                kind: OrderKind::Limit,
                tif: TimeInForce::Gtc,
            },
            cold: OrderCold {
                user_id: 0,
                client_id: 0,
            },
        }
    }

    /// Resets the hot fields for reuse. Cold fields are left as-is.
    #[inline]
    pub(crate) fn reset(&mut self) {
        self.hot.id = 0;
        self.hot.price = 0;
        self.hot.remaining = 0;
        self.hot.filled = 0;
        self.hot.timestamp = 0;
        self.hot.status = OrderStatus::New;
    }

    /// True while the node is checked out of the free list.
    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.generation & 1 == 1
    }
}
