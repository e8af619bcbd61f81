//! Engine events and the sink contract.
//!
//! Events are immutable by-copy values: once emitted they never reference
//! engine state, so a sink may hand them to another thread freely. Sinks
//! must not block the shard worker; any buffering is the sink's problem.

use crate::errors::RejectReason;
use crate::types::{OrderId, Price, Quantity, SymbolId, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// A fill between one maker and one taker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Incoming (aggressive) order id.
    pub taker_id: OrderId,
    /// Resting (passive) order id.
    pub maker_id: OrderId,
    /// Symbol traded.
    pub symbol: SymbolId,
    /// Execution price in ticks (the maker level's price).
    pub price: Price,
    /// Executed quantity.
    pub qty: Quantity,
    /// Engine timestamp of the fill.
    pub timestamp: Timestamp,
}

/// Acknowledgement that an order rested, or that a cancel succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accept {
    /// Engine-assigned order id.
    pub order_id: OrderId,
    /// Producer correlation id echoed back.
    pub client_id: u64,
    /// Engine timestamp.
    pub timestamp: Timestamp,
}

/// Terminal refusal of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reject {
    /// Engine-assigned order id, or 0 when the order never reached the
    /// pool (validation/risk/capacity rejects).
    pub order_id: OrderId,
    /// Producer correlation id echoed back.
    pub client_id: u64,
    /// Why the command was refused.
    pub reason: RejectReason,
    /// Engine timestamp.
    pub timestamp: Timestamp,
}

/// Top-of-book change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookUpdate {
    /// Highest populated bid, if any.
    pub best_bid: Option<Price>,
    /// Lowest populated ask, if any.
    pub best_ask: Option<Price>,
    /// Engine timestamp.
    pub timestamp: Timestamp,
}

/// Any event published by a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A fill occurred.
    Trade(Trade),
    /// An order rested or a cancel succeeded.
    Accept(Accept),
    /// A command was refused.
    Reject(Reject),
    /// The top of book moved.
    BookUpdate(BookUpdate),
}

/// Observer contract for shard events.
///
/// Implementations receive values by copy, in emission order, on the shard
/// worker's thread, and must return quickly. Multiple sinks attached to a
/// shard are invoked in registration order.
pub trait EventSink: Send {
    /// A fill occurred.
    fn on_trade(&self, _trade: &Trade) {}
    /// An order rested or a cancel succeeded.
    fn on_accept(&self, _accept: &Accept) {}
    /// A command was refused.
    fn on_reject(&self, _reject: &Reject) {}
    /// The top of book moved.
    fn on_book_update(&self, _update: &BookUpdate) {}

    /// Dispatches one event to the matching callback.
    fn on_event(&self, event: &EngineEvent) {
        match event {
            EngineEvent::Trade(trade) => self.on_trade(trade),
            EngineEvent::Accept(accept) => self.on_accept(accept),
            EngineEvent::Reject(reject) => self.on_reject(reject),
            EngineEvent::BookUpdate(update) => self.on_book_update(update),
        }
    }
}

/// A sink that discards everything. Valid and occasionally useful.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {}

/// A sink that buffers every event behind a mutex. Clones share the same
/// buffer, so tests and demos keep one handle and register the other.
#[derive(Debug, Default, Clone)]
pub struct VecSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl VecSink {
    /// Creates an empty buffered sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every buffered event, leaving the buffer empty.
    #[must_use]
    pub fn drain(&self) -> Vec<EngineEvent> {
        let mut guard = self.events.lock().expect("sink buffer poisoned");
        std::mem::take(&mut *guard)
    }

    /// Number of buffered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().expect("sink buffer poisoned").len()
    }

    /// True when no events are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for VecSink {
    fn on_event(&self, event: &EngineEvent) {
        self.events
            .lock()
            .expect("sink buffer poisoned")
            .push(*event);
    }
}
