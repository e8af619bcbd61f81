//! Prelude module that re-exports commonly used types and traits.
//!
//! This module provides a convenient way to import the most commonly used
//! types, traits, and functions from the matchbook-rs crate. Instead of
//! importing each type individually, you can use:
//!
//! ```rust
//! use matchbook_rs::prelude::*;
//! ```
//!
//! This will import all the essential types needed for driving a shard.

// Shard pipeline
pub use crate::engine::{
    Command, EngineConfig, LevelUpdate, MarketDataFrame, NewOrder, RiskConfig, ShardCore,
    ShardHandle, ShardWorker, StatsSnapshot, SymbolLimit, spawn_shard,
};

// Events and sinks
pub use crate::engine::{
    Accept, BookUpdate, EngineEvent, EventSink, NullSink, Reject, Trade, VecSink,
};

// Book and storage
pub use crate::arena::{EpochReclaimer, NodePool};
pub use crate::book::{OrderBook, PriceLevel, SegmentTree};

// Clock
pub use crate::clock::{CalibrationParams, Clock};

// Scalars, enums and errors
pub use crate::errors::{EngineError, RejectReason};
pub use crate::types::{
    OrderId, OrderKind, OrderStatus, Price, Quantity, Side, SymbolId, TimeInForce,
};

// External id codec
pub use crate::engine::{decode_order_id, encode_order_id};

// Utility functions
pub use crate::utils::current_time_millis;
