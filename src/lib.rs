//! # MatchBook: A Single-Shard Matching Engine Core
//!
//! A price-time priority limit order book matching engine written in Rust, built
//! for high-frequency trading experimentation. The crate provides the hot path of
//! an exchange shard: order entry and cancellation, pre-trade risk, crossing
//! against resting liquidity and an event stream of accepts, rejects, trades and
//! book updates.
//!
//! ## Key Features
//!
//! - **Pre-allocated order storage**: every order lives in a fixed-capacity node
//!   arena addressed by `(index, generation)` handles, so the matching path never
//!   allocates and stale references fail cleanly instead of aliasing reused slots.
//!
//! - **Segment-tree level lookup**: per-tick populations are indexed by array
//!   segment trees, giving O(log N) "next populated level in range" jumps during
//!   crossing instead of scanning the price grid.
//!
//! - **Hot-window price levels**: the first 32 arrivals at a tick sit in a fixed
//!   lane window matched up to 16 lanes per scan; later arrivals spill to an
//!   overflow list that slides forward only when the window drains.
//!
//! - **Lock-free command ring**: producers publish fixed-size commands through a
//!   bounded SPSC ring with one release/acquire pair per transfer and no CAS on
//!   the hot path.
//!
//! - **Deterministic single-writer shards**: one OS thread owns each shard's
//!   pool, book and risk state. Event sinks observe by copy and never mutate
//!   engine state; deferred epoch reclamation lets them validate order ids from
//!   other threads without racing slot reuse.
//!
//! - **Pre-trade risk**: per-order quantity and 128-bit notional bounds with
//!   per-symbol overrides, plus a token-bucket rate limiter that a performance
//!   mode can bypass for replay benchmarks.
//!
//! ## Design Goals
//!
//! 1. **Correctness**: price-time priority, quantity conservation and
//!    segment-tree fidelity hold for every command sequence; the invariants are
//!    enforced by property tests.
//! 2. **Latency**: the happy path touches the ring, the risk gate, one pool slot
//!    and one hot window; no locks, no allocation, no syscalls.
//! 3. **Determinism**: a shard is a pure function of its command sequence, which
//!    keeps replay, testing and simulation exact.
//!
//! ## Architecture
//!
//! ```text
//! producer thread          shard worker thread              sink threads
//! --------------          --------------------              ------------
//! submit(Command) --> SPSC ring --> risk gate --> node pool
//!                                        |            |
//!                                        v            v
//!                                   order book <-> price levels
//!                                        |       (hot window + overflow,
//!                                        |        segment trees, trackers)
//!                                        v
//!                                  EngineEvent --> EventSink, ...
//! ```
//!
//! ## Example
//!
//! ```
//! use matchbook_rs::prelude::*;
//!
//! let config = EngineConfig::example();
//! let mut core = ShardCore::new(&config).expect("valid config");
//! let sink = VecSink::new();
//! core.add_sink(Box::new(sink.clone()));
//!
//! core.process(Command::NewOrder(NewOrder::limit(Side::Sell, 100, 10, 1)));
//! core.process(Command::NewOrder(NewOrder::limit(Side::Buy, 100, 10, 1)));
//!
//! let trades: Vec<_> = sink
//!     .drain()
//!     .into_iter()
//!     .filter(|e| matches!(e, EngineEvent::Trade(_)))
//!     .collect();
//! assert_eq!(trades.len(), 1);
//! ```
//!
//! ## Status
//!
//! This project is a research engine: it trades generality (one symbol class
//! per shard, a fixed tick grid) for a short, predictable hot path. It is not
//! an exchange.

pub mod arena;
pub mod book;
pub mod clock;
pub mod engine;
pub mod errors;

pub mod prelude;
mod types;
mod utils;

pub use arena::{EpochReclaimer, NodePool, OrderNode, ReaderId};
pub use book::{OrderBook, PriceLevel, SegmentTree};
pub use clock::{CalibrationParams, Clock};
pub use engine::{
    Accept, BookUpdate, Command, EngineConfig, EngineEvent, EventSink, LevelUpdate,
    MarketDataFrame, NewOrder, NullSink, Reject, RiskConfig, RiskGate, ShardCore, ShardHandle,
    ShardWorker, StatsSnapshot, SymbolLimit, Trade, VecSink, decode_order_id, encode_order_id,
    spawn_shard,
};
pub use errors::{EngineError, RejectReason};
pub use types::{OrderId, OrderKind, OrderStatus, Price, Quantity, Side, SymbolId, TimeInForce};
pub use utils::current_time_millis;
