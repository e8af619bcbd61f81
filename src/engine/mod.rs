//! The command pipeline: risk gate, SPSC command ring, shard worker and
//! the event sink contract.

mod command;
mod config;
mod event;
pub mod queue;
mod risk;
mod shard;

mod tests;

pub use command::{Command, FRAME_LEVELS, LevelUpdate, MarketDataFrame, NewOrder};
pub use config::{EngineConfig, RiskConfig, SymbolLimit};
pub use event::{Accept, BookUpdate, EngineEvent, EventSink, NullSink, Reject, Trade, VecSink};
pub use queue::{Consumer, Producer, ring};
pub use risk::{RiskGate, TokenBucket};
pub use shard::{
    DEQUEUE_BATCH, MAINTENANCE_INTERVAL, ShardCore, ShardHandle, ShardStats, ShardWorker,
    StatsSnapshot, decode_order_id, encode_order_id, spawn_shard,
};
