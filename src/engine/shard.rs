//! Shard: the unit of single-threaded ownership.
//!
//! A shard owns one pool, one book, one risk gate and one command ring.
//! [`ShardCore`] is the deterministic pipeline (dequeue-free, directly
//! drivable from tests); [`ShardWorker`] wraps a core with the consumer
//! side of the ring and the cooperative run loop. Producers hold a
//! [`ShardHandle`] and submit commands by copy.

use super::command::{Command, MarketDataFrame, NewOrder};
use super::config::EngineConfig;
use super::event::{EngineEvent, EventSink, Reject};
use super::queue::{Consumer, Producer, ring};
use super::risk::RiskGate;
use crate::arena::{EpochReclaimer, NodePool};
use crate::book::OrderBook;
use crate::clock::Clock;
use crate::errors::{EngineError, RejectReason};
use crate::types::{OrderId, OrderKind, OrderStatus, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Commands dequeued per worker iteration.
pub const DEQUEUE_BATCH: usize = 16;

/// Worker iterations between maintenance passes (level compaction and
/// epoch reclamation).
pub const MAINTENANCE_INTERVAL: u64 = 1024;

/// Packs an external order id: `[shard:8][generation:32][index:24]`.
#[inline]
#[must_use]
pub fn encode_order_id(shard_id: u8, generation: u32, index: u32) -> OrderId {
    debug_assert!(index < (1 << 24));
    (u64::from(shard_id) << 56) | (u64::from(generation) << 24) | u64::from(index & 0x00FF_FFFF)
}

/// Unpacks an external order id into `(shard, generation, index)`.
#[inline]
#[must_use]
pub fn decode_order_id(id: OrderId) -> (u8, u32, u32) {
    let shard_id = (id >> 56) as u8;
    let generation = ((id >> 24) & 0xFFFF_FFFF) as u32;
    let index = (id & 0x00FF_FFFF) as u32;
    (shard_id, generation, index)
}

/// Per-shard counters, shared with observers.
#[derive(Debug, Default)]
pub struct ShardStats {
    commands: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
    trades: AtomicU64,
}

/// Point-in-time copy of the shard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Commands processed.
    pub commands: u64,
    /// Accept events emitted.
    pub accepted: u64,
    /// Reject events emitted.
    pub rejected: u64,
    /// Trade events emitted.
    pub trades: u64,
}

impl ShardStats {
    /// Snapshots the counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            commands: self.commands.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            trades: self.trades.load(Ordering::Relaxed),
        }
    }
}

/// The deterministic command pipeline: risk, pool, book, event fan-out.
pub struct ShardCore {
    shard_id: u8,
    pool: NodePool,
    book: OrderBook,
    risk: RiskGate,
    epoch: EpochReclaimer,
    clock: Clock,
    sinks: Vec<Box<dyn EventSink>>,
    scratch: Vec<EngineEvent>,
    stats: Arc<ShardStats>,
}

impl ShardCore {
    /// Builds a core from configuration.
    ///
    /// When a calibration path is configured, a persisted blob is loaded
    /// (or a fresh calibration measured and saved); failures degrade to the
    /// monotonic clock rather than failing construction.
    ///
    /// # Errors
    /// Returns [`EngineError`] when the configuration fails validation.
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let clock = match &config.tsc_calibration_path {
            Some(path) => match Clock::calibrate_and_persist(path, Duration::from_millis(20)) {
                Ok(params) => Clock::with_calibration(params),
                Err(err) => {
                    warn!(%err, "clock calibration failed; using monotonic clock");
                    Clock::monotonic()
                }
            },
            None => Clock::monotonic(),
        };

        let pool = NodePool::new(config.pool_capacity)?;
        let book = OrderBook::new(
            config.symbol,
            config.min_price_ticks,
            config.max_price_ticks,
            config.tick_size_ticks,
        )?;

        info!(
            shard_id = config.shard_id,
            levels = book.num_levels(),
            pool = config.pool_capacity,
            "shard core ready"
        );

        Ok(Self {
            shard_id: config.shard_id,
            pool,
            book,
            risk: RiskGate::new(&config.risk),
            epoch: EpochReclaimer::new(),
            clock,
            sinks: Vec::new(),
            scratch: Vec::with_capacity(64),
            stats: Arc::new(ShardStats::default()),
        })
    }

    /// Shard identity encoded into external order ids.
    #[inline]
    #[must_use]
    pub fn shard_id(&self) -> u8 {
        self.shard_id
    }

    /// Attaches a sink; delivery follows registration order.
    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// The book owned by this shard.
    #[must_use]
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// The pool owned by this shard.
    #[must_use]
    pub fn pool(&self) -> &NodePool {
        &self.pool
    }

    /// The risk gate owned by this shard.
    pub fn risk_mut(&mut self) -> &mut RiskGate {
        &mut self.risk
    }

    /// The epoch reclaimer owned by this shard. Readers register here.
    #[must_use]
    pub fn epoch(&self) -> &EpochReclaimer {
        &self.epoch
    }

    /// Shared counter handle.
    #[must_use]
    pub fn stats(&self) -> Arc<ShardStats> {
        Arc::clone(&self.stats)
    }

    /// Processes one command to completion: every command produces exactly
    /// one terminal outcome through the sinks.
    pub fn process(&mut self, command: Command) {
        self.stats.commands.fetch_add(1, Ordering::Relaxed);
        match command {
            Command::NewOrder(order) => self.submit_order(order, true),
            Command::Cancel { order_id } => self.cancel_order(order_id),
            Command::MarketData(frame) => self.apply_market_data(&frame),
        }
    }

    /// Off-path maintenance: level compaction plus an epoch reclamation
    /// attempt.
    pub fn run_maintenance(&mut self) {
        self.book.periodic_maintenance();
        self.epoch.try_reclaim(&mut self.pool);
    }

    fn submit_order(&mut self, order: NewOrder, enforce_rate: bool) {
        let now = self.clock.now_ns();
        let verdict = if enforce_rate {
            self.risk.validate(&order, now)
        } else {
            self.risk.check_bounds(&order)
        };
        if let Err(reason) = verdict {
            self.emit_reject(0, order.client_id, reason, now);
            return;
        }

        let Some(index) = self.pool.acquire() else {
            debug!(client_id = order.client_id, "pool exhausted");
            self.emit_reject(0, order.client_id, RejectReason::PoolExhausted, now);
            return;
        };

        let generation = self.pool.node(index).generation;
        let order_id = encode_order_id(self.shard_id, generation, index);
        {
            let node = self.pool.node_mut(index);
            node.hot.id = order_id;
            node.hot.price = match order.kind {
                OrderKind::Limit => order.price,
                OrderKind::Market => 0,
            };
            node.hot.remaining = order.qty;
            node.hot.filled = 0;
            node.hot.timestamp = now;
            node.hot.symbol = order.symbol;
            node.hot.status = OrderStatus::New;
            node.hot.side = order.side;
            node.hot.kind = order.kind;
            node.hot.tif = order.tif;
            node.cold.user_id = order.user_id;
            node.cold.client_id = order.client_id;
        }

        self.scratch.clear();
        self.book.process_new_order(
            index,
            &mut self.pool,
            &mut self.epoch,
            &self.clock,
            &mut self.scratch,
        );
        self.dispatch_scratch();
    }

    fn cancel_order(&mut self, order_id: OrderId) {
        let now = self.clock.now_ns();
        let (shard_id, generation, index) = decode_order_id(order_id);
        if shard_id != self.shard_id {
            self.emit_reject(order_id, 0, RejectReason::UnknownOrder, now);
            return;
        }

        let status = match self.pool.get(index, generation) {
            Some(node) => node.hot.status,
            None => {
                self.emit_reject(order_id, 0, RejectReason::UnknownOrder, now);
                return;
            }
        };
        if status.is_terminal() {
            // A terminal node awaiting reclamation answers the same as a
            // reclaimed one: idempotent cancels stay UnknownOrder.
            self.emit_reject(order_id, 0, RejectReason::UnknownOrder, now);
            return;
        }

        self.scratch.clear();
        self.book.process_cancel(
            index,
            &mut self.pool,
            &mut self.epoch,
            &self.clock,
            &mut self.scratch,
        );
        self.dispatch_scratch();
    }

    /// Replays a market-data frame as anonymous GTC limit orders. Rate
    /// exempt; bounds checks still apply per order.
    fn apply_market_data(&mut self, frame: &MarketDataFrame) {
        for level in frame.bid_levels() {
            self.submit_order(
                NewOrder::limit(crate::types::Side::Buy, level.price, level.qty, frame.symbol),
                false,
            );
        }
        for level in frame.ask_levels() {
            self.submit_order(
                NewOrder::limit(crate::types::Side::Sell, level.price, level.qty, frame.symbol),
                false,
            );
        }
    }

    fn emit_reject(&mut self, order_id: OrderId, client_id: u64, reason: RejectReason, now: Timestamp) {
        self.scratch.clear();
        self.scratch.push(EngineEvent::Reject(Reject {
            order_id,
            client_id,
            reason,
            timestamp: now,
        }));
        self.dispatch_scratch();
    }

    fn dispatch_scratch(&mut self) {
        for event in &self.scratch {
            match event {
                EngineEvent::Trade(_) => {
                    self.stats.trades.fetch_add(1, Ordering::Relaxed);
                }
                EngineEvent::Accept(_) => {
                    self.stats.accepted.fetch_add(1, Ordering::Relaxed);
                }
                EngineEvent::Reject(_) => {
                    self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                }
                EngineEvent::BookUpdate(_) => {}
            }
            for sink in &self.sinks {
                sink.on_event(event);
            }
        }
    }
}

/// Cooperative consumer loop around a [`ShardCore`].
pub struct ShardWorker {
    core: ShardCore,
    consumer: Consumer<Command>,
    stop: Arc<AtomicBool>,
}

impl ShardWorker {
    /// Wraps a core with the consumer side of its ring and a stop flag.
    #[must_use]
    pub fn new(core: ShardCore, consumer: Consumer<Command>, stop: Arc<AtomicBool>) -> Self {
        Self {
            core,
            consumer,
            stop,
        }
    }

    /// Runs until the stop flag is set and the queue is drained, then
    /// returns the core. Commands are dequeued in batches; an empty batch
    /// yields a pause hint to the scheduler.
    pub fn run(mut self) -> ShardCore {
        let mut batch = [Command::Cancel { order_id: 0 }; DEQUEUE_BATCH];
        let mut iterations: u64 = 0;

        loop {
            let count = self.consumer.pop_batch(&mut batch);
            if count == 0 {
                if self.stop.load(Ordering::Acquire) {
                    break;
                }
                std::hint::spin_loop();
                std::thread::yield_now();
            } else {
                for command in &batch[..count] {
                    self.core.process(*command);
                }
            }

            iterations = iterations.wrapping_add(1);
            if iterations % MAINTENANCE_INTERVAL == 0 {
                self.core.run_maintenance();
            }
        }

        self.core.run_maintenance();
        debug!(shard_id = self.core.shard_id(), "shard worker stopped");
        self.core
    }
}

/// Producer-side handle to a running shard.
pub struct ShardHandle {
    producer: Producer<Command>,
    stop: Arc<AtomicBool>,
    stats: Arc<ShardStats>,
    join: Option<JoinHandle<ShardCore>>,
}

impl ShardHandle {
    /// Publishes a command. Returns `false` when the ring is full; the
    /// producer is expected to back off and retry.
    #[inline]
    pub fn submit(&mut self, command: Command) -> bool {
        self.producer.try_push(command)
    }

    /// Snapshot of the shard counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Signals the worker to stop, waits for the queue to drain and
    /// returns the core for inspection.
    pub fn shutdown(mut self) -> ShardCore {
        self.stop.store(true, Ordering::Release);
        self.join
            .take()
            .expect("shutdown consumes the handle once")
            .join()
            .expect("shard worker panicked")
    }
}

/// Spawns a shard worker on a dedicated thread and returns the producer
/// handle.
///
/// # Errors
/// Returns [`EngineError`] when the configuration fails validation.
pub fn spawn_shard(
    config: &EngineConfig,
    sinks: Vec<Box<dyn EventSink>>,
) -> Result<ShardHandle, EngineError> {
    let mut core = ShardCore::new(config)?;
    for sink in sinks {
        core.add_sink(sink);
    }
    let stats = core.stats();

    let (producer, consumer) = ring::<Command>(config.queue_capacity)?;
    let stop = Arc::new(AtomicBool::new(false));
    let worker = ShardWorker::new(core, consumer, Arc::clone(&stop));

    let join = std::thread::Builder::new()
        .name(format!("shard-{}", config.shard_id))
        .spawn(move || worker.run())?;

    Ok(ShardHandle {
        producer,
        stop,
        stats,
        join: Some(join),
    })
}
