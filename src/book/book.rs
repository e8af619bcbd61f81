//! Core order book: dense per-tick price levels, segment-tree level
//! lookup and the crossing sweep.
//!
//! The book is exclusively owned by its shard worker. Nodes are borrowed
//! from the pool by index; the book never allocates or frees order
//! storage. All outcomes are emitted as events into the caller's buffer:
//! trades in maker-lane order per level, levels walked best-price first
//! (ascending for buys, descending for sells), a book update when the top
//! moved, and the terminal accept/reject last.

use super::level::PriceLevel;
use super::segment_tree::SegmentTree;
use super::tracker::{AskTracker, BidTracker};
use crate::arena::{EpochReclaimer, NodePool};
use crate::clock::Clock;
use crate::engine::{Accept, BookUpdate, EngineEvent, Reject, Trade};
use crate::errors::{EngineError, RejectReason};
use crate::types::{OrderKind, OrderStatus, Price, Quantity, Side, SymbolId, TimeInForce};
use crossbeam::atomic::AtomicCell;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

/// Price-time priority limit order book over a fixed tick range.
pub struct OrderBook {
    symbol: SymbolId,
    min_price: Price,
    max_price: Price,
    tick_size: Price,
    num_levels: usize,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
    bid_tree: SegmentTree,
    ask_tree: SegmentTree,
    bid_tracker: BidTracker,
    ask_tracker: AskTracker,
    last_trade_price: AtomicCell<Price>,
    has_traded: AtomicBool,
}

impl OrderBook {
    /// Creates an empty book covering `[min_price, max_price]` on a
    /// `tick_size` grid.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidTickSize`] for a non-positive tick and
    /// [`EngineError::InvalidPriceRange`] when the range is inverted or not
    /// a whole number of ticks.
    pub fn new(
        symbol: SymbolId,
        min_price: Price,
        max_price: Price,
        tick_size: Price,
    ) -> Result<Self, EngineError> {
        if tick_size <= 0 {
            return Err(EngineError::InvalidTickSize(tick_size));
        }
        if max_price < min_price || (max_price - min_price) % tick_size != 0 {
            return Err(EngineError::InvalidPriceRange {
                min: min_price,
                max: max_price,
            });
        }

        let num_levels = ((max_price - min_price) / tick_size) as usize + 1;
        let make_side = || -> Vec<PriceLevel> {
            (0..num_levels)
                .map(|i| PriceLevel::new(min_price + i as Price * tick_size))
                .collect()
        };

        Ok(Self {
            symbol,
            min_price,
            max_price,
            tick_size,
            num_levels,
            bids: make_side(),
            asks: make_side(),
            bid_tree: SegmentTree::new(num_levels),
            ask_tree: SegmentTree::new(num_levels),
            bid_tracker: BidTracker::new(num_levels),
            ask_tracker: AskTracker::new(num_levels),
            last_trade_price: AtomicCell::new(0),
            has_traded: AtomicBool::new(false),
        })
    }

    /// Symbol this book trades.
    #[inline]
    #[must_use]
    pub fn symbol(&self) -> SymbolId {
        self.symbol
    }

    /// Number of price levels per side.
    #[inline]
    #[must_use]
    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    /// Highest populated bid price, if any.
    #[inline]
    #[must_use]
    pub fn best_bid(&self) -> Option<Price> {
        self.bid_tracker.best_price()
    }

    /// Lowest populated ask price, if any.
    #[inline]
    #[must_use]
    pub fn best_ask(&self) -> Option<Price> {
        self.ask_tracker.best_price()
    }

    /// Price of the last trade, if any trade has occurred.
    #[must_use]
    pub fn last_trade_price(&self) -> Option<Price> {
        if self.has_traded.load(Ordering::Relaxed) {
            Some(self.last_trade_price.load())
        } else {
            None
        }
    }

    /// Total resting quantity at `price` on `side`; 0 off the grid.
    #[must_use]
    pub fn quantity_at(&self, price: Price, side: Side) -> Quantity {
        match self.tick_to_index(price) {
            Some(idx) => match side {
                Side::Buy => self.bids[idx].total_qty(),
                Side::Sell => self.asks[idx].total_qty(),
            },
            None => 0,
        }
    }

    /// Live order count at `price` on `side`; 0 off the grid.
    #[must_use]
    pub fn orders_at(&self, price: Price, side: Side) -> u32 {
        match self.tick_to_index(price) {
            Some(idx) => match side {
                Side::Buy => self.bids[idx].order_count(),
                Side::Sell => self.asks[idx].order_count(),
            },
            None => 0,
        }
    }

    /// Maps a price onto its level index. `None` when outside the range or
    /// off the tick grid.
    #[inline]
    #[must_use]
    pub fn tick_to_index(&self, price: Price) -> Option<usize> {
        if price < self.min_price
            || price > self.max_price
            || (price - self.min_price) % self.tick_size != 0
        {
            return None;
        }
        Some(((price - self.min_price) / self.tick_size) as usize)
    }

    /// Price of level `index`.
    #[inline]
    #[must_use]
    pub fn index_to_price(&self, index: usize) -> Price {
        self.min_price + index as Price * self.tick_size
    }

    /// Processes a new order already populated in the pool: optional
    /// crossing sweep, then residual disposition per order kind and
    /// time-in-force. Every path appends exactly one terminal outcome to
    /// `events` (trades count as the terminal outcome for full fills).
    pub fn process_new_order(
        &mut self,
        taker_idx: u32,
        pool: &mut NodePool,
        epoch: &mut EpochReclaimer,
        clock: &Clock,
        events: &mut Vec<EngineEvent>,
    ) {
        let (side, kind, tif, price, qty) = {
            let hot = &pool.node(taker_idx).hot;
            (hot.side, hot.kind, hot.tif, hot.price, hot.remaining)
        };
        let top_before = (self.best_bid(), self.best_ask());

        let limit_idx = match kind {
            OrderKind::Limit => match self.tick_to_index(price) {
                Some(idx) => Some(idx),
                None => {
                    self.retire_rejected(taker_idx, RejectReason::PriceOutOfRange, pool, epoch, clock, events);
                    return;
                }
            },
            OrderKind::Market => None,
        };

        let window = self.cross_window(side, limit_idx);

        if tif == TimeInForce::Fok {
            let available = match window {
                Some((lo, hi)) => self.crossable_qty(side, lo, hi, qty),
                None => 0,
            };
            if available < qty {
                self.retire_rejected(
                    taker_idx,
                    RejectReason::InsufficientLiquidity,
                    pool,
                    epoch,
                    clock,
                    events,
                );
                return;
            }
        }

        if let Some((lo, hi)) = window {
            self.cross(taker_idx, side, lo, hi, pool, epoch, clock, events);
        }

        let (remaining, filled) = {
            let hot = &pool.node(taker_idx).hot;
            (hot.remaining, hot.filled)
        };

        if remaining == 0 {
            // Fully filled takers emit trades only; no trailing accept.
            pool.node_mut(taker_idx).hot.status = OrderStatus::Filled;
            self.emit_top_if_moved(top_before, clock, events);
            epoch.defer(taker_idx, pool);
            return;
        }

        match (kind, tif) {
            (OrderKind::Market, _) => {
                let node = pool.node_mut(taker_idx);
                node.hot.status = OrderStatus::Rejected;
                let (id, client_id) = (node.hot.id, node.cold.client_id);
                self.emit_top_if_moved(top_before, clock, events);
                events.push(EngineEvent::Reject(Reject {
                    order_id: id,
                    client_id,
                    reason: RejectReason::InsufficientLiquidity,
                    timestamp: clock.now_ns(),
                }));
                epoch.defer(taker_idx, pool);
            }
            (OrderKind::Limit, TimeInForce::Gtc) => {
                let level_idx = limit_idx.expect("limit orders carry a level index");
                self.rest_residual(taker_idx, side, level_idx, remaining, filled, pool);
                let node = pool.node(taker_idx);
                let (id, client_id) = (node.hot.id, node.cold.client_id);
                self.emit_top_if_moved(top_before, clock, events);
                events.push(EngineEvent::Accept(Accept {
                    order_id: id,
                    client_id,
                    timestamp: clock.now_ns(),
                }));
            }
            (OrderKind::Limit, TimeInForce::Ioc) => {
                // The unfilled residual cancels silently when anything
                // traded; a zero-fill IOC still owes its single outcome.
                let node = pool.node_mut(taker_idx);
                node.hot.status = OrderStatus::Cancelled;
                let (id, client_id) = (node.hot.id, node.cold.client_id);
                self.emit_top_if_moved(top_before, clock, events);
                if filled == 0 {
                    events.push(EngineEvent::Reject(Reject {
                        order_id: id,
                        client_id,
                        reason: RejectReason::InsufficientLiquidity,
                        timestamp: clock.now_ns(),
                    }));
                }
                epoch.defer(taker_idx, pool);
            }
            (OrderKind::Limit, TimeInForce::Fok) => {
                // The precheck reserved enough liquidity; a residual here
                // means the sweep and the precheck disagreed.
                debug_assert!(false, "FOK residual after successful precheck");
                let node = pool.node_mut(taker_idx);
                node.hot.status = OrderStatus::Cancelled;
                epoch.defer(taker_idx, pool);
            }
        }
    }

    /// Removes a validated resting order from its level (cancel path) and
    /// emits the cancel acknowledgement.
    pub fn process_cancel(
        &mut self,
        node_idx: u32,
        pool: &mut NodePool,
        epoch: &mut EpochReclaimer,
        clock: &Clock,
        events: &mut Vec<EngineEvent>,
    ) {
        let (side, price, remaining, id, client_id) = {
            let node = pool.node(node_idx);
            (
                node.hot.side,
                node.hot.price,
                node.hot.remaining,
                node.hot.id,
                node.cold.client_id,
            )
        };
        let top_before = (self.best_bid(), self.best_ask());

        let removed = match self.tick_to_index(price) {
            Some(idx) => {
                let level = match side {
                    Side::Buy => &mut self.bids[idx],
                    Side::Sell => &mut self.asks[idx],
                };
                let removed = level.remove(node_idx, remaining);
                if removed {
                    let population = level.order_count();
                    let level_price = level.price();
                    match side {
                        Side::Buy => {
                            self.bid_tree.set(idx, population);
                            self.bid_tracker.update_level(idx, level_price, population);
                        }
                        Side::Sell => {
                            self.ask_tree.set(idx, population);
                            self.ask_tracker.update_level(idx, level_price, population);
                        }
                    }
                }
                removed
            }
            None => false,
        };

        if !removed {
            debug_assert!(false, "live non-terminal node missing from its level");
            events.push(EngineEvent::Reject(Reject {
                order_id: id,
                client_id,
                reason: RejectReason::UnknownOrder,
                timestamp: clock.now_ns(),
            }));
            return;
        }

        pool.node_mut(node_idx).hot.status = OrderStatus::Cancelled;
        self.emit_top_if_moved(top_before, clock, events);
        events.push(EngineEvent::Accept(Accept {
            order_id: id,
            client_id,
            timestamp: clock.now_ns(),
        }));
        epoch.defer(node_idx, pool);
        trace!(order_id = id, "order cancelled");
    }

    /// Walks levels flagged for compaction. Off the hot path; the shard
    /// worker calls this periodically.
    pub fn periodic_maintenance(&mut self) {
        for level in &mut self.bids {
            level.compact_if_needed();
        }
        for level in &mut self.asks {
            level.compact_if_needed();
        }
    }

    /// Crossable contra-side window `[lo, hi]` for an incoming order, or
    /// `None` when nothing can cross.
    fn cross_window(&self, side: Side, limit_idx: Option<usize>) -> Option<(usize, usize)> {
        match side {
            Side::Buy => {
                let best_ask = self.best_ask()?;
                let lo = self.tick_to_index(best_ask).expect("tracker price on grid");
                let hi = limit_idx.unwrap_or(self.num_levels - 1);
                (lo <= hi).then_some((lo, hi))
            }
            Side::Sell => {
                let best_bid = self.best_bid()?;
                let hi = self.tick_to_index(best_bid).expect("tracker price on grid");
                let lo = limit_idx.unwrap_or(0);
                (lo <= hi).then_some((lo, hi))
            }
        }
    }

    /// Read-only sum of matchable quantity over the crossable window,
    /// stopping once `need` is covered (FOK precheck).
    fn crossable_qty(&self, side: Side, lo: usize, hi: usize, need: Quantity) -> Quantity {
        let (tree, levels) = match side {
            Side::Buy => (&self.ask_tree, &self.asks),
            Side::Sell => (&self.bid_tree, &self.bids),
        };
        let mut available: Quantity = 0;
        let mut cursor = lo;
        while cursor <= hi && available < need {
            let Some(idx) = tree.find_first(cursor, hi) else {
                break;
            };
            available = available.saturating_add(levels[idx].total_qty());
            cursor = idx + 1;
        }
        available
    }

    /// Crossing sweep: consume contra levels best-price first until the
    /// taker is exhausted or the window empties.
    fn cross(
        &mut self,
        taker_idx: u32,
        side: Side,
        lo: usize,
        hi: usize,
        pool: &mut NodePool,
        epoch: &mut EpochReclaimer,
        clock: &Clock,
        events: &mut Vec<EngineEvent>,
    ) {
        let mut lo = lo;
        let mut hi = hi;
        loop {
            if pool.node(taker_idx).hot.remaining <= 0 {
                break;
            }
            let idx = match side {
                Side::Buy => self.ask_tree.find_first(lo, hi),
                Side::Sell => self.bid_tree.find_last(lo, hi),
            };
            let Some(idx) = idx else { break };

            self.match_at_level(taker_idx, side, idx, pool, epoch, clock, events);

            let (population, level_price) = {
                let level = match side {
                    Side::Buy => &self.asks[idx],
                    Side::Sell => &self.bids[idx],
                };
                (level.order_count(), level.price())
            };
            match side {
                Side::Buy => {
                    self.ask_tree.set(idx, population);
                    self.ask_tracker.update_level(idx, level_price, population);
                    lo = idx + 1;
                    if lo > hi {
                        break;
                    }
                }
                Side::Sell => {
                    self.bid_tree.set(idx, population);
                    self.bid_tracker.update_level(idx, level_price, population);
                    if idx == 0 || idx - 1 < lo {
                        break;
                    }
                    hi = idx - 1;
                }
            }
        }
    }

    /// Fills the taker against one contra level, hot window first, sliding
    /// overflow forward whenever the window empties out.
    fn match_at_level(
        &mut self,
        taker_idx: u32,
        side: Side,
        idx: usize,
        pool: &mut NodePool,
        epoch: &mut EpochReclaimer,
        clock: &Clock,
        events: &mut Vec<EngineEvent>,
    ) {
        let (taker_id, symbol) = {
            let node = pool.node(taker_idx);
            (node.hot.id, node.hot.symbol)
        };

        loop {
            let remaining = pool.node(taker_idx).hot.remaining;
            if remaining <= 0 {
                break;
            }
            let level = match side {
                Side::Buy => &mut self.asks[idx],
                Side::Sell => &mut self.bids[idx],
            };
            if level.order_count() == 0 {
                break;
            }
            if level.hot_live() == 0 {
                level.refill_hot_from_overflow(pool);
                if level.hot_live() == 0 {
                    break;
                }
            }

            let scan = level.match_hot(remaining);
            if scan.count == 0 {
                break;
            }
            let trade_price = level.price();
            let mut left = remaining;

            for i in 0..scan.count as usize {
                if left <= 0 {
                    break;
                }
                let lane = scan.slots[i] as usize;
                let Some(maker_idx) = level.hot_node(lane) else {
                    continue;
                };
                let trade_qty = scan.qtys[i].min(left);
                if trade_qty <= 0 {
                    continue;
                }

                let maker = pool.node_mut(maker_idx);
                maker.hot.remaining -= trade_qty;
                maker.hot.filled += trade_qty;
                let maker_done = maker.hot.remaining == 0;
                maker.hot.status = if maker_done {
                    OrderStatus::Filled
                } else {
                    OrderStatus::PartiallyFilled
                };
                let maker_id = maker.hot.id;

                level.apply_fill(lane, trade_qty);
                if maker_done {
                    level.clear_hot_lane(lane);
                }
                left -= trade_qty;

                events.push(EngineEvent::Trade(Trade {
                    taker_id,
                    maker_id,
                    symbol,
                    price: trade_price,
                    qty: trade_qty,
                    timestamp: clock.now_ns(),
                }));
                self.last_trade_price.store(trade_price);
                self.has_traded.store(true, Ordering::Relaxed);

                if maker_done {
                    epoch.defer(maker_idx, pool);
                }
            }

            let consumed = remaining - left;
            let taker = pool.node_mut(taker_idx);
            taker.hot.remaining -= consumed;
            taker.hot.filled += consumed;
            if taker.hot.remaining == 0 {
                taker.hot.status = OrderStatus::Filled;
            } else if taker.hot.filled > 0 {
                taker.hot.status = OrderStatus::PartiallyFilled;
            }
        }
    }

    /// Rests a limit residual at its level and repairs tree + tracker.
    fn rest_residual(
        &mut self,
        taker_idx: u32,
        side: Side,
        level_idx: usize,
        remaining: Quantity,
        filled: Quantity,
        pool: &mut NodePool,
    ) {
        let level = match side {
            Side::Buy => &mut self.bids[level_idx],
            Side::Sell => &mut self.asks[level_idx],
        };
        level.add(taker_idx, remaining);
        let population = level.order_count();
        let level_price = level.price();
        match side {
            Side::Buy => {
                self.bid_tree.set(level_idx, population);
                self.bid_tracker.update_level(level_idx, level_price, population);
            }
            Side::Sell => {
                self.ask_tree.set(level_idx, population);
                self.ask_tracker.update_level(level_idx, level_price, population);
            }
        }
        let node = pool.node_mut(taker_idx);
        node.hot.status = if filled > 0 {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::New
        };
    }

    /// Marks the node rejected, emits the reject and retires the node.
    fn retire_rejected(
        &mut self,
        taker_idx: u32,
        reason: RejectReason,
        pool: &mut NodePool,
        epoch: &mut EpochReclaimer,
        clock: &Clock,
        events: &mut Vec<EngineEvent>,
    ) {
        let node = pool.node_mut(taker_idx);
        node.hot.status = OrderStatus::Rejected;
        let (id, client_id) = (node.hot.id, node.cold.client_id);
        events.push(EngineEvent::Reject(Reject {
            order_id: id,
            client_id,
            reason,
            timestamp: clock.now_ns(),
        }));
        epoch.defer(taker_idx, pool);
    }

    /// Emits a book update when the command moved the top of book.
    fn emit_top_if_moved(
        &self,
        before: (Option<Price>, Option<Price>),
        clock: &Clock,
        events: &mut Vec<EngineEvent>,
    ) {
        let after = (self.best_bid(), self.best_ask());
        if after != before {
            events.push(EngineEvent::BookUpdate(BookUpdate {
                best_bid: after.0,
                best_ask: after.1,
                timestamp: clock.now_ns(),
            }));
        }
    }

    /// Revalidates the structural invariants: segment-tree leaves equal
    /// level populations, internal sums equal child sums, level totals
    /// equal the sum of live node quantities, and trackers agree with a
    /// linear scan. Intended for tests and debug sweeps.
    pub fn check_consistency(&self, pool: &NodePool) -> Result<(), String> {
        for (side, levels, tree) in [
            (Side::Buy, &self.bids, &self.bid_tree),
            (Side::Sell, &self.asks, &self.ask_tree),
        ] {
            for (idx, level) in levels.iter().enumerate() {
                if tree.get(idx) != level.order_count() {
                    return Err(format!(
                        "{side} leaf {idx}: tree {} != population {}",
                        tree.get(idx),
                        level.order_count()
                    ));
                }
                let mut node_total: Quantity = 0;
                let mut node_count: u32 = 0;
                for node_idx in level.live_nodes() {
                    let node = pool.node(node_idx);
                    if !node.is_live() {
                        return Err(format!("{side} level {idx}: dead node {node_idx}"));
                    }
                    if node.hot.price != level.price() {
                        return Err(format!("{side} level {idx}: node off its price"));
                    }
                    node_total += node.hot.remaining;
                    node_count += 1;
                }
                if node_count != level.order_count() {
                    return Err(format!(
                        "{side} level {idx}: live nodes {node_count} != population {}",
                        level.order_count()
                    ));
                }
                if node_total != level.total_qty() {
                    return Err(format!(
                        "{side} level {idx}: node qty {node_total} != total {}",
                        level.total_qty()
                    ));
                }
            }
            let scanned_sum: u64 = levels.iter().map(|l| u64::from(l.order_count())).sum();
            if tree.sum(0, self.num_levels - 1) != scanned_sum {
                return Err(format!("{side} tree root sum mismatch"));
            }
        }

        let scan_best_bid = self
            .bids
            .iter()
            .rev()
            .find(|l| l.order_count() > 0)
            .map(PriceLevel::price);
        if scan_best_bid != self.best_bid() {
            return Err("bid tracker disagrees with scan".to_string());
        }
        let scan_best_ask = self
            .asks
            .iter()
            .find(|l| l.order_count() > 0)
            .map(PriceLevel::price);
        if scan_best_ask != self.best_ask() {
            return Err("ask tracker disagrees with scan".to_string());
        }
        if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
            if bid >= ask {
                return Err(format!("book crossed: bid {bid} >= ask {ask}"));
            }
        }
        Ok(())
    }
}
