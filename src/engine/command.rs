//! Order-entry and replay commands.
//!
//! Commands are `Copy` with a fixed upper bound on size so the SPSC ring
//! stores them in place; the market-data frame in particular trades the
//! original's unbounded level vectors for fixed arrays.

use crate::types::{OrderKind, Price, Quantity, Side, SymbolId, TimeInForce, UserId};
use serde::{Deserialize, Serialize};

/// Maximum levels per side in one market-data frame.
pub const FRAME_LEVELS: usize = 8;

/// A new order entering the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Buy or sell.
    pub side: Side,
    /// Market or limit.
    pub kind: OrderKind,
    /// Time-in-force policy.
    pub tif: TimeInForce,
    /// Limit price in ticks; ignored for market orders.
    pub price: Price,
    /// Order quantity.
    pub qty: Quantity,
    /// Symbol to trade.
    pub symbol: SymbolId,
    /// Owner identity.
    pub user_id: UserId,
    /// Producer correlation id, echoed in accept/reject events.
    pub client_id: u64,
}

impl NewOrder {
    /// A GTC limit order with anonymous attribution.
    #[must_use]
    pub fn limit(side: Side, price: Price, qty: Quantity, symbol: SymbolId) -> Self {
        Self {
            side,
            kind: OrderKind::Limit,
            tif: TimeInForce::Gtc,
            price,
            qty,
            symbol,
            user_id: 0,
            client_id: 0,
        }
    }

    /// A market order with anonymous attribution.
    #[must_use]
    pub fn market(side: Side, qty: Quantity, symbol: SymbolId) -> Self {
        Self {
            side,
            kind: OrderKind::Market,
            tif: TimeInForce::Ioc,
            price: 0,
            qty,
            symbol,
            user_id: 0,
            client_id: 0,
        }
    }

    /// Sets the time-in-force.
    #[must_use]
    pub fn with_tif(mut self, tif: TimeInForce) -> Self {
        self.tif = tif;
        self
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn with_client_id(mut self, client_id: u64) -> Self {
        self.client_id = client_id;
        self
    }

    /// Sets the owner identity.
    #[must_use]
    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = user_id;
        self
    }
}

/// One price level inside a market-data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LevelUpdate {
    /// Level price in ticks.
    pub price: Price,
    /// Quantity to synthesize at that price.
    pub qty: Quantity,
}

/// A replay frame: up to [`FRAME_LEVELS`] levels per side, synthesized
/// into anonymous GTC limit orders by the shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDataFrame {
    /// Symbol the frame belongs to.
    pub symbol: SymbolId,
    /// Bid levels; only the first `bid_count` entries are valid.
    pub bids: [LevelUpdate; FRAME_LEVELS],
    /// Number of valid bid levels.
    pub bid_count: u8,
    /// Ask levels; only the first `ask_count` entries are valid.
    pub asks: [LevelUpdate; FRAME_LEVELS],
    /// Number of valid ask levels.
    pub ask_count: u8,
}

impl MarketDataFrame {
    /// Builds a frame from level slices, truncating at [`FRAME_LEVELS`].
    #[must_use]
    pub fn from_levels(symbol: SymbolId, bids: &[LevelUpdate], asks: &[LevelUpdate]) -> Self {
        let mut frame = Self {
            symbol,
            bids: [LevelUpdate::default(); FRAME_LEVELS],
            bid_count: 0,
            asks: [LevelUpdate::default(); FRAME_LEVELS],
            ask_count: 0,
        };
        for (slot, level) in frame.bids.iter_mut().zip(bids.iter()) {
            *slot = *level;
            frame.bid_count += 1;
        }
        for (slot, level) in frame.asks.iter_mut().zip(asks.iter()) {
            *slot = *level;
            frame.ask_count += 1;
        }
        frame
    }

    /// Valid bid levels.
    #[must_use]
    pub fn bid_levels(&self) -> &[LevelUpdate] {
        &self.bids[..self.bid_count as usize]
    }

    /// Valid ask levels.
    #[must_use]
    pub fn ask_levels(&self) -> &[LevelUpdate] {
        &self.asks[..self.ask_count as usize]
    }
}

/// Any command a producer can submit to a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Enter a new order.
    NewOrder(NewOrder),
    /// Cancel a resting order by its external id.
    Cancel {
        /// External order id (`[shard:8][generation:32][index:24]`).
        order_id: u64,
    },
    /// Replay a market-data frame as synthesized limit orders.
    MarketData(MarketDataFrame),
}
