//! Core scalar types and enums shared across the engine.
//!
//! Prices and quantities are signed integers in ticks/units so that risk
//! comparisons and notional products behave under negative inputs instead
//! of silently wrapping.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Price expressed in ticks.
pub type Price = i64;

/// Order quantity in units.
pub type Quantity = i64;

/// Externally visible order identifier: `[shard:8][generation:32][index:24]`.
pub type OrderId = u64;

/// Monotonic timestamp in nanoseconds.
pub type Timestamp = u64;

/// Symbol identifier within a shard's symbol range.
pub type SymbolId = u32;

/// Opaque user/account identifier carried on the cold path.
pub type UserId = u64;

/// Side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Buy (bid) side
    Buy = 0,
    /// Sell (ask) side
    Sell = 1,
}

impl Side {
    /// Returns the opposite side.
    #[inline]
    #[must_use]
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderKind {
    /// Executes immediately against resting liquidity; never rests.
    Market = 0,
    /// Executes at the limit price or better; the residual may rest.
    Limit = 1,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Market => write!(f, "MARKET"),
            OrderKind::Limit => write!(f, "LIMIT"),
        }
    }
}

/// Time-in-force policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TimeInForce {
    /// Good till cancelled: the residual rests in the book.
    Gtc = 0,
    /// Immediate or cancel: the residual is dropped after the sweep.
    Ioc = 1,
    /// Fill or kill: fully fills in one sweep or rejects without fills.
    Fok = 2,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInForce::Gtc => write!(f, "GTC"),
            TimeInForce::Ioc => write!(f, "IOC"),
            TimeInForce::Fok => write!(f, "FOK"),
        }
    }
}

/// Lifecycle status of an order node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderStatus {
    /// Accepted, nothing filled yet.
    New = 0,
    /// Some quantity filled, some remaining.
    PartiallyFilled = 1,
    /// Fully filled; remaining quantity is zero.
    Filled = 2,
    /// Cancelled by the owner or by an IOC residual drop.
    Cancelled = 3,
    /// Rejected by validation, risk or capacity checks.
    Rejected = 4,
}

impl OrderStatus {
    /// True when no further fills or cancels can apply.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::New => write!(f, "NEW"),
            OrderStatus::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            OrderStatus::Filled => write!(f, "FILLED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
            OrderStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}
