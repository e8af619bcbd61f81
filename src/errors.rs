//! Engine error types.
//!
//! Two layers, deliberately separate: [`RejectReason`] codes travel inside
//! `Reject` events on the hot path (errors are values there, nothing is
//! thrown), while [`EngineError`] surfaces configuration and I/O failures
//! at the admin boundary as `Result`.

use crate::types::Price;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reason code carried by a `Reject` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RejectReason {
    /// Order quantity is zero or negative.
    InvalidQuantity = 0,
    /// Order price lies outside the configured tick range, off the tick
    /// grid, or is negative.
    PriceOutOfRange = 1,
    /// Reserved for untyped inbound boundaries; unreachable through the
    /// typed `Command` API.
    InvalidSide = 2,
    /// Reserved for untyped inbound boundaries; unreachable through the
    /// typed `Command` API.
    InvalidTif = 3,
    /// Quantity exceeds the global or per-symbol maximum.
    ExceedsMaxQty = 4,
    /// |price * qty| exceeds the global or per-symbol notional cap.
    ExceedsMaxNotional = 5,
    /// The token bucket had less than one token available.
    RateLimited = 6,
    /// The node pool has no free slot.
    PoolExhausted = 7,
    /// Cancel for an id whose shard, index or generation does not match a
    /// live resting order.
    UnknownOrder = 8,
    /// Reserved for boundaries that distinguish terminal orders from
    /// unknown ids; the core answers both with [`UnknownOrder`] so repeat
    /// cancels stay idempotent.
    ///
    /// [`UnknownOrder`]: RejectReason::UnknownOrder
    OrderAlreadyTerminal = 9,
    /// Market residual after the sweep, a zero-fill IOC, or a failed FOK
    /// precheck.
    InsufficientLiquidity = 10,
}

impl RejectReason {
    /// Stable string form used in logs and serialized events.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::InvalidQuantity => "invalid_quantity",
            RejectReason::PriceOutOfRange => "price_out_of_range",
            RejectReason::InvalidSide => "invalid_side",
            RejectReason::InvalidTif => "invalid_tif",
            RejectReason::ExceedsMaxQty => "exceeds_max_qty",
            RejectReason::ExceedsMaxNotional => "exceeds_max_notional",
            RejectReason::RateLimited => "rate_limited",
            RejectReason::PoolExhausted => "pool_exhausted",
            RejectReason::UnknownOrder => "unknown_order",
            RejectReason::OrderAlreadyTerminal => "order_already_terminal",
            RejectReason::InsufficientLiquidity => "insufficient_liquidity",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced at the admin boundary (construction, configuration,
/// calibration persistence). Never produced on the matching hot path.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The configured price range is empty or inverted.
    #[error("invalid price range: min {min}, max {max}")]
    InvalidPriceRange {
        /// Configured minimum price in ticks
        min: Price,
        /// Configured maximum price in ticks
        max: Price,
    },

    /// Tick size must be strictly positive.
    #[error("invalid tick size: {0}")]
    InvalidTickSize(Price),

    /// Pool and queue capacities must be non-zero; the queue additionally
    /// requires a power of two.
    #[error("invalid capacity: {capacity} ({requirement})")]
    InvalidCapacity {
        /// The capacity that failed validation
        capacity: usize,
        /// What the validation required
        requirement: &'static str,
    },

    /// A persisted calibration blob failed its header or length checks.
    #[error("calibration blob rejected: {0}")]
    CalibrationFormat(&'static str),

    /// The host has no usable cycle counter to calibrate against.
    #[error("cycle counter calibration unavailable on this host")]
    CalibrationUnavailable,

    /// Underlying I/O failure while loading or saving calibration state.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
