//! Engine configuration.

use crate::errors::EngineError;
use crate::types::{Price, Quantity, SymbolId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-symbol risk overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolLimit {
    /// Symbol the overrides apply to.
    pub symbol: SymbolId,
    /// Per-order quantity cap for this symbol.
    pub max_qty: Quantity,
    /// Per-order notional cap (price x qty in ticks) for this symbol.
    pub max_notional: i128,
}

/// Risk gate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Global per-order quantity cap.
    pub max_order_qty: Quantity,
    /// Global per-order notional cap (price x qty in ticks).
    pub max_order_notional: i128,
    /// Token bucket capacity.
    pub rate_capacity: u32,
    /// Tokens refilled per second.
    pub rate_per_second: u32,
    /// Per-symbol overrides; empty means globals apply everywhere.
    #[serde(default)]
    pub per_symbol: Vec<SymbolLimit>,
    /// Disables the rate limiter (bounds checks always stay on).
    #[serde(default)]
    pub performance_mode: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_order_qty: 1_000_000,
            max_order_notional: 1_000_000_000_000,
            rate_capacity: 1_000,
            rate_per_second: 1_000,
            per_symbol: Vec::new(),
            performance_mode: false,
        }
    }
}

/// Full shard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Lowest representable price in ticks.
    pub min_price_ticks: Price,
    /// Highest representable price in ticks.
    pub max_price_ticks: Price,
    /// Grid spacing between adjacent levels.
    pub tick_size_ticks: Price,
    /// Maximum simultaneously live orders in this shard.
    pub pool_capacity: usize,
    /// SPSC ring depth; must be a power of two.
    pub queue_capacity: usize,
    /// Shard identity, encoded into external order ids.
    pub shard_id: u8,
    /// Symbol this shard trades.
    pub symbol: SymbolId,
    /// Optional persisted TSC calibration blob.
    #[serde(default)]
    pub tsc_calibration_path: Option<PathBuf>,
    /// Risk gate settings.
    #[serde(default)]
    pub risk: RiskConfig,
}

impl EngineConfig {
    /// A small configuration convenient for tests and demos.
    ///
    /// Levels are stored densely per tick, so the price range sizes the
    /// book's memory directly; size it to the instrument, not to the
    /// widest imaginable market.
    #[must_use]
    pub fn example() -> Self {
        Self {
            min_price_ticks: 1,
            max_price_ticks: 10_000,
            tick_size_ticks: 1,
            pool_capacity: 1 << 12,
            queue_capacity: 1 << 10,
            shard_id: 0,
            symbol: 1,
            tsc_calibration_path: None,
            risk: RiskConfig::default(),
        }
    }

    /// Validates the structural constraints the constructors rely on.
    ///
    /// # Errors
    /// Returns the first violated constraint as an [`EngineError`].
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.tick_size_ticks <= 0 {
            return Err(EngineError::InvalidTickSize(self.tick_size_ticks));
        }
        if self.max_price_ticks < self.min_price_ticks
            || (self.max_price_ticks - self.min_price_ticks) % self.tick_size_ticks != 0
        {
            return Err(EngineError::InvalidPriceRange {
                min: self.min_price_ticks,
                max: self.max_price_ticks,
            });
        }
        if self.pool_capacity == 0 || self.pool_capacity > (1 << 24) {
            return Err(EngineError::InvalidCapacity {
                capacity: self.pool_capacity,
                requirement: "pool capacity must be non-zero and fit 24-bit indices",
            });
        }
        if self.queue_capacity == 0 || !self.queue_capacity.is_power_of_two() {
            return Err(EngineError::InvalidCapacity {
                capacity: self.queue_capacity,
                requirement: "queue capacity must be a non-zero power of two",
            });
        }
        Ok(())
    }
}
