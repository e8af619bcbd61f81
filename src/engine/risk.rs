//! Pre-trade risk: per-order bounds plus a token-bucket rate limit.

use super::command::NewOrder;
use super::config::{RiskConfig, SymbolLimit};
use crate::errors::RejectReason;
use crate::types::{Quantity, SymbolId, Timestamp};
use tracing::trace;

/// Token bucket with continuous refill against the shard clock.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_ns: f64,
    tokens: f64,
    last_refill: Timestamp,
}

impl TokenBucket {
    /// A bucket starting full.
    #[must_use]
    pub fn new(capacity: u32, refill_per_second: u32) -> Self {
        Self {
            capacity: f64::from(capacity),
            refill_per_ns: f64::from(refill_per_second) / 1e9,
            tokens: f64::from(capacity),
            last_refill: 0,
        }
    }

    /// Consumes one token if at least one is available at `now`. A failed
    /// acquire has no side effect beyond the refill accounting.
    pub fn try_acquire(&mut self, now: Timestamp) -> bool {
        if now > self.last_refill {
            let elapsed = (now - self.last_refill) as f64;
            self.tokens = (self.tokens + elapsed * self.refill_per_ns).min(self.capacity);
        }
        self.last_refill = self.last_refill.max(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently available (after a refill to `now`).
    #[must_use]
    pub fn available(&self, now: Timestamp) -> f64 {
        let elapsed = now.saturating_sub(self.last_refill) as f64;
        (self.tokens + elapsed * self.refill_per_ns).min(self.capacity)
    }
}

/// Per-order bounds and rate limiting in front of the book.
#[derive(Debug)]
pub struct RiskGate {
    max_qty: Quantity,
    max_notional: i128,
    per_symbol: Vec<SymbolLimit>,
    bucket: TokenBucket,
    performance_mode: bool,
}

impl RiskGate {
    /// Builds the gate from configuration.
    #[must_use]
    pub fn new(config: &RiskConfig) -> Self {
        Self {
            max_qty: config.max_order_qty,
            max_notional: config.max_order_notional,
            per_symbol: config.per_symbol.clone(),
            bucket: TokenBucket::new(config.rate_capacity, config.rate_per_second),
            performance_mode: config.performance_mode,
        }
    }

    /// Disables or re-enables the rate limiter. Bounds checks are never
    /// disabled.
    pub fn set_performance_mode(&mut self, enabled: bool) {
        self.performance_mode = enabled;
    }

    /// True when the rate limiter is bypassed.
    #[must_use]
    pub fn is_performance_mode(&self) -> bool {
        self.performance_mode
    }

    /// Installs or replaces per-symbol overrides. Init-time only, not the
    /// hot path.
    pub fn set_symbol_limit(&mut self, limit: SymbolLimit) {
        for existing in &mut self.per_symbol {
            if existing.symbol == limit.symbol {
                *existing = limit;
                return;
            }
        }
        self.per_symbol.push(limit);
    }

    #[inline]
    fn symbol_limit(&self, symbol: SymbolId) -> Option<&SymbolLimit> {
        self.per_symbol.iter().find(|l| l.symbol == symbol)
    }

    /// Full validation: bounds, then one token from the bucket.
    ///
    /// # Errors
    /// Returns the first failed check as a [`RejectReason`].
    pub fn validate(&mut self, order: &NewOrder, now: Timestamp) -> Result<(), RejectReason> {
        self.check_bounds(order)?;
        if !self.performance_mode && !self.bucket.try_acquire(now) {
            trace!(client_id = order.client_id, "order rate limited");
            return Err(RejectReason::RateLimited);
        }
        Ok(())
    }

    /// Bounds-only validation, used by the replay path which is rate
    /// exempt but never exempt from size and notional caps.
    ///
    /// # Errors
    /// Returns the first failed check as a [`RejectReason`].
    pub fn check_bounds(&self, order: &NewOrder) -> Result<(), RejectReason> {
        if order.qty <= 0 {
            return Err(RejectReason::InvalidQuantity);
        }
        if order.price < 0 {
            return Err(RejectReason::PriceOutOfRange);
        }
        if order.qty > self.max_qty {
            return Err(RejectReason::ExceedsMaxQty);
        }

        let limit = self.symbol_limit(order.symbol);
        if let Some(limit) = limit {
            if order.qty > limit.max_qty {
                return Err(RejectReason::ExceedsMaxQty);
            }
        }

        // 128-bit product: i64 * i64 cannot overflow i128.
        let notional = (i128::from(order.price) * i128::from(order.qty)).abs();
        if notional > self.max_notional {
            return Err(RejectReason::ExceedsMaxNotional);
        }
        if let Some(limit) = limit {
            if notional > limit.max_notional {
                return Err(RejectReason::ExceedsMaxNotional);
            }
        }

        Ok(())
    }
}
