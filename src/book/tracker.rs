//! Best-price trackers: max/min tournament trees over populated ticks.

use crate::types::Price;

/// Tournament tree tracking the best populated price on one side.
///
/// `IS_MAX = true` tracks the highest populated price (bids);
/// `IS_MAX = false` tracks the lowest (asks). Each leaf carries the level's
/// price and live order count; internal nodes propagate the winning price
/// among populated children.
#[derive(Debug, Clone)]
pub struct PriceTracker<const IS_MAX: bool> {
    levels: usize,
    base: usize,
    prices: Vec<Price>,
    counts: Vec<u32>,
}

/// Tracks the best bid (highest populated price).
pub type BidTracker = PriceTracker<true>;

/// Tracks the best ask (lowest populated price).
pub type AskTracker = PriceTracker<false>;

impl<const IS_MAX: bool> PriceTracker<IS_MAX> {
    const NEUTRAL: Price = if IS_MAX { Price::MIN } else { Price::MAX };

    /// Creates a tracker over `levels` price ticks, all empty.
    #[must_use]
    pub fn new(levels: usize) -> Self {
        let mut base = 1;
        while base < levels {
            base <<= 1;
        }
        Self {
            levels,
            base,
            prices: vec![Self::NEUTRAL; 2 * base],
            counts: vec![0; 2 * base],
        }
    }

    /// Records the population of a level and repairs the tournament path.
    pub fn update_level(&mut self, level_idx: usize, price: Price, count: u32) {
        if level_idx >= self.levels {
            return;
        }
        let mut pos = level_idx + self.base;
        self.prices[pos] = if count > 0 { price } else { Self::NEUTRAL };
        self.counts[pos] = count;

        pos >>= 1;
        while pos >= 1 {
            let left = pos << 1;
            let right = left | 1;
            let (lc, rc) = (self.counts[left], self.counts[right]);
            self.counts[pos] = lc + rc;
            self.prices[pos] = match (lc > 0, rc > 0) {
                (true, true) => {
                    if IS_MAX {
                        self.prices[left].max(self.prices[right])
                    } else {
                        self.prices[left].min(self.prices[right])
                    }
                }
                (true, false) => self.prices[left],
                (false, true) => self.prices[right],
                (false, false) => Self::NEUTRAL,
            };
            if pos == 1 {
                break;
            }
            pos >>= 1;
        }
    }

    /// Best populated price, or `None` when the side is empty.
    #[inline]
    #[must_use]
    pub fn best_price(&self) -> Option<Price> {
        if self.counts[1] > 0 {
            Some(self.prices[1])
        } else {
            None
        }
    }

    /// True when any level on this side is populated.
    #[inline]
    #[must_use]
    pub fn has_orders(&self) -> bool {
        self.counts[1] > 0
    }

    /// Resets every level to empty.
    pub fn clear(&mut self) {
        self.prices.fill(Self::NEUTRAL);
        self.counts.fill(0);
    }
}
