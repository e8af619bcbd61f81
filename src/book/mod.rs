//! The price-time priority book: segment trees over per-tick populations,
//! hot-window price levels and the crossing sweep.

mod book;
mod level;
mod matcher;
mod segment_tree;
mod tracker;

mod tests;

pub use book::OrderBook;
pub use level::PriceLevel;
pub use matcher::{HOT_WINDOW, HotSlot, MAX_MATCHES, MatchScan, match_hot_orders};
pub use segment_tree::SegmentTree;
pub use tracker::{AskTracker, BidTracker, PriceTracker};
