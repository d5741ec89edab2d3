//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Aggregated depth views of the book, built on demand from the side indices.
//
// | Name          | Description                                        | Key Methods              |
// |---------------|----------------------------------------------------|-------------------------|
// | DepthLevel    | Price level with aggregated quantity/count         |                         |
// | DepthSnapshot | Immutable point-in-time view of both sides         | best_bid, best_ask      |
// |               |                                                    | spread                  |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An aggregated price level in a depth view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    /// The price for this level.
    pub price: i64,
    /// Total open quantity at this price level.
    pub quantity: u64,
    /// Number of resting orders at this price level.
    pub order_count: u32,
}

/// An immutable snapshot of order book depth at a specific point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthSnapshot {
    /// Bid levels ordered by price descending (best bids first).
    pub bids: Vec<DepthLevel>,
    /// Ask levels ordered by price ascending (best asks first).
    pub asks: Vec<DepthLevel>,
    /// Timestamp when this snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

impl DepthSnapshot {
    pub fn new(bids: Vec<DepthLevel>, asks: Vec<DepthLevel>) -> Self {
        Self {
            bids,
            asks,
            timestamp: Utc::now(),
        }
    }

    /// Returns the best bid price if available.
    #[inline]
    pub fn best_bid(&self) -> Option<i64> {
        self.bids.first().map(|level| level.price)
    }

    /// Returns the best ask price if available.
    #[inline]
    pub fn best_ask(&self) -> Option<i64> {
        self.asks.first().map(|level| level.price)
    }

    /// Returns the current spread (best ask - best bid).
    #[inline]
    pub fn spread(&self) -> Option<i64> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask - bid),
            _ => None,
        }
    }
}
