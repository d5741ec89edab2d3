//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Book side index: one per side, maps price -> level ledger and keeps the best price
// cached. Bid side is a max-priority ordering by price, ask side min-priority; time
// tiebreaks are handled inside the ledger, never here.
//
// | Name          | Description                                        | Key Methods              |
// |---------------|----------------------------------------------------|-------------------------|
// | BookSide      | Ordered collection of price levels for one side    | best_price, ledger_at   |
// |               |                                                    | iter_from_best, depth   |
// |               |                                                    | remove_level_if_empty   |
//--------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;

use crate::domain::models::types::Side;

use super::depth::DepthLevel;
use super::ledger::LevelLedger;

/// One side of the book: price levels in priority order plus a cached best price.
#[derive(Debug)]
pub struct BookSide {
    side: Side,
    levels: BTreeMap<i64, LevelLedger>,
    /// Cache of the best price for O(1) lookup. None when the side is empty.
    best_price: Option<i64>,
}

impl BookSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            best_price: None,
        }
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// The best price on this side: highest bid, lowest ask.
    #[inline]
    pub fn best_price(&self) -> Option<i64> {
        self.best_price
    }

    /// The ledger at the best price, if the side is non-empty.
    pub fn best_level(&self) -> Option<&LevelLedger> {
        self.best_price.and_then(|price| self.levels.get(&price))
    }

    pub fn best_level_mut(&mut self) -> Option<&mut LevelLedger> {
        match self.best_price {
            Some(price) => self.levels.get_mut(&price),
            None => None,
        }
    }

    /// The ledger at `price`, lazily created for insertion.
    ///
    /// Updating the best-price cache here is a cheap comparison; the expensive
    /// refresh only happens when a level is removed.
    pub fn ledger_at(&mut self, price: i64) -> &mut LevelLedger {
        match self.side {
            Side::Bid if self.best_price.map_or(true, |p| price > p) => self.best_price = Some(price),
            Side::Ask if self.best_price.map_or(true, |p| price < p) => self.best_price = Some(price),
            _ => {}
        }
        self.levels
            .entry(price)
            .or_insert_with(|| LevelLedger::new(price))
    }

    /// Existing ledger at `price`, if any. Never creates.
    pub fn ledger_mut(&mut self, price: i64) -> Option<&mut LevelLedger> {
        self.levels.get_mut(&price)
    }

    /// Drops the level at `price` if its ledger has emptied, refreshing the
    /// cached best price. Returns whether the level was removed.
    pub fn remove_level_if_empty(&mut self, price: i64) -> bool {
        let emptied = self
            .levels
            .get(&price)
            .is_some_and(|ledger| ledger.is_empty());
        if emptied {
            self.levels.remove(&price);
            if self.best_price == Some(price) {
                self.best_price = match self.side {
                    Side::Bid => self.levels.keys().next_back().copied(),
                    Side::Ask => self.levels.keys().next().copied(),
                };
            }
        }
        emptied
    }

    /// Lazy walk of the levels in priority order, best first.
    pub fn iter_from_best(&self) -> Box<dyn Iterator<Item = (i64, &LevelLedger)> + '_> {
        match self.side {
            Side::Bid => Box::new(self.levels.iter().rev().map(|(p, l)| (*p, l))),
            Side::Ask => Box::new(self.levels.iter().map(|(p, l)| (*p, l))),
        }
    }

    /// Whether a level at `level_price` on this side is crossed by an incoming
    /// order from the opposite side with `taker_limit` (None = market).
    pub fn crosses(&self, level_price: i64, taker_limit: Option<i64>) -> bool {
        match taker_limit {
            None => true,
            // This side is what the taker matches against: a buyer crosses asks
            // priced at or below its limit, a seller bids at or above.
            Some(limit) => match self.side {
                Side::Ask => level_price <= limit,
                Side::Bid => level_price >= limit,
            },
        }
    }

    /// Quantity fillable against this side by a taker with `taker_limit`,
    /// capped at `cap` (walks only as many levels as needed).
    pub fn crossable_quantity(&self, taker_limit: Option<i64>, cap: u64) -> u64 {
        let mut available: u64 = 0;
        for (price, ledger) in self.iter_from_best() {
            if !self.crosses(price, taker_limit) {
                break;
            }
            available = available.saturating_add(ledger.total_quantity());
            if available >= cap {
                break;
            }
        }
        available.min(cap)
    }

    /// Aggregated view of the top `levels` price levels, best first.
    pub fn depth(&self, levels: usize) -> Vec<DepthLevel> {
        self.iter_from_best()
            .take(levels)
            .map(|(price, ledger)| DepthLevel {
                price,
                quantity: ledger.total_quantity(),
                order_count: ledger.order_count() as u32,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of populated price levels on this side.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
