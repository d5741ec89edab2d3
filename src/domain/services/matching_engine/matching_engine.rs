//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// The core matching engine for a single instrument: accepts submit/cancel/replace
// instructions, runs the price-time crossing loop, rests remainders, and reports every
// state transition synchronously before the call returns.
//
// The engine is deliberately not thread-safe: one instruction runs to completion before
// the next, which is what makes the crossing loop and event ordering deterministic.
// Callers needing cross-thread access serialize externally (see `shared`).
//
// | Name                    | Description                                       | Key Methods       |
// |-------------------------|---------------------------------------------------|------------------|
// | MatchingEngine          | Core matching engine                              | submit            |
// |                         |                                                   | cancel, replace   |
// |                         |                                                   | query_best        |
// |                         |                                                   | query_depth       |
// | SubmitReport            | Outcome of a submission                           |                  |
// | CancelReport            | Outcome of a cancellation                         |                  |
// | ReplaceReport           | Outcome of a replacement                          |                  |
// | EngineError             | Instruction error surface                         |                  |
//--------------------------------------------------------------------------------------------------

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use crate::domain::models::types::{
    Order, OrderDescriptor, OrderKind, OrderStatus, RemainderDisposition, Side, TimeInForce, Trade,
};
use crate::domain::services::book::{BookError, BookSide, DepthLevel, DepthSnapshot};
use crate::domain::services::events::{EngineEvent, EventSink};
use crate::domain::services::registry::{BookLocation, OrderRecord, OrderRegistry};

/// Errors reported by engine instructions.
///
/// Caller-input errors (`InvalidQuantity` through `NotFound`) are recoverable
/// and leave the book untouched. `IntegrityViolation` is fatal to the instance:
/// the engine refuses all further mutation once book integrity cannot be
/// guaranteed, and subsequent instructions get `Halted`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The order quantity must be positive.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(u64),

    /// Limit prices must be positive ticks.
    #[error("invalid limit price: {0}")]
    InvalidPrice(i64),

    /// The identifier is already live on the book.
    #[error("duplicate order identifier: {0}")]
    DuplicateIdentifier(Uuid),

    /// Cancel/replace target is unknown or already terminal.
    #[error("order {0} not found or no longer live")]
    NotFound(Uuid),

    /// Internal consistency fault; the engine has halted.
    #[error("book integrity violated: {0}")]
    IntegrityViolation(String),

    /// The engine halted after an earlier integrity violation.
    #[error("engine is halted and refuses further instructions")]
    Halted,
}

/// Type alias for Result with EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

/// Outcome of a submission: final status, identity, and everything that happened.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReport {
    /// Identifier of the submitted order (engine-assigned when the descriptor had none).
    pub order_id: Uuid,
    /// Sequence number assigned at acceptance.
    pub sequence: u64,
    /// Final status of the incoming order.
    pub status: OrderStatus,
    /// What happened to the unfilled remainder.
    pub disposition: RemainderDisposition,
    /// Trades generated, in traded order.
    pub trades: Vec<Trade>,
    /// Every event emitted while processing, in causal order.
    pub events: Vec<EngineEvent>,
}

/// Outcome of a cancellation.
#[derive(Debug, Clone, PartialEq)]
pub struct CancelReport {
    /// The cancelled order in its final state.
    pub order: Order,
    /// Every event emitted while processing, in causal order.
    pub events: Vec<EngineEvent>,
}

/// Outcome of a replacement (cancel + resubmit under the same identifier).
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceReport {
    /// Identifier shared by the replaced and replacement orders.
    pub order_id: Uuid,
    /// Sequence number the replaced order held.
    pub previous_sequence: u64,
    /// Fresh sequence number of the replacement; time priority is always lost.
    pub sequence: u64,
    /// Final status of the replacement order.
    pub status: OrderStatus,
    /// What happened to the replacement's unfilled remainder.
    pub disposition: RemainderDisposition,
    /// Trades generated by the replacement, in traded order.
    pub trades: Vec<Trade>,
    /// Every event emitted while processing, in causal order.
    pub events: Vec<EngineEvent>,
}

/// The matching engine for one instrument.
///
/// Owns both book sides and the order registry; emits events through an
/// optional [`EventSink`] synchronously within each instruction, and returns
/// the same events in the instruction report.
pub struct MatchingEngine {
    bids: BookSide,
    asks: BookSide,
    registry: OrderRegistry,
    sink: Option<Box<dyn EventSink>>,
    /// Set on the first integrity violation; all mutation is refused afterwards.
    halted: bool,
}

// The sink trait object is not Debug; report everything else.
impl fmt::Debug for MatchingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchingEngine")
            .field("bids", &self.bids)
            .field("asks", &self.asks)
            .field("registry", &self.registry)
            .field("sink", &self.sink.as_ref().map(|_| "EventSink"))
            .field("halted", &self.halted)
            .finish()
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingEngine {
    /// Creates an engine with empty book sides and no event sink.
    pub fn new() -> Self {
        Self {
            bids: BookSide::new(Side::Bid),
            asks: BookSide::new(Side::Ask),
            registry: OrderRegistry::new(),
            sink: None,
            halted: false,
        }
    }

    /// Creates an engine that delivers events through `sink`.
    pub fn with_sink(sink: Box<dyn EventSink>) -> Self {
        let mut engine = Self::new();
        engine.sink = Some(sink);
        engine
    }

    /// Installs (or swaps) the event sink, returning the previous one.
    pub fn set_sink(&mut self, sink: Box<dyn EventSink>) -> Option<Box<dyn EventSink>> {
        self.sink.replace(sink)
    }

    /// Removes and returns the event sink.
    pub fn take_sink(&mut self) -> Option<Box<dyn EventSink>> {
        self.sink.take()
    }

    //----------------------------------------------------------------------------------------------
    // Instructions
    //----------------------------------------------------------------------------------------------

    /// Processes a new order: match against the opposite side, then dispose of
    /// the remainder according to the order's kind and time in force.
    ///
    /// Rejections (`InvalidQuantity`, `InvalidPrice`, `DuplicateIdentifier`)
    /// emit an `OrderRejected` event and leave the book untouched.
    pub fn submit(&mut self, descriptor: OrderDescriptor) -> EngineResult<SubmitReport> {
        self.ensure_active()?;
        let order_id = descriptor.id.unwrap_or_else(Uuid::new_v4);

        if descriptor.quantity == 0 {
            return Err(self.reject(order_id, EngineError::InvalidQuantity(0)));
        }
        if let Some(price) = descriptor.kind.limit_price() {
            if price <= 0 {
                return Err(self.reject(order_id, EngineError::InvalidPrice(price)));
            }
        }
        if self.registry.contains(&order_id) {
            return Err(self.reject(order_id, EngineError::DuplicateIdentifier(order_id)));
        }

        // Market orders never rest, whatever the descriptor said.
        let time_in_force = if descriptor.kind.is_market() && descriptor.time_in_force == TimeInForce::GTC {
            TimeInForce::IOC
        } else {
            descriptor.time_in_force
        };

        let now = Utc::now();
        let sequence = self.registry.allocate_sequence();
        let mut order = Order {
            id: order_id,
            side: descriptor.side,
            kind: descriptor.kind,
            quantity: descriptor.quantity,
            remaining: descriptor.quantity,
            time_in_force,
            status: OrderStatus::Submitted,
            sequence,
            created_at: now,
            updated_at: now,
        };

        let mut events = Vec::new();
        let (disposition, trades) = self.execute(&mut order, &mut events)?;
        self.check_integrity()?;

        debug!(
            %order_id,
            sequence,
            status = ?order.status,
            trades = trades.len(),
            "submission processed"
        );
        Ok(SubmitReport {
            order_id,
            sequence,
            status: order.status,
            disposition,
            trades,
            events,
        })
    }

    /// Cancels a resting order. Unknown or already-terminal identifiers get
    /// `NotFound`; the book is never disturbed by a failed cancel.
    pub fn cancel(&mut self, order_id: Uuid) -> EngineResult<CancelReport> {
        self.ensure_active()?;
        let record = self
            .registry
            .deregister(&order_id)
            .map_err(|_| EngineError::NotFound(order_id))?;
        let mut order = self.unlink_resting(record)?;

        let now = Utc::now();
        order.status = if order.filled() > 0 {
            OrderStatus::PartiallyFilledCancelled
        } else {
            OrderStatus::Cancelled
        };
        order.updated_at = now;

        let mut events = Vec::new();
        self.emit(
            &mut events,
            EngineEvent::OrderCancelled {
                order: order.clone(),
                timestamp: now,
            },
        );
        self.check_integrity()?;

        debug!(%order_id, status = ?order.status, "cancellation processed");
        Ok(CancelReport { order, events })
    }

    /// Replaces a resting order: cancel plus resubmit under the same identifier
    /// with a fresh sequence number. Any amendment forfeits queue position,
    /// including quantity-only decreases; that policy is deliberate.
    ///
    /// The new values are validated before the resting order is touched, so an
    /// invalid replace is a pure no-op.
    pub fn replace(
        &mut self,
        order_id: Uuid,
        new_price: i64,
        new_quantity: u64,
    ) -> EngineResult<ReplaceReport> {
        self.ensure_active()?;
        if new_quantity == 0 {
            return Err(EngineError::InvalidQuantity(0));
        }
        if new_price <= 0 {
            return Err(EngineError::InvalidPrice(new_price));
        }
        let record = self
            .registry
            .deregister(&order_id)
            .map_err(|_| EngineError::NotFound(order_id))?;
        let previous = self.unlink_resting(record)?;

        let now = Utc::now();
        let sequence = self.registry.allocate_sequence();
        let mut order = Order {
            id: order_id,
            side: previous.side,
            kind: OrderKind::Limit { price: new_price },
            quantity: new_quantity,
            remaining: new_quantity,
            time_in_force: previous.time_in_force,
            status: OrderStatus::Submitted,
            sequence,
            created_at: now,
            updated_at: now,
        };

        let mut events = Vec::new();
        self.emit(
            &mut events,
            EngineEvent::OrderReplaced {
                order_id,
                previous: previous.clone(),
                new_sequence: sequence,
                timestamp: now,
            },
        );
        // The replacement goes through the full submission path and may cross
        // immediately.
        let (disposition, trades) = self.execute(&mut order, &mut events)?;
        self.check_integrity()?;

        debug!(
            %order_id,
            previous_sequence = previous.sequence,
            sequence,
            status = ?order.status,
            "replacement processed"
        );
        Ok(ReplaceReport {
            order_id,
            previous_sequence: previous.sequence,
            sequence,
            status: order.status,
            disposition,
            trades,
            events,
        })
    }

    //----------------------------------------------------------------------------------------------
    // Queries
    //----------------------------------------------------------------------------------------------

    /// The best price on `side`, or None when that side is empty.
    pub fn query_best(&self, side: Side) -> Option<i64> {
        self.book_side(side).best_price()
    }

    /// The top `levels` aggregated price levels on `side`, best first.
    pub fn query_depth(&self, side: Side, levels: usize) -> Vec<DepthLevel> {
        self.book_side(side).depth(levels)
    }

    /// A snapshot of both sides down to `levels` price levels each.
    pub fn depth_snapshot(&self, levels: usize) -> DepthSnapshot {
        DepthSnapshot::new(self.bids.depth(levels), self.asks.depth(levels))
    }

    /// Returns the best bid price.
    pub fn best_bid(&self) -> Option<i64> {
        self.bids.best_price()
    }

    /// Returns the best ask price.
    pub fn best_ask(&self) -> Option<i64> {
        self.asks.best_price()
    }

    /// Returns the spread between the best ask and best bid.
    pub fn spread(&self) -> Option<i64> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Current state of a live resting order, or None for unknown/terminal ids.
    pub fn order(&self, id: &Uuid) -> Option<&Order> {
        self.registry.lookup(id).map(|record| &record.order)
    }

    /// Number of live resting orders across both sides.
    pub fn open_orders(&self) -> usize {
        self.registry.len()
    }

    /// Whether the engine refused further mutation after an integrity fault.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    //----------------------------------------------------------------------------------------------
    // Internals
    //----------------------------------------------------------------------------------------------

    /// Matches `order` and disposes of any remainder. Shared by submit and replace.
    fn execute(
        &mut self,
        order: &mut Order,
        events: &mut Vec<EngineEvent>,
    ) -> EngineResult<(RemainderDisposition, Vec<Trade>)> {
        let mut trades = Vec::new();

        // Fill-or-kill trades nothing unless the crossing liquidity covers it.
        if order.time_in_force == TimeInForce::FOK {
            let available = self
                .opposite_side(order.side)
                .crossable_quantity(order.limit_price(), order.quantity);
            if available < order.quantity {
                let now = Utc::now();
                order.status = OrderStatus::Cancelled;
                order.updated_at = now;
                self.emit(
                    events,
                    EngineEvent::OrderCancelled {
                        order: order.clone(),
                        timestamp: now,
                    },
                );
                return Ok((RemainderDisposition::Killed, trades));
            }
        }

        self.cross(order, &mut trades, events)?;

        let disposition = if order.remaining == 0 {
            let now = Utc::now();
            order.status = OrderStatus::Filled;
            order.updated_at = now;
            self.emit(
                events,
                EngineEvent::OrderFilled {
                    order: order.clone(),
                    timestamp: now,
                },
            );
            RemainderDisposition::FullyFilled
        } else {
            match (order.kind, order.time_in_force) {
                (OrderKind::Limit { price }, TimeInForce::GTC) => {
                    self.rest(order, price, events)?;
                    RemainderDisposition::Rested
                }
                // IOC remainders and market orders out of liquidity are cancelled.
                _ => {
                    let now = Utc::now();
                    order.status = if order.filled() == 0 {
                        OrderStatus::Cancelled
                    } else {
                        OrderStatus::PartiallyFilledCancelled
                    };
                    order.updated_at = now;
                    self.emit(
                        events,
                        EngineEvent::OrderCancelled {
                            order: order.clone(),
                            timestamp: now,
                        },
                    );
                    RemainderDisposition::Cancelled
                }
            }
        };
        Ok((disposition, trades))
    }

    /// The crossing loop: while the taker has remaining quantity and the
    /// opposite best level crosses, fill against the earliest resting order at
    /// the maker's price.
    fn cross(
        &mut self,
        taker: &mut Order,
        trades: &mut Vec<Trade>,
        events: &mut Vec<EngineEvent>,
    ) -> EngineResult<()> {
        let taker_limit = taker.limit_price();

        while taker.remaining > 0 {
            let best = {
                let book = self.opposite_side(taker.side);
                book.best_price().filter(|p| book.crosses(*p, taker_limit))
            };
            let Some(best_price) = best else { break };

            let front = self
                .opposite_side(taker.side)
                .best_level()
                .and_then(|ledger| ledger.peek_front())
                .map(|(handle, entry)| (handle, entry.order_id, entry.remaining, entry.sequence));
            let Some((_, maker_id, maker_open, maker_sequence)) = front else {
                return Err(self.fail_integrity(format!(
                    "best level {best_price} missing or empty during match"
                )));
            };

            let traded = taker.remaining.min(maker_open);
            let maker_filled = traded == maker_open;
            let now = Utc::now();
            let trade = Trade {
                id: Uuid::new_v4(),
                maker_order_id: maker_id,
                taker_order_id: taker.id,
                price: best_price,
                quantity: traded,
                maker_sequence,
                taker_sequence: taker.sequence,
                executed_at: now,
            };

            taker.remaining -= traded;
            taker.updated_at = now;
            if taker.remaining > 0 {
                taker.status = OrderStatus::PartiallyFilled;
            }

            // Book first, then registry; the two mutations are a single logical
            // step and any divergence between them halts the engine.
            let unlinked: Result<(), BookError> = {
                let book = self.opposite_side_mut(taker.side);
                let result = match book.best_level_mut() {
                    None => Err(BookError::EmptyLevel(best_price)),
                    Some(ledger) => {
                        if maker_filled {
                            match ledger.pop_front() {
                                Some(_) => Ok(()),
                                None => Err(BookError::EmptyLevel(best_price)),
                            }
                        } else {
                            ledger.reduce_front(traded)
                        }
                    }
                };
                if result.is_ok() && maker_filled {
                    book.remove_level_if_empty(best_price);
                }
                result
            };
            if let Err(e) = unlinked {
                return Err(self.fail_integrity(format!("book mutation failed during match: {e}")));
            }

            let maker_event = self.apply_maker_fill(maker_id, traded, maker_filled, now)?;
            self.emit(
                events,
                EngineEvent::TradeExecuted {
                    trade: trade.clone(),
                    timestamp: now,
                },
            );
            self.emit(events, maker_event);
            trades.push(trade);
        }
        Ok(())
    }

    /// Applies a fill to the maker's registry record and builds its status event.
    fn apply_maker_fill(
        &mut self,
        maker_id: Uuid,
        traded: u64,
        maker_filled: bool,
        now: DateTime<Utc>,
    ) -> EngineResult<EngineEvent> {
        if maker_filled {
            let record = match self.registry.deregister(&maker_id) {
                Ok(record) => record,
                Err(e) => {
                    return Err(
                        self.fail_integrity(format!("registry divergence during match: {e}"))
                    );
                }
            };
            let mut maker = record.order;
            maker.remaining = 0;
            maker.status = OrderStatus::Filled;
            maker.updated_at = now;
            Ok(EngineEvent::OrderFilled {
                order: maker,
                timestamp: now,
            })
        } else {
            let updated = match self.registry.lookup_mut(&maker_id) {
                Some(record) => {
                    record.order.remaining -= traded;
                    record.order.status = OrderStatus::PartiallyFilled;
                    record.order.updated_at = now;
                    Some(record.order.clone())
                }
                None => None,
            };
            match updated {
                Some(order) => Ok(EngineEvent::OrderPartiallyFilled {
                    order,
                    filled_quantity: traded,
                    timestamp: now,
                }),
                None => Err(self.fail_integrity(format!(
                    "maker {maker_id} missing from registry during match"
                ))),
            }
        }
    }

    /// Rests the remainder of a limit order on its own side.
    fn rest(
        &mut self,
        order: &mut Order,
        price: i64,
        events: &mut Vec<EngineEvent>,
    ) -> EngineResult<()> {
        let now = Utc::now();
        order.status = if order.filled() == 0 {
            OrderStatus::Unfilled
        } else {
            OrderStatus::PartiallyFilled
        };
        order.updated_at = now;

        let handle = self
            .book_side_mut(order.side)
            .ledger_at(price)
            .append(order.id, order.remaining, order.sequence);
        let location = BookLocation {
            side: order.side,
            price,
            handle,
        };
        if let Err(e) = self.registry.register(order.clone(), location) {
            return Err(self.fail_integrity(format!("failed to rest order {}: {e}", order.id)));
        }

        self.emit(
            events,
            EngineEvent::OrderAccepted {
                order: order.clone(),
                timestamp: now,
            },
        );
        Ok(())
    }

    /// Unlinks a deregistered record from its ledger, dropping the level if emptied.
    fn unlink_resting(&mut self, record: OrderRecord) -> EngineResult<Order> {
        let BookLocation { side, price, handle } = record.location;
        let unlinked: Result<(), BookError> = {
            let book = self.book_side_mut(side);
            match book.ledger_mut(price) {
                None => Err(BookError::EmptyLevel(price)),
                Some(ledger) => ledger.remove(handle, record.order.id).map(|_| ()),
            }
        };
        if let Err(e) = unlinked {
            return Err(self.fail_integrity(format!(
                "failed to unlink order {}: {e}",
                record.order.id
            )));
        }
        self.book_side_mut(side).remove_level_if_empty(price);
        Ok(record.order)
    }

    fn emit(&mut self, events: &mut Vec<EngineEvent>, event: EngineEvent) {
        if let Some(sink) = self.sink.as_mut() {
            sink.on_event(&event);
        }
        events.push(event);
    }

    /// Emits `OrderRejected` through the sink and hands the error back.
    fn reject(&mut self, order_id: Uuid, error: EngineError) -> EngineError {
        debug!(%order_id, %error, "submission rejected");
        let event = EngineEvent::OrderRejected {
            order_id,
            reason: error.to_string(),
            timestamp: Utc::now(),
        };
        if let Some(sink) = self.sink.as_mut() {
            sink.on_event(&event);
        }
        error
    }

    fn ensure_active(&self) -> EngineResult<()> {
        if self.halted {
            return Err(EngineError::Halted);
        }
        Ok(())
    }

    /// Poisons the engine. Integrity faults must never be silently swallowed.
    fn fail_integrity(&mut self, detail: String) -> EngineError {
        self.halted = true;
        error!(%detail, "book integrity violated; engine halted");
        EngineError::IntegrityViolation(detail)
    }

    /// The book may be crossed only transiently inside the crossing loop; a
    /// crossed book persisting past an instruction is a fatal fault.
    fn check_integrity(&mut self) -> EngineResult<()> {
        if let (Some(bid), Some(ask)) = (self.bids.best_price(), self.asks.best_price()) {
            if bid >= ask {
                return Err(self.fail_integrity(format!(
                    "crossed book persisted: best bid {bid} >= best ask {ask}"
                )));
            }
        }
        Ok(())
    }

    fn book_side(&self, side: Side) -> &BookSide {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn book_side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    fn opposite_side(&self, side: Side) -> &BookSide {
        self.book_side(side.opposite())
    }

    fn opposite_side_mut(&mut self, side: Side) -> &mut BookSide {
        self.book_side_mut(side.opposite())
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
