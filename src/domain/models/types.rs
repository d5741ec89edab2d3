//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Core data types shared by every service in the engine: order/trade structures and the
// discrete enums that drive matching behavior.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ENUMS              | Side, OrderKind, TimeInForce, OrderStatus, RemainderDisposition. |
// | STRUCTS            | OrderDescriptor (caller input), Order, Trade.                    |
// | TESTS              | Unit tests for the defined types.                                |
//--------------------------------------------------------------------------------------------------
// Prices are integer ticks (i64), quantities integer base units (u64); callers scale to
// their instrument's tick/lot size before submission.
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents the side of an order (Buy or Sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// A buy order.
    Bid,
    /// A sell order.
    Ask,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Self::Bid => Self::Ask,
            Self::Ask => Self::Bid,
        }
    }
}

/// The pricing behavior of an order.
///
/// Modeled as a tagged variant rather than a separate type enum plus an optional
/// price, so an unpriced limit order is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    /// Executes at the given tick price or better; the remainder may rest.
    Limit { price: i64 },
    /// Executes immediately at the best available price; never rests.
    Market,
}

impl OrderKind {
    /// The limit price, if this kind carries one.
    #[inline]
    pub fn limit_price(&self) -> Option<i64> {
        match self {
            Self::Limit { price } => Some(*price),
            Self::Market => None,
        }
    }

    #[inline]
    pub fn is_market(&self) -> bool {
        matches!(self, Self::Market)
    }
}

/// Defines what happens to the unfilled remainder of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    /// Good Till Cancel - the remainder rests until explicitly cancelled.
    GTC,
    /// Immediate Or Cancel - fills what it can, the remainder is cancelled.
    IOC,
    /// Fill Or Kill - fills completely or trades nothing at all.
    FOK,
}

impl Default for TimeInForce {
    fn default() -> Self {
        Self::GTC
    }
}

/// Represents the lifecycle status of an order within the matching engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// The order has been acknowledged by the engine.
    Submitted,
    /// The order is resting with no fills yet.
    Unfilled,
    /// The order has been partially filled.
    PartiallyFilled,
    /// The order was partially filled and then cancelled.
    PartiallyFilledCancelled,
    /// The order has been completely filled.
    Filled,
    /// The order was cancelled before being filled.
    Cancelled,
    /// The order was rejected by the engine.
    Rejected,
}

impl OrderStatus {
    /// Terminal orders are no longer live in the registry and can never trade again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::PartiallyFilledCancelled | Self::Filled | Self::Cancelled | Self::Rejected
        )
    }
}

/// What the engine did with the unfilled remainder of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemainderDisposition {
    /// Nothing was left over; the order filled completely.
    FullyFilled,
    /// The remainder was rested on the book.
    Rested,
    /// The remainder was cancelled (IOC, or a market order out of liquidity).
    Cancelled,
    /// The order was killed without trading (FOK with insufficient liquidity).
    Killed,
}

/// A caller-facing order submission.
///
/// The identifier is optional: when absent the engine assigns one at acceptance
/// and reports it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDescriptor {
    /// Caller-assigned identifier; engine-assigned when `None`.
    pub id: Option<Uuid>,
    /// Side of the order (Buy or Sell).
    pub side: Side,
    /// Pricing behavior (limit price or market).
    pub kind: OrderKind,
    /// Quantity in base units.
    pub quantity: u64,
    /// Remainder policy. Market orders are always treated as IOC.
    #[serde(default)]
    pub time_in_force: TimeInForce,
}

impl OrderDescriptor {
    /// A GTC limit order descriptor.
    pub fn limit(side: Side, price: i64, quantity: u64) -> Self {
        Self {
            id: None,
            side,
            kind: OrderKind::Limit { price },
            quantity,
            time_in_force: TimeInForce::GTC,
        }
    }

    /// A market order descriptor (immediate-or-cancel by construction).
    pub fn market(side: Side, quantity: u64) -> Self {
        Self {
            id: None,
            side,
            kind: OrderKind::Market,
            quantity,
            time_in_force: TimeInForce::IOC,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }
}

/// A trading order as tracked by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier for the order.
    pub id: Uuid,
    /// Side of the order (Buy or Sell).
    pub side: Side,
    /// Pricing behavior (limit price or market).
    pub kind: OrderKind,
    /// Original quantity in base units.
    pub quantity: u64,
    /// Quantity still open to trade in base units.
    pub remaining: u64,
    /// Remainder policy for the order.
    pub time_in_force: TimeInForce,
    /// Current status of the order.
    pub status: OrderStatus,
    /// Sequence number assigned at acceptance; the time-priority tiebreak.
    /// A replace assigns a fresh one even when the identifier is reused.
    pub sequence: u64,
    /// Timestamp of order creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update to the order.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The limit price, if the order carries one.
    #[inline]
    pub fn limit_price(&self) -> Option<i64> {
        self.kind.limit_price()
    }

    /// Quantity filled so far in base units.
    #[inline]
    pub fn filled(&self) -> u64 {
        self.quantity - self.remaining
    }
}

/// A completed trade between a resting (maker) and an incoming (taker) order.
///
/// Trades are reported and forgotten; retention is the persistence collaborator's
/// responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique identifier for the trade.
    pub id: Uuid,
    /// ID of the order that was resting on the book (maker).
    pub maker_order_id: Uuid,
    /// ID of the order that matched the resting order (taker).
    pub taker_order_id: Uuid,
    /// Price at which the trade occurred; always the maker's price.
    pub price: i64,
    /// Quantity traded in base units.
    pub quantity: u64,
    /// Sequence number of the maker order.
    pub maker_sequence: u64,
    /// Sequence number of the taker order.
    pub taker_sequence: u64,
    /// Timestamp when the trade occurred.
    pub executed_at: DateTime<Utc>,
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
