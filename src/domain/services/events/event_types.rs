//--------------------------------------------------------------------------------------------------
// STRUCTS & ENUMS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods       |
// |-------------------------|---------------------------------------------------|------------------|
// | EngineEvent             | Event variants emitted by the matching engine    | kind              |
// | EventError              | Error types for event delivery                   |                   |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::types::{Order, Trade};

/// Errors that can occur delivering events to external collaborators.
#[derive(Error, Debug, Clone)]
pub enum EventError {
    /// Failed to publish an event (e.g., channel closed or full).
    #[error("Failed to publish event: {0}")]
    PublishError(String),
}

/// Type alias for Result with EventError.
pub type EventResult<T> = Result<T, EventError>;

/// A state transition reported by the matching engine.
///
/// Events are delivered synchronously, in causal order, within the instruction
/// call that produced them: trades in traded order (oldest resting order
/// first), each maker's fill status right after its trade, and the incoming
/// order's final status last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// An order was accepted and rested on the book.
    OrderAccepted {
        /// The resting order as accepted (possibly already partially filled).
        order: Order,
        /// Timestamp when the event occurred.
        timestamp: DateTime<Utc>,
    },

    /// A submission was rejected; the book is untouched.
    OrderRejected {
        /// The identifier the submission carried (or was assigned).
        order_id: Uuid,
        /// Why the order was rejected.
        reason: String,
        /// Timestamp when the event occurred.
        timestamp: DateTime<Utc>,
    },

    /// A trade was executed between a resting and an incoming order.
    TradeExecuted {
        /// The trade that was executed.
        trade: Trade,
        /// Timestamp when the event occurred.
        timestamp: DateTime<Utc>,
    },

    /// An order filled completely.
    OrderFilled {
        /// The order in its final, fully-filled state.
        order: Order,
        /// Timestamp when the event occurred.
        timestamp: DateTime<Utc>,
    },

    /// A resting order was partially filled and remains at the head of its level.
    OrderPartiallyFilled {
        /// The resting order after the fill.
        order: Order,
        /// Quantity consumed by this fill.
        filled_quantity: u64,
        /// Timestamp when the event occurred.
        timestamp: DateTime<Utc>,
    },

    /// An order was cancelled (explicitly, or as an unfilled remainder).
    OrderCancelled {
        /// The order in its final state.
        order: Order,
        /// Timestamp when the event occurred.
        timestamp: DateTime<Utc>,
    },

    /// A resting order was replaced; a fresh sequence number follows.
    OrderReplaced {
        /// The identifier being reused by the replacement.
        order_id: Uuid,
        /// The order state that was removed from the book.
        previous: Order,
        /// Sequence number assigned to the replacement.
        new_sequence: u64,
        /// Timestamp when the event occurred.
        timestamp: DateTime<Utc>,
    },
}

impl EngineEvent {
    /// Short tag for logging and routing.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrderAccepted { .. } => "OrderAccepted",
            Self::OrderRejected { .. } => "OrderRejected",
            Self::TradeExecuted { .. } => "TradeExecuted",
            Self::OrderFilled { .. } => "OrderFilled",
            Self::OrderPartiallyFilled { .. } => "OrderPartiallyFilled",
            Self::OrderCancelled { .. } => "OrderCancelled",
            Self::OrderReplaced { .. } => "OrderReplaced",
        }
    }
}
