use thiserror::Error;
use uuid::Uuid;

pub mod depth;
pub mod ledger;
pub mod side;

pub use depth::{DepthLevel, DepthSnapshot};
pub use ledger::{LedgerEntry, LevelLedger, OrderHandle};
pub use side::BookSide;

/// Errors raised by the book structures themselves.
///
/// These indicate misuse of a handle or an accounting inconsistency; the engine
/// maps them to its own error surface at the API boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BookError {
    /// The handle does not point at the given order (reused slot or long-gone entry).
    #[error("stale handle {handle} for order {order_id}")]
    StaleHandle { handle: OrderHandle, order_id: Uuid },

    /// A front-of-queue operation was attempted on an empty level.
    #[error("price level {0} is empty")]
    EmptyLevel(i64),

    /// A fill tried to consume more than the head entry has open.
    #[error("quantity underflow at price {price}: have {have}, want {want}")]
    QuantityUnderflow { price: i64, have: u64, want: u64 },
}
