//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Order registry: the single source of truth for which order identifiers are live,
// where each resting order sits in the book, and the monotonic sequence counter that
// implements time priority.
//
// | Name          | Description                                        | Key Methods              |
// |---------------|----------------------------------------------------|-------------------------|
// | BookLocation  | (side, price, handle) position of a resting order  |                         |
// | OrderRecord   | Live order state plus its book location            |                         |
// | OrderRegistry | id -> record map + sequence allocation             | register, lookup        |
// |               |                                                    | deregister              |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::types::{Order, Side};
use crate::domain::services::book::OrderHandle;

/// Errors raised by registry operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The identifier is already live in the registry.
    #[error("order identifier {0} is already active")]
    DuplicateIdentifier(Uuid),

    /// No live order with this identifier.
    #[error("order {0} not found in the registry")]
    NotFound(Uuid),
}

/// Where a resting order currently sits in the book.
///
/// The handle is the ledger slot returned at insertion; it is invalidated when
/// the order leaves the ledger and must never be dereferenced afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookLocation {
    pub side: Side,
    pub price: i64,
    pub handle: OrderHandle,
}

/// A live resting order and its book location.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub order: Order,
    pub location: BookLocation,
}

/// Registry of live resting orders, keyed by identifier.
#[derive(Debug, Default)]
pub struct OrderRegistry {
    orders: HashMap<Uuid, OrderRecord>,
    /// Next sequence number to hand out; strictly monotonic for the engine's lifetime.
    next_sequence: u64,
}

impl OrderRegistry {
    pub fn new() -> Self {
        Self {
            orders: HashMap::new(),
            next_sequence: 1,
        }
    }

    /// Hands out the next sequence number.
    ///
    /// Every accepted instruction consumes one, including takers that never
    /// rest, so sequence order is submission order across the whole stream.
    pub fn allocate_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    /// Stores a resting order and its book location.
    pub fn register(&mut self, order: Order, location: BookLocation) -> Result<(), RegistryError> {
        if self.orders.contains_key(&order.id) {
            return Err(RegistryError::DuplicateIdentifier(order.id));
        }
        self.orders.insert(order.id, OrderRecord { order, location });
        Ok(())
    }

    pub fn lookup(&self, id: &Uuid) -> Option<&OrderRecord> {
        self.orders.get(id)
    }

    pub fn lookup_mut(&mut self, id: &Uuid) -> Option<&mut OrderRecord> {
        self.orders.get_mut(id)
    }

    /// Removes a terminal order, returning its final record.
    pub fn deregister(&mut self, id: &Uuid) -> Result<OrderRecord, RegistryError> {
        self.orders.remove(id).ok_or(RegistryError::NotFound(*id))
    }

    /// Re-records where the order rests in the book.
    pub fn update_position(
        &mut self,
        id: &Uuid,
        location: BookLocation,
    ) -> Result<(), RegistryError> {
        let record = self
            .orders
            .get_mut(id)
            .ok_or(RegistryError::NotFound(*id))?;
        record.location = location;
        Ok(())
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.orders.contains_key(id)
    }

    /// Number of live resting orders.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
