//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Price level ledger: the FIFO queue of resting order entries at a single price.
// Entries live in a slab arena and are linked head-to-tail, so cancellation of a
// non-head order is O(1) given the handle returned at insertion time.
//
// | Name          | Description                                        | Key Methods              |
// |---------------|----------------------------------------------------|-------------------------|
// | LedgerEntry   | A resting order's footprint at this price          |                         |
// | LevelLedger   | FIFO queue with O(1) removal by handle             | append, peek_front      |
// |               |                                                    | pop_front, remove       |
// |               |                                                    | reduce_front            |
//--------------------------------------------------------------------------------------------------

use slab::Slab;
use uuid::Uuid;

use super::BookError;

/// Stable handle locating a resting entry inside its level ledger.
///
/// Handles are slab keys: valid only while the entry is resting, and checked
/// against the owning order id on every structural use so a stale handle can
/// never unlink someone else's order.
pub type OrderHandle = usize;

/// A resting order's footprint at a price level.
///
/// The registry owns the full order state; the ledger keeps only what the
/// crossing loop and the aggregate bookkeeping need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// The resting order this entry belongs to.
    pub order_id: Uuid,
    /// Open quantity at this level in base units.
    pub remaining: u64,
    /// Sequence number of the resting order (FIFO position witness).
    pub sequence: u64,
}

#[derive(Debug)]
struct Node {
    entry: LedgerEntry,
    prev: Option<OrderHandle>,
    next: Option<OrderHandle>,
}

/// The ordered queue of resting orders at one price, FIFO by sequence.
///
/// The quantity aggregate is maintained incrementally on every mutation; it is
/// never recomputed by rescanning the queue.
#[derive(Debug)]
pub struct LevelLedger {
    price: i64,
    nodes: Slab<Node>,
    head: Option<OrderHandle>,
    tail: Option<OrderHandle>,
    total_quantity: u64,
}

impl LevelLedger {
    pub fn new(price: i64) -> Self {
        Self {
            price,
            nodes: Slab::new(),
            head: None,
            tail: None,
            total_quantity: 0,
        }
    }

    /// The price this ledger represents.
    #[inline]
    pub fn price(&self) -> i64 {
        self.price
    }

    /// Appends a resting entry at the tail, preserving FIFO order.
    ///
    /// Returns the handle the caller must store to unlink the entry later.
    pub fn append(&mut self, order_id: Uuid, remaining: u64, sequence: u64) -> OrderHandle {
        let handle = self.nodes.insert(Node {
            entry: LedgerEntry {
                order_id,
                remaining,
                sequence,
            },
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(handle),
            None => self.head = Some(handle),
        }
        self.tail = Some(handle);
        self.total_quantity += remaining;
        handle
    }

    /// The earliest resting entry, without removing it.
    pub fn peek_front(&self) -> Option<(OrderHandle, &LedgerEntry)> {
        self.head.map(|handle| (handle, &self.nodes[handle].entry))
    }

    /// Removes and returns the earliest resting entry.
    pub fn pop_front(&mut self) -> Option<LedgerEntry> {
        let handle = self.head?;
        Some(self.unlink(handle))
    }

    /// Removes the entry behind `handle`, wherever it sits in the queue.
    ///
    /// The handle is validated against `order_id`: slab keys are reused after
    /// removal, so a marker held past its order's lifetime must fail here
    /// rather than unlink an unrelated entry.
    pub fn remove(&mut self, handle: OrderHandle, order_id: Uuid) -> Result<LedgerEntry, BookError> {
        match self.nodes.get(handle) {
            Some(node) if node.entry.order_id == order_id => Ok(self.unlink(handle)),
            _ => Err(BookError::StaleHandle { handle, order_id }),
        }
    }

    /// Decrements the head entry (a partial fill of the earliest resting order).
    pub fn reduce_front(&mut self, delta: u64) -> Result<(), BookError> {
        let head = self.head.ok_or(BookError::EmptyLevel(self.price))?;
        let entry = &mut self.nodes[head].entry;
        if entry.remaining < delta {
            return Err(BookError::QuantityUnderflow {
                price: self.price,
                have: entry.remaining,
                want: delta,
            });
        }
        entry.remaining -= delta;
        self.total_quantity -= delta;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Open quantity across all resting entries, maintained incrementally.
    #[inline]
    pub fn total_quantity(&self) -> u64 {
        self.total_quantity
    }

    /// Number of resting entries at this level.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterates entries in FIFO order.
    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry> {
        LedgerIter {
            ledger: self,
            cursor: self.head,
        }
    }

    fn unlink(&mut self, handle: OrderHandle) -> LedgerEntry {
        let node = self.nodes.remove(handle);
        match node.prev {
            Some(prev) => self.nodes[prev].next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.nodes[next].prev = node.prev,
            None => self.tail = node.prev,
        }
        self.total_quantity -= node.entry.remaining;
        node.entry
    }
}

struct LedgerIter<'a> {
    ledger: &'a LevelLedger,
    cursor: Option<OrderHandle>,
}

impl<'a> Iterator for LedgerIter<'a> {
    type Item = &'a LedgerEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.cursor?;
        let node = &self.ledger.nodes[handle];
        self.cursor = node.next;
        Some(&node.entry)
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
