//! Limit order book matching engine for a single tradable instrument.
//!
//! Accepts submit/cancel/replace instructions, maintains the resting order set
//! in price-time priority, deterministically matches crossing orders into
//! trades at the maker's price, and reports every state transition
//! synchronously before the instruction call returns.
//!
//! One engine instance serves one instrument and processes one instruction at
//! a time; callers serialize access externally (see [`shared::SharedMatchingEngine`]).

// Expose the modules
pub mod domain;
pub mod shared;

// Re-export key types for easier usage
pub use domain::models::types::{
    Order, OrderDescriptor, OrderKind, OrderStatus, RemainderDisposition, Side, TimeInForce, Trade,
};
pub use domain::services::book::{BookError, BookSide, DepthLevel, DepthSnapshot, LevelLedger};
pub use domain::services::events::{
    EngineEvent, EventBus, EventBusBridge, EventError, EventResult, EventSink, RecordingSink,
    TracingSink,
};
pub use domain::services::matching_engine::{
    CancelReport, EngineError, EngineResult, MatchingEngine, ReplaceReport, SubmitReport,
};
pub use domain::services::registry::{BookLocation, OrderRecord, OrderRegistry, RegistryError};
pub use shared::SharedMatchingEngine;
