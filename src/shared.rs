//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Thread-safe wrapper for callers that drive one engine from several threads. The
// engine itself is single-threaded by design; this wrapper holds a mutex for the
// whole instruction, which is exactly the external serialization the execution
// model requires.
//
// | Name                  | Description                                       | Key Methods       |
// |-----------------------|---------------------------------------------------|------------------|
// | SharedMatchingEngine  | Arc<Mutex<MatchingEngine>> convenience wrapper    | submit, cancel    |
// |                       |                                                   | replace, queries  |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::domain::models::types::{OrderDescriptor, Side};
use crate::domain::services::book::{DepthLevel, DepthSnapshot};
use crate::domain::services::matching_engine::{
    CancelReport, EngineResult, MatchingEngine, ReplaceReport, SubmitReport,
};

/// Cloneable handle to a mutex-guarded engine.
///
/// Each method locks for the full instruction, so instructions from different
/// threads interleave whole, never mid-match.
#[derive(Debug, Clone)]
pub struct SharedMatchingEngine {
    inner: Arc<Mutex<MatchingEngine>>,
}

impl SharedMatchingEngine {
    pub fn new(engine: MatchingEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn submit(&self, descriptor: OrderDescriptor) -> EngineResult<SubmitReport> {
        self.inner.lock().submit(descriptor)
    }

    pub fn cancel(&self, order_id: Uuid) -> EngineResult<CancelReport> {
        self.inner.lock().cancel(order_id)
    }

    pub fn replace(
        &self,
        order_id: Uuid,
        new_price: i64,
        new_quantity: u64,
    ) -> EngineResult<ReplaceReport> {
        self.inner.lock().replace(order_id, new_price, new_quantity)
    }

    pub fn query_best(&self, side: Side) -> Option<i64> {
        self.inner.lock().query_best(side)
    }

    pub fn query_depth(&self, side: Side, levels: usize) -> Vec<DepthLevel> {
        self.inner.lock().query_depth(side, levels)
    }

    pub fn depth_snapshot(&self, levels: usize) -> DepthSnapshot {
        self.inner.lock().depth_snapshot(levels)
    }

    pub fn open_orders(&self) -> usize {
        self.inner.lock().open_orders()
    }

    /// Runs `f` with exclusive access to the engine, for anything the
    /// convenience methods do not cover.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut MatchingEngine) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl Default for SharedMatchingEngine {
    fn default() -> Self {
        Self::new(MatchingEngine::new())
    }
}
