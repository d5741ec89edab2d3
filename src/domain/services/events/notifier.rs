//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Synchronous event delivery. The engine invokes a single sink once per state
// transition, in the exact order the transitions occurred inside one instruction;
// downstream consumers depend on that causal order, so sinks must not batch or
// reorder.
//
// | Name          | Description                                        | Key Methods              |
// |---------------|----------------------------------------------------|-------------------------|
// | EventSink     | Callback trait invoked per state transition        | on_event                |
// | RecordingSink | In-memory history sink (tests, debugging)          | history, clear          |
// | TracingSink   | Logs every event through `tracing`                 |                         |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::event_types::EngineEvent;

/// Callback invoked synchronously for every engine state transition.
///
/// Implementations run inside the instruction call and must return promptly;
/// anything slow or fallible belongs behind the broadcast bridge instead.
pub trait EventSink: Send {
    fn on_event(&mut self, event: &EngineEvent);
}

/// Lets a caller keep a handle to a sink after handing it to the engine
/// (e.g. reading a [`RecordingSink`] history while the engine owns the box).
impl<S: EventSink> EventSink for Arc<Mutex<S>> {
    fn on_event(&mut self, event: &EngineEvent) {
        self.lock().on_event(event);
    }
}

/// A sink that keeps a bounded in-memory history of events.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Maximum number of events to keep; 0 means unbounded.
    max_history: usize,
    history: Vec<EngineEvent>,
}

impl RecordingSink {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            history: Vec::new(),
        }
    }

    /// The recorded events, oldest first.
    pub fn history(&self) -> &[EngineEvent] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

impl EventSink for RecordingSink {
    fn on_event(&mut self, event: &EngineEvent) {
        if self.max_history > 0 && self.history.len() >= self.max_history {
            self.history.remove(0);
        }
        self.history.push(event.clone());
    }
}

/// A sink that logs every event at debug level, with the full payload as JSON.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_event(&mut self, event: &EngineEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => debug!(kind = event.kind(), %payload, "engine event"),
            Err(e) => warn!(kind = event.kind(), error = %e, "engine event not serializable"),
        }
    }
}
