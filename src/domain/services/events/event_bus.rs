//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Broadcast bridge between the synchronous engine core and async collaborators
// (persistence, market data). The engine stays free of I/O and background tasks;
// the bridge hands events into a tokio broadcast channel without blocking the
// instruction path.
//
// | Name           | Description                                       | Key Methods              |
// |----------------|---------------------------------------------------|-------------------------|
// | EventBus       | Broadcast channel for engine events               | publish, subscribe      |
// | EventBusBridge | EventSink that forwards into an EventBus          | on_event                |
//--------------------------------------------------------------------------------------------------

use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::event_types::{EngineEvent, EventError, EventResult};
use super::notifier::EventSink;

/// Broadcast channel distributing engine events to async subscribers.
///
/// Subscribers that fall behind lose the oldest events (broadcast semantics);
/// consumers needing a complete record should subscribe before trading starts
/// and size the capacity accordingly.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publishes an event to all subscribers.
    ///
    /// With no subscribers the event is dropped and the call succeeds; that is
    /// the normal state for an engine running without external collaborators.
    pub fn publish(&self, event: EngineEvent) -> EventResult<()> {
        if self.sender.receiver_count() == 0 {
            debug!(kind = event.kind(), "no subscribers for event");
            return Ok(());
        }
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|e| EventError::PublishError(e.to_string()))
    }

    /// Creates a new subscription to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Returns the capacity of the event channel.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Sink that forwards every engine event into an [`EventBus`].
///
/// Publish failures are logged and swallowed: a lagging or closed downstream
/// must never fail the instruction that produced the event.
#[derive(Debug, Clone)]
pub struct EventBusBridge {
    bus: EventBus,
}

impl EventBusBridge {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

impl EventSink for EventBusBridge {
    fn on_event(&mut self, event: &EngineEvent) {
        if let Err(e) = self.bus.publish(event.clone()) {
            warn!(kind = event.kind(), error = %e, "failed to forward engine event");
        }
    }
}
