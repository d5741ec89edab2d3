pub mod event_bus;
pub mod event_types;
pub mod notifier;

pub use event_bus::{EventBus, EventBusBridge};
pub use event_types::{EngineEvent, EventError, EventResult};
pub use notifier::{EventSink, RecordingSink, TracingSink};
