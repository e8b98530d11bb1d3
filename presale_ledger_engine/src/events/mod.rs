mod channel;
mod dedup;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use dedup::NotificationDeduper;
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
