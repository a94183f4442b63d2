mod channel;
mod event_types;
mod hooks;

#[cfg(feature = "sqlite")]
mod audit_sink;

#[cfg(feature = "sqlite")]
pub use audit_sink::sqlite_audit_sink;
pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
