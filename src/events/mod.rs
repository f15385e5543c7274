//! Simple stateless pub-sub event system.
//!
//! The engine does not push notifications onto sockets itself. It publishes events through the producers configured
//! here, and the embedding server installs hooks that route them to the real-time transport. If no hook is
//! installed, publishing is a no-op, which also covers the "nobody is connected" case: delivery is fire-and-forget
//! with no acknowledgement contract.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::{MatchSuccessEvent, Notification, WaiterExpiredEvent, MATCH_SUCCESS_EVENT, WAITER_EXPIRED_EVENT};
pub use hooks::{EventHandlers, EventHooks, EventProducers};
