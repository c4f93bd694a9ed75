//! Real-time fan-out of order events to the parties involved.
//!
//! [`hub::RealtimeHub`] holds one broadcast channel per room (`vendor_<id>`,
//! `user_<id>`). [`notifier`] listens on the domain-event bus, works out who
//! needs to hear about a change and emits to their rooms. Delivery is best
//! effort: nothing here can fail or delay the HTTP request that caused the
//! event.

pub mod hub;
pub mod notifier;

pub use hub::{RealtimeHub, RealtimeMessage, RealtimeTransport, TransportError};
pub use notifier::{spawn_notifier, EventBus};
