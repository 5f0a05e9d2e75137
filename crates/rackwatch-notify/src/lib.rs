//! Live alert fan-out.
//!
//! Alert state changes are published as [`PushEvent`]s onto named topics.
//! Clients subscribe to a topic and receive every event published to it
//! from that moment on; there is no backlog and no persistence. Each
//! alert is published to the `all` topic and to the topic of its target
//! (e.g. `equipment-7`), so a client can follow one device or the whole
//! fleet.

pub mod broadcaster;

#[cfg(test)]
mod tests;

pub use broadcaster::{AlertBroadcaster, PushEvent, Subscription};

/// Topic that carries every alert event regardless of target.
pub const TOPIC_ALL: &str = "all";

/// Event name for a newly created alert.
pub const EVENT_TRIGGERED: &str = "alert-triggered";

/// Event name for an operator acknowledgement.
pub const EVENT_ACKNOWLEDGED: &str = "alert-acknowledged";

/// Event name for an alert closed automatically or by an operator.
pub const EVENT_RESOLVED: &str = "alert-resolved";
