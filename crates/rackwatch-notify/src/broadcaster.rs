//! Topic-based event fan-out with bounded per-subscriber channels.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use rackwatch_common::types::AlertRecord;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::TOPIC_ALL;

/// One alert state change, as delivered to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct PushEvent {
    /// Event name, one of the `EVENT_*` constants.
    pub event: String,
    /// Full alert record at the time of the event.
    pub alert: AlertRecord,
}

/// A live subscription to one topic.
///
/// Dropping the subscription (or its receiver) ends it; the registry
/// entry is pruned on the next publish to that topic. Call
/// [`AlertBroadcaster::unsubscribe`] to remove it eagerly.
pub struct Subscription {
    pub id: u64,
    pub topic: String,
    pub receiver: mpsc::Receiver<PushEvent>,
}

/// Fan-out registry mapping topics to live subscriber channels.
///
/// Publishing is best-effort, at-most-once: any subscriber whose bounded
/// channel rejects the send, whether closed or full, is removed from the
/// registry. A publish to a topic with no subscribers is a no-op.
pub struct AlertBroadcaster {
    buffer: usize,
    next_id: AtomicU64,
    topics: RwLock<HashMap<String, HashMap<u64, mpsc::Sender<PushEvent>>>>,
}

impl AlertBroadcaster {
    /// Creates a broadcaster whose subscriber channels buffer up to
    /// `buffer` undelivered events each.
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            next_id: AtomicU64::new(1),
            topics: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a new subscriber on `topic`.
    pub fn subscribe(&self, topic: &str) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        self.topics
            .write()
            .unwrap()
            .entry(topic.to_string())
            .or_default()
            .insert(id, tx);
        tracing::debug!(topic, subscriber_id = id, "stream subscriber attached");
        Subscription {
            id,
            topic: topic.to_string(),
            receiver: rx,
        }
    }

    /// Removes a subscriber from the registry. Safe to call for
    /// subscribers that were already pruned.
    pub fn unsubscribe(&self, topic: &str, id: u64) {
        let mut topics = self.topics.write().unwrap();
        if let Some(subs) = topics.get_mut(topic) {
            subs.remove(&id);
            if subs.is_empty() {
                topics.remove(topic);
            }
        }
    }

    /// Publishes `event` to every subscriber of `topic`, returning the
    /// number of subscribers that received it. Any subscriber whose
    /// channel refuses the send is dropped from the registry.
    pub fn publish(&self, topic: &str, event: &PushEvent) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();
        {
            let topics = self.topics.read().unwrap();
            let Some(subs) = topics.get(topic) else {
                return 0;
            };
            for (id, tx) in subs {
                match tx.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(topic, subscriber_id = id, "subscriber lagging, dropping it");
                        dead.push(*id);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => dead.push(*id),
                }
            }
        }
        if !dead.is_empty() {
            let mut topics = self.topics.write().unwrap();
            if let Some(subs) = topics.get_mut(topic) {
                for id in dead {
                    subs.remove(&id);
                }
                if subs.is_empty() {
                    topics.remove(topic);
                }
            }
        }
        delivered
    }

    /// Publishes an alert state change to the `all` topic and to the
    /// topic of the alert's own target.
    pub fn publish_alert(&self, event_name: &str, alert: &AlertRecord) {
        let event = PushEvent {
            event: event_name.to_string(),
            alert: alert.clone(),
        };
        self.publish(TOPIC_ALL, &event);
        self.publish(&alert.target().topic(), &event);
    }

    /// Live subscriber count on one topic.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .unwrap()
            .get(topic)
            .map_or(0, HashMap::len)
    }

    /// Live subscriber count across all topics.
    pub fn total_subscribers(&self) -> usize {
        self.topics.read().unwrap().values().map(HashMap::len).sum()
    }

    /// Per-topic subscriber counts, for the stats endpoint.
    pub fn topic_counts(&self) -> HashMap<String, usize> {
        self.topics
            .read()
            .unwrap()
            .iter()
            .map(|(topic, subs)| (topic.clone(), subs.len()))
            .collect()
    }
}
