use chrono::Utc;
use rackwatch_common::types::{AlertRecord, AlertStatus, Severity, TargetType};

use crate::broadcaster::AlertBroadcaster;
use crate::{EVENT_RESOLVED, EVENT_TRIGGERED, TOPIC_ALL};

fn sample_alert(target_type: TargetType, target_id: &str) -> AlertRecord {
    let now = Utc::now();
    AlertRecord {
        id: "1001".to_string(),
        target_type,
        target_id: target_id.to_string(),
        target_name: "web-server-01".to_string(),
        metric_type: "cpu".to_string(),
        metric_name: "cpu_usage".to_string(),
        level: Severity::Critical,
        measured_value: 95.0,
        threshold_value: 90.0,
        status: AlertStatus::Triggered,
        message: "cpu usage 95.0 >= 90.0".to_string(),
        triggered_at: now,
        resolved_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn alert_reaches_matching_topics_only() {
    let broadcaster = AlertBroadcaster::new(16);
    let mut everything = broadcaster.subscribe(TOPIC_ALL);
    let mut equipment_7 = broadcaster.subscribe("equipment-7");
    let mut equipment_8 = broadcaster.subscribe("equipment-8");
    let mut rack_7 = broadcaster.subscribe("rack-7");

    broadcaster.publish_alert(EVENT_TRIGGERED, &sample_alert(TargetType::Equipment, "7"));

    let ev = everything.receiver.try_recv().unwrap();
    assert_eq!(ev.event, EVENT_TRIGGERED);
    assert_eq!(ev.alert.target_id, "7");

    let ev = equipment_7.receiver.try_recv().unwrap();
    assert_eq!(ev.event, EVENT_TRIGGERED);

    // Same id under a different target type, and a different id of the
    // same type, both stay silent.
    assert!(rack_7.receiver.try_recv().is_err());
    assert!(equipment_8.receiver.try_recv().is_err());
}

#[tokio::test]
async fn subscriber_sees_no_backlog() {
    let broadcaster = AlertBroadcaster::new(16);
    broadcaster.publish_alert(EVENT_TRIGGERED, &sample_alert(TargetType::Equipment, "7"));

    let mut late = broadcaster.subscribe(TOPIC_ALL);
    assert!(late.receiver.try_recv().is_err());

    broadcaster.publish_alert(EVENT_RESOLVED, &sample_alert(TargetType::Equipment, "7"));
    assert_eq!(late.receiver.try_recv().unwrap().event, EVENT_RESOLVED);
}

#[tokio::test]
async fn closed_subscribers_are_pruned_on_publish() {
    let broadcaster = AlertBroadcaster::new(16);
    let dropped = broadcaster.subscribe("equipment-7");
    let kept = broadcaster.subscribe("equipment-7");
    assert_eq!(broadcaster.subscriber_count("equipment-7"), 2);

    drop(dropped.receiver);
    broadcaster.publish_alert(EVENT_TRIGGERED, &sample_alert(TargetType::Equipment, "7"));
    assert_eq!(broadcaster.subscriber_count("equipment-7"), 1);

    drop(kept);
    broadcaster.publish_alert(EVENT_TRIGGERED, &sample_alert(TargetType::Equipment, "7"));
    assert_eq!(broadcaster.subscriber_count("equipment-7"), 0);
    assert_eq!(broadcaster.total_subscribers(), 0);
}

#[tokio::test]
async fn unsubscribe_removes_registry_entry() {
    let broadcaster = AlertBroadcaster::new(16);
    let sub = broadcaster.subscribe("datacenter-1");
    assert_eq!(broadcaster.subscriber_count("datacenter-1"), 1);

    broadcaster.unsubscribe(&sub.topic, sub.id);
    assert_eq!(broadcaster.subscriber_count("datacenter-1"), 0);
    assert!(broadcaster.topic_counts().is_empty());

    // Unsubscribing twice is harmless.
    broadcaster.unsubscribe(&sub.topic, sub.id);
}

#[tokio::test]
async fn lagging_subscriber_is_evicted_on_full_buffer() {
    let broadcaster = AlertBroadcaster::new(1);
    let mut slow = broadcaster.subscribe(TOPIC_ALL);
    let mut fast = broadcaster.subscribe(TOPIC_ALL);

    let alert = sample_alert(TargetType::Rack, "3");
    assert_eq!(broadcaster.publish(TOPIC_ALL, &crate::PushEvent {
        event: EVENT_TRIGGERED.to_string(),
        alert: alert.clone(),
    }), 2);
    fast.receiver.try_recv().unwrap();

    // One channel is full now; its subscriber is evicted, the one that
    // kept up still gets the event.
    assert_eq!(broadcaster.publish(TOPIC_ALL, &crate::PushEvent {
        event: EVENT_RESOLVED.to_string(),
        alert,
    }), 1);
    assert_eq!(broadcaster.subscriber_count(TOPIC_ALL), 1);
    assert_eq!(fast.receiver.try_recv().unwrap().event, EVENT_RESOLVED);

    // The evicted subscriber keeps what was already buffered, then its
    // channel reports closed.
    assert_eq!(slow.receiver.try_recv().unwrap().event, EVENT_TRIGGERED);
    assert!(slow.receiver.try_recv().is_err());
}
