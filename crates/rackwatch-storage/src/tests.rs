use crate::store::{ActiveAlertFilter, MonitorStore, ThresholdSpec};
use chrono::Utc;
use rackwatch_common::types::{
    AlertRecord, AlertStatus, Bound, Severity, TargetRef, TargetType,
};

async fn setup() -> MonitorStore {
    rackwatch_common::id::init(1, 1);
    MonitorStore::open_in_memory().await.unwrap()
}

fn equipment(id: &str) -> TargetRef {
    TargetRef::new(TargetType::Equipment, id)
}

fn make_alert(target: &TargetRef, metric_name: &str, level: Severity) -> AlertRecord {
    let now = Utc::now();
    AlertRecord {
        id: rackwatch_common::id::next_id(),
        target_type: target.target_type,
        target_id: target.target_id.clone(),
        target_name: "web-server-01".to_string(),
        metric_type: "cpu".to_string(),
        metric_name: metric_name.to_string(),
        level,
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
async fn tracker_get_or_create_is_idempotent() {
    let store = setup().await;
    let target = equipment("7");

    let first = store
        .get_or_create_tracker(&target, "cpu", "cpu_usage")
        .await
        .unwrap();
    assert_eq!(first.consecutive_violations, 0);
    assert!(first.last_alert_sent_at.is_none());

    let second = store
        .get_or_create_tracker(&target, "cpu", "cpu_usage")
        .await
        .unwrap();
    assert_eq!(first.id, second.id, "same key must map to one tracker row");
}

#[tokio::test]
async fn tracker_save_roundtrip() {
    let store = setup().await;
    let target = equipment("7");
    let mut tracker = store
        .get_or_create_tracker(&target, "cpu", "cpu_usage")
        .await
        .unwrap();

    let sample_time = Utc::now();
    tracker.consecutive_violations = 3;
    tracker.last_violation_time = sample_time;
    tracker.last_measured_value = Some(97.5);
    tracker.last_alert_sent_at = Some(sample_time);
    store.save_tracker(&tracker).await.unwrap();

    let reloaded = store
        .get_or_create_tracker(&target, "cpu", "cpu_usage")
        .await
        .unwrap();
    assert_eq!(reloaded.consecutive_violations, 3);
    assert_eq!(reloaded.last_measured_value, Some(97.5));
    assert!(reloaded.last_alert_sent_at.is_some());
}

#[tokio::test]
async fn trackers_are_separate_per_metric_name() {
    let store = setup().await;
    let target = equipment("3");

    let floor = store
        .get_or_create_tracker(&target, "humidity", "humidity_min")
        .await
        .unwrap();
    let ceiling = store
        .get_or_create_tracker(&target, "humidity", "humidity_max")
        .await
        .unwrap();
    assert_ne!(floor.id, ceiling.id);
}

#[tokio::test]
async fn find_active_alerts_is_scoped_to_exact_key() {
    let store = setup().await;
    let target = equipment("7");
    let other_target = equipment("8");

    store
        .insert_alert(&make_alert(&target, "cpu_usage", Severity::Critical))
        .await
        .unwrap();
    store
        .insert_alert(&make_alert(&other_target, "cpu_usage", Severity::Warning))
        .await
        .unwrap();
    store
        .insert_alert(&make_alert(&target, "cpu_load", Severity::Warning))
        .await
        .unwrap();

    let active = store
        .find_active_alerts(&target, "cpu", "cpu_usage")
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].target_id, "7");
    assert_eq!(active[0].metric_name, "cpu_usage");
}

#[tokio::test]
async fn resolve_alert_is_idempotent() {
    let store = setup().await;
    let target = equipment("7");
    let record = store
        .insert_alert(&make_alert(&target, "cpu_usage", Severity::Critical))
        .await
        .unwrap();

    let resolved = store.resolve_alert(&record.id, Utc::now()).await.unwrap();
    assert!(resolved.is_some());
    let resolved = resolved.unwrap();
    assert_eq!(resolved.status, AlertStatus::Resolved);
    assert!(resolved.resolved_at.is_some());

    // Second resolve is a no-op.
    let again = store.resolve_alert(&record.id, Utc::now()).await.unwrap();
    assert!(again.is_none());
}

#[tokio::test]
async fn acknowledge_only_applies_to_triggered_alerts() {
    let store = setup().await;
    let target = equipment("7");
    let record = store
        .insert_alert(&make_alert(&target, "cpu_usage", Severity::Warning))
        .await
        .unwrap();

    let acked = store.acknowledge_alert(&record.id).await.unwrap();
    assert_eq!(acked.unwrap().status, AlertStatus::Acknowledged);

    // Already acknowledged: no further transition.
    assert!(store.acknowledge_alert(&record.id).await.unwrap().is_none());

    // Acknowledged records still count as active.
    let active = store
        .find_active_alerts(&target, "cpu", "cpu_usage")
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn active_alert_listing_filters_by_target_type() {
    let store = setup().await;
    store
        .insert_alert(&make_alert(&equipment("1"), "cpu_usage", Severity::Warning))
        .await
        .unwrap();
    let rack = TargetRef::new(TargetType::Rack, "2");
    store
        .insert_alert(&make_alert(&rack, "cpu_usage", Severity::Critical))
        .await
        .unwrap();

    let filter = ActiveAlertFilter {
        target_type_eq: Some(TargetType::Rack),
        ..Default::default()
    };
    let rows = store.list_active_alerts(&filter, 20, 0).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].target_type, TargetType::Rack);
    assert_eq!(store.count_active_alerts(&filter).await.unwrap(), 1);
}

#[tokio::test]
async fn settings_row_is_absent_until_upserted() {
    let store = setup().await;
    assert!(store.get_alert_settings().await.unwrap().is_none());

    let row = store.upsert_alert_settings(5, 30).await.unwrap();
    assert_eq!(row.consecutive_count_threshold, 5);
    assert_eq!(row.cooldown_minutes, 30);

    // Upsert updates in place, never grows a second row.
    let row2 = store.upsert_alert_settings(2, 15).await.unwrap();
    assert_eq!(row.id, row2.id);
    let fetched = store.get_alert_settings().await.unwrap().unwrap();
    assert_eq!(fetched.consecutive_count_threshold, 2);
}

#[tokio::test]
async fn target_upsert_and_threshold_replacement() {
    let store = setup().await;
    let target = TargetRef::new(TargetType::ServerRoom, "12");

    let row = store.upsert_target(&target, "DC1 Room A", true).await.unwrap();
    assert!(row.monitoring_enabled);

    let updated = store.upsert_target(&target, "DC1 Room A", false).await.unwrap();
    assert_eq!(row.id, updated.id);
    assert!(!updated.monitoring_enabled);

    let specs = vec![
        ThresholdSpec {
            metric_type: "humidity".to_string(),
            metric_name: "humidity_max".to_string(),
            bound: Bound::Upper,
            warning_value: Some(70.0),
            critical_value: Some(85.0),
        },
        ThresholdSpec {
            metric_type: "humidity".to_string(),
            metric_name: "humidity_min".to_string(),
            bound: Bound::Lower,
            warning_value: Some(30.0),
            critical_value: Some(15.0),
        },
        ThresholdSpec {
            metric_type: "temperature".to_string(),
            metric_name: "temperature".to_string(),
            bound: Bound::Upper,
            warning_value: Some(28.0),
            critical_value: None,
        },
    ];
    store.replace_thresholds(&target, &specs).await.unwrap();

    let humidity = store
        .list_thresholds_for_metric(&target, "humidity")
        .await
        .unwrap();
    assert_eq!(humidity.len(), 2);
    assert_eq!(humidity[0].metric_name, "humidity_max");
    assert_eq!(humidity[1].metric_name, "humidity_min");
    assert_eq!(humidity[1].bound, Bound::Lower);

    // Replacement drops rows not in the new set.
    store
        .replace_thresholds(&target, &specs[2..])
        .await
        .unwrap();
    assert!(store
        .list_thresholds_for_metric(&target, "humidity")
        .await
        .unwrap()
        .is_empty());
    assert_eq!(store.list_thresholds(&target).await.unwrap().len(), 1);
}
