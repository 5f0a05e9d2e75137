use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rackwatch_common::types::{
    AlertStatus, Bound, MetricSample, Severity, TargetRef, TargetType,
};
use rackwatch_notify::{AlertBroadcaster, Subscription, EVENT_RESOLVED, EVENT_TRIGGERED, TOPIC_ALL};
use rackwatch_storage::MonitorStore;

use crate::engine::{AlertEvaluator, SampleOutcome, SkipReason};
use crate::settings::SettingsProvider;

struct Harness {
    store: Arc<MonitorStore>,
    settings: Arc<SettingsProvider>,
    evaluator: AlertEvaluator,
    events: Subscription,
}

async fn setup() -> Harness {
    rackwatch_common::id::init(1, 1);
    let store = Arc::new(MonitorStore::open_in_memory().await.unwrap());
    let settings = Arc::new(SettingsProvider::load(store.clone()).await.unwrap());
    let broadcaster = Arc::new(AlertBroadcaster::new(64));
    let events = broadcaster.subscribe(TOPIC_ALL);
    let evaluator = AlertEvaluator::new(store.clone(), settings.clone(), broadcaster);
    Harness {
        store,
        settings,
        evaluator,
        events,
    }
}

fn t0() -> DateTime<Utc> {
    Utc::now() - Duration::hours(1)
}

async fn feed(
    h: &Harness,
    target: &TargetRef,
    measured: f64,
    at: DateTime<Utc>,
) -> Option<rackwatch_common::types::AlertRecord> {
    h.evaluator
        .evaluate(target, "web-server-01", "cpu", "cpu_usage", measured, 70.0, Some(90.0), Bound::Upper, at)
        .await
        .unwrap()
}

#[tokio::test]
async fn alert_fires_only_on_nth_consecutive_violation() {
    let mut h = setup().await;
    let target = TargetRef::new(TargetType::Equipment, "7");
    let start = t0();

    assert!(feed(&h, &target, 95.0, start).await.is_none());
    assert!(feed(&h, &target, 96.0, start + Duration::minutes(1)).await.is_none());
    assert!(h.events.receiver.try_recv().is_err(), "no event before the Nth violation");

    let record = feed(&h, &target, 94.0, start + Duration::minutes(2))
        .await
        .expect("third consecutive violation must alert");
    assert_eq!(record.level, Severity::Critical);
    assert_eq!(record.measured_value, 94.0);
    assert_eq!(record.threshold_value, 90.0, "critical threshold is the one breached");
    assert_eq!(record.status, AlertStatus::Triggered);
    assert_eq!(record.triggered_at, start + Duration::minutes(2));

    let ev = h.events.receiver.try_recv().unwrap();
    assert_eq!(ev.event, EVENT_TRIGGERED);
    assert_eq!(ev.alert.id, record.id);
}

#[tokio::test]
async fn cooldown_suppresses_repeat_alerts_until_strictly_past() {
    let mut h = setup().await;
    let target = TargetRef::new(TargetType::Equipment, "7");
    let start = t0();

    for i in 0..3 {
        feed(&h, &target, 95.0, start + Duration::minutes(i)).await;
    }
    let first_sent = start + Duration::minutes(2);
    assert_eq!(h.events.receiver.try_recv().unwrap().event, EVENT_TRIGGERED);

    // Still violating during the cooldown window: counted, not alerted.
    assert!(feed(&h, &target, 97.0, first_sent + Duration::minutes(5)).await.is_none());
    // Exactly at the boundary is still inside the cooldown.
    assert!(feed(&h, &target, 97.0, first_sent + Duration::minutes(10)).await.is_none());
    assert!(h.events.receiver.try_recv().is_err());

    let repeat = feed(&h, &target, 97.0, first_sent + Duration::minutes(10) + Duration::seconds(1))
        .await
        .expect("violation strictly past the cooldown must re-alert");
    assert_eq!(repeat.measured_value, 97.0);
    assert_eq!(h.events.receiver.try_recv().unwrap().event, EVENT_TRIGGERED);
}

#[tokio::test]
async fn recovery_resets_counter_and_resolves_open_alerts() {
    let mut h = setup().await;
    let target = TargetRef::new(TargetType::Equipment, "7");
    let start = t0();

    for i in 0..3 {
        feed(&h, &target, 95.0, start + Duration::minutes(i)).await;
    }
    h.events.receiver.try_recv().unwrap();

    assert!(feed(&h, &target, 40.0, start + Duration::minutes(3)).await.is_none());

    let ev = h.events.receiver.try_recv().unwrap();
    assert_eq!(ev.event, EVENT_RESOLVED);
    assert_eq!(ev.alert.status, AlertStatus::Resolved);
    assert!(ev.alert.resolved_at.is_some());

    let open = h.store.find_active_alerts(&target, "cpu", "cpu_usage").await.unwrap();
    assert!(open.is_empty());

    // Further in-range samples on an idle tracker stay silent.
    assert!(feed(&h, &target, 41.0, start + Duration::minutes(4)).await.is_none());
    assert!(h.events.receiver.try_recv().is_err(), "no duplicate resolve events");

    // The counter restarted from zero: two violations are not enough.
    feed(&h, &target, 95.0, start + Duration::minutes(5)).await;
    assert!(feed(&h, &target, 95.0, start + Duration::minutes(6)).await.is_none());
}

#[tokio::test]
async fn single_recovery_sample_resets_a_partial_streak() {
    let h = setup().await;
    let target = TargetRef::new(TargetType::Equipment, "7");
    let start = t0();

    feed(&h, &target, 95.0, start).await;
    feed(&h, &target, 95.0, start + Duration::minutes(1)).await;
    feed(&h, &target, 50.0, start + Duration::minutes(2)).await;
    feed(&h, &target, 95.0, start + Duration::minutes(3)).await;
    assert!(
        feed(&h, &target, 95.0, start + Duration::minutes(4)).await.is_none(),
        "streak restarted after the dip"
    );
}

#[tokio::test]
async fn warning_only_threshold_never_escalates() {
    let h = setup().await;
    let target = TargetRef::new(TargetType::Rack, "2");
    let start = t0();

    let mut created = None;
    for i in 0..3 {
        created = h
            .evaluator
            .evaluate(&target, "rack-a2", "temperature", "temperature", 99.0, 28.0, None, Bound::Upper, start + Duration::minutes(i))
            .await
            .unwrap();
    }
    let record = created.expect("third violation alerts");
    assert_eq!(record.level, Severity::Warning);
    assert_eq!(record.threshold_value, 28.0);
}

#[tokio::test]
async fn lower_bound_metric_alerts_and_resolves() {
    let mut h = setup().await;
    let target = TargetRef::new(TargetType::ServerRoom, "12");
    let start = t0();

    for i in 0..3 {
        h.evaluator
            .evaluate(&target, "DC1 Room A", "humidity", "humidity_min", 12.0, 30.0, Some(15.0), Bound::Lower, start + Duration::minutes(i))
            .await
            .unwrap();
    }
    let ev = h.events.receiver.try_recv().unwrap();
    assert_eq!(ev.event, EVENT_TRIGGERED);
    assert_eq!(ev.alert.level, Severity::Critical);
    assert_eq!(ev.alert.threshold_value, 15.0);

    // Back above the floor: auto-resolve applies to room targets too.
    h.evaluator
        .evaluate(&target, "DC1 Room A", "humidity", "humidity_min", 45.0, 30.0, Some(15.0), Bound::Lower, start + Duration::minutes(3))
        .await
        .unwrap();
    assert_eq!(h.events.receiver.try_recv().unwrap().event, EVENT_RESOLVED);
}

#[tokio::test]
async fn concurrent_same_key_evaluations_never_lose_increments() {
    let mut h = setup().await;
    let target = TargetRef::new(TargetType::Equipment, "7");
    let evaluator = Arc::new(h.evaluator);
    let at = t0();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let evaluator = evaluator.clone();
        let target = target.clone();
        tasks.push(tokio::spawn(async move {
            evaluator
                .evaluate(&target, "web-server-01", "cpu", "cpu_usage", 95.0, 70.0, Some(90.0), Bound::Upper, at)
                .await
                .unwrap()
        }));
    }
    let mut alerts = 0;
    for task in tasks {
        if task.await.unwrap().is_some() {
            alerts += 1;
        }
    }

    // Every evaluation's increment survives the interleaving, and the
    // shared sample time keeps all but one emission inside the cooldown.
    let tracker = h
        .store
        .get_or_create_tracker(&target, "cpu", "cpu_usage")
        .await
        .unwrap();
    assert_eq!(tracker.consecutive_violations, 16);
    assert_eq!(alerts, 1);

    assert_eq!(h.events.receiver.try_recv().unwrap().event, EVENT_TRIGGERED);
    assert!(h.events.receiver.try_recv().is_err(), "exactly one event fired");
}

#[tokio::test]
async fn settings_reload_changes_debounce() {
    let h = setup().await;
    h.store.upsert_alert_settings(1, 0).await.unwrap();
    h.settings.reload().await.unwrap();

    let target = TargetRef::new(TargetType::Equipment, "9");
    let record = feed(&h, &target, 95.0, t0()).await;
    assert!(record.is_some(), "threshold of 1 alerts on the first violation");
}

fn sample(target_type: TargetType, target_id: &str, value: Option<f64>) -> MetricSample {
    MetricSample {
        target_type,
        target_id: target_id.to_string(),
        metric_type: "cpu".to_string(),
        value,
        sample_time: Some(Utc::now()),
    }
}

#[tokio::test]
async fn evaluate_sample_skips_before_touching_trackers() {
    let h = setup().await;

    let outcome = h.evaluator.evaluate_sample(&sample(TargetType::Equipment, "7", None)).await;
    assert!(matches!(outcome, SampleOutcome::Skipped(SkipReason::MissingValue)));

    let outcome = h.evaluator.evaluate_sample(&sample(TargetType::Equipment, "7", Some(95.0))).await;
    assert!(matches!(outcome, SampleOutcome::Skipped(SkipReason::UnknownTarget)));

    let target = TargetRef::new(TargetType::Equipment, "7");
    h.store.upsert_target(&target, "web-server-01", false).await.unwrap();
    let outcome = h.evaluator.evaluate_sample(&sample(TargetType::Equipment, "7", Some(95.0))).await;
    assert!(matches!(outcome, SampleOutcome::Skipped(SkipReason::MonitoringDisabled)));

    h.store.upsert_target(&target, "web-server-01", true).await.unwrap();
    let outcome = h.evaluator.evaluate_sample(&sample(TargetType::Equipment, "7", Some(95.0))).await;
    assert!(matches!(outcome, SampleOutcome::Skipped(SkipReason::NoThresholds)));
}

#[tokio::test]
async fn evaluate_sample_runs_every_threshold_for_the_metric() {
    let mut h = setup().await;
    h.store.upsert_alert_settings(1, 0).await.unwrap();
    h.settings.reload().await.unwrap();

    let target = TargetRef::new(TargetType::ServerRoom, "12");
    h.store.upsert_target(&target, "DC1 Room A", true).await.unwrap();
    h.store
        .replace_thresholds(
            &target,
            &[
                rackwatch_storage::ThresholdSpec {
                    metric_type: "humidity".to_string(),
                    metric_name: "humidity_max".to_string(),
                    bound: Bound::Upper,
                    warning_value: Some(70.0),
                    critical_value: Some(85.0),
                },
                rackwatch_storage::ThresholdSpec {
                    metric_type: "humidity".to_string(),
                    metric_name: "humidity_min".to_string(),
                    bound: Bound::Lower,
                    warning_value: Some(30.0),
                    critical_value: Some(15.0),
                },
            ],
        )
        .await
        .unwrap();

    // 10% humidity: fine for the ceiling, critical for the floor.
    let mut s = sample(TargetType::ServerRoom, "12", Some(10.0));
    s.metric_type = "humidity".to_string();
    let outcome = h.evaluator.evaluate_sample(&s).await;
    let SampleOutcome::Evaluated { thresholds, alerts } = outcome else {
        panic!("expected an evaluated outcome");
    };
    assert_eq!(thresholds, 2);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].metric_name, "humidity_min");
    assert_eq!(alerts[0].level, Severity::Critical);

    let ev = h.events.receiver.try_recv().unwrap();
    assert_eq!(ev.event, EVENT_TRIGGERED);
}
