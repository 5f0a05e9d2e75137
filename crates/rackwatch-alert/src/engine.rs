//! Violation tracking and alert lifecycle orchestration.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rackwatch_common::types::{
    AlertRecord, AlertStatus, Bound, MetricSample, Severity, TargetRef,
};
use rackwatch_notify::{AlertBroadcaster, EVENT_RESOLVED, EVENT_TRIGGERED};
use rackwatch_storage::MonitorStore;
use tokio::sync::Mutex;

use crate::settings::SettingsProvider;
use crate::threshold::classify;

/// Why a sample (or one of its thresholds) was not evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The sample carried no measured value.
    MissingValue,
    /// No monitored-target row exists for the sample's target.
    UnknownTarget,
    /// The target exists but monitoring is switched off.
    MonitoringDisabled,
    /// The target has no threshold configured for this metric type.
    NoThresholds,
}

/// Result of feeding one sample through the evaluator.
#[derive(Debug)]
pub enum SampleOutcome {
    /// The sample was checked against `thresholds` configured thresholds
    /// and produced the given alerts (often none).
    Evaluated {
        thresholds: usize,
        alerts: Vec<AlertRecord>,
    },
    /// The sample was dropped before any tracker was touched.
    Skipped(SkipReason),
    /// Evaluation hit a storage failure; logged, sample dropped.
    Failed,
}

/// Stateful evaluator tying thresholds, trackers, alert records and the
/// live fan-out together.
///
/// All tracker reads and writes for one (target, metric) key run under a
/// per-key async mutex, so concurrent samples for the same key cannot
/// lose counter updates. Samples for different keys proceed in parallel.
pub struct AlertEvaluator {
    store: Arc<MonitorStore>,
    settings: Arc<SettingsProvider>,
    broadcaster: Arc<AlertBroadcaster>,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AlertEvaluator {
    pub fn new(
        store: Arc<MonitorStore>,
        settings: Arc<SettingsProvider>,
        broadcaster: Arc<AlertBroadcaster>,
    ) -> Self {
        Self {
            store,
            settings,
            broadcaster,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        locks.entry(key.to_string()).or_default().clone()
    }

    /// Evaluates one measured value against one threshold.
    ///
    /// Returns the alert created by this sample, if any. A sample inside
    /// the threshold resolves any open alerts for the same key and
    /// returns `None`.
    #[allow(clippy::too_many_arguments)]
    pub async fn evaluate(
        &self,
        target: &TargetRef,
        target_name: &str,
        metric_type: &str,
        metric_name: &str,
        measured: f64,
        warning: f64,
        critical: Option<f64>,
        bound: Bound,
        sample_time: DateTime<Utc>,
    ) -> Result<Option<AlertRecord>> {
        let severity = classify(measured, warning, critical, bound);

        let key = format!("{target}:{metric_type}:{metric_name}");
        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        let mut tracker = self
            .store
            .get_or_create_tracker(target, metric_type, metric_name)
            .await?;

        let Some(level) = severity else {
            return self.handle_recovery(target, metric_type, metric_name, tracker).await;
        };

        tracker.consecutive_violations += 1;
        tracker.last_violation_time = sample_time;
        tracker.last_measured_value = Some(measured);

        let settings = self.settings.current().await;
        let debounced = tracker.consecutive_violations >= settings.consecutive_count_threshold;
        let cooled_down = match tracker.last_alert_sent_at {
            None => true,
            Some(sent) => sample_time > sent + Duration::minutes(settings.cooldown_minutes),
        };

        if !(debounced && cooled_down) {
            self.store.save_tracker(&tracker).await?;
            tracing::debug!(
                key = %key,
                violations = tracker.consecutive_violations,
                debounced,
                cooled_down,
                "violation recorded without alert"
            );
            return Ok(None);
        }

        let threshold_value = match (level, critical) {
            (Severity::Critical, Some(c)) => c,
            _ => warning,
        };
        let comparison = match bound {
            Bound::Upper => ">=",
            Bound::Lower => "<",
        };
        let now = Utc::now();
        let record = AlertRecord {
            id: rackwatch_common::id::next_id(),
            target_type: target.target_type,
            target_id: target.target_id.clone(),
            target_name: target_name.to_string(),
            metric_type: metric_type.to_string(),
            metric_name: metric_name.to_string(),
            level,
            measured_value: measured,
            threshold_value,
            status: AlertStatus::Triggered,
            message: format!(
                "{target_name} {metric_name} {level}: measured {measured} {comparison} threshold {threshold_value}"
            ),
            triggered_at: sample_time,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };

        // Persist the alert before the tracker stamp: a crash in between
        // re-sends the alert after restart rather than losing it.
        let record = self.store.insert_alert(&record).await?;
        tracker.last_alert_sent_at = Some(sample_time);
        self.store.save_tracker(&tracker).await?;

        self.broadcaster.publish_alert(EVENT_TRIGGERED, &record);
        tracing::info!(
            key = %key,
            level = %record.level,
            measured,
            threshold = threshold_value,
            "alert triggered"
        );
        Ok(Some(record))
    }

    async fn handle_recovery(
        &self,
        target: &TargetRef,
        metric_type: &str,
        metric_name: &str,
        mut tracker: rackwatch_storage::ViolationTrackerRow,
    ) -> Result<Option<AlertRecord>> {
        if tracker.consecutive_violations == 0 {
            return Ok(None);
        }

        tracker.consecutive_violations = 0;
        self.store.save_tracker(&tracker).await?;

        let open = self
            .store
            .find_active_alerts(target, metric_type, metric_name)
            .await?;
        let resolved_at = Utc::now();
        for record in open {
            if let Some(resolved) = self.store.resolve_alert(&record.id, resolved_at).await? {
                self.broadcaster.publish_alert(EVENT_RESOLVED, &resolved);
                tracing::info!(
                    target = %target,
                    metric_name,
                    alert_id = %resolved.id,
                    "alert auto-resolved"
                );
            }
        }
        Ok(None)
    }

    /// Feeds one ingested sample through every threshold configured for
    /// its (target, metric type). Storage failures are logged and eaten;
    /// ingestion never bubbles an evaluation error to the caller.
    pub async fn evaluate_sample(&self, sample: &MetricSample) -> SampleOutcome {
        match self.evaluate_sample_inner(sample).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(
                    target_type = %sample.target_type,
                    target_id = %sample.target_id,
                    metric_type = %sample.metric_type,
                    error = %err,
                    "sample evaluation failed"
                );
                SampleOutcome::Failed
            }
        }
    }

    async fn evaluate_sample_inner(&self, sample: &MetricSample) -> Result<SampleOutcome> {
        let Some(measured) = sample.value else {
            return Ok(SampleOutcome::Skipped(SkipReason::MissingValue));
        };
        let target = TargetRef::new(sample.target_type, &sample.target_id);

        let Some(target_row) = self.store.get_target(&target).await? else {
            return Ok(SampleOutcome::Skipped(SkipReason::UnknownTarget));
        };
        if !target_row.monitoring_enabled {
            return Ok(SampleOutcome::Skipped(SkipReason::MonitoringDisabled));
        }

        let thresholds = self
            .store
            .list_thresholds_for_metric(&target, &sample.metric_type)
            .await?;
        if thresholds.is_empty() {
            return Ok(SampleOutcome::Skipped(SkipReason::NoThresholds));
        }

        let sample_time = sample.sample_time.unwrap_or_else(Utc::now);
        let mut alerts = Vec::new();
        let mut evaluated = 0;
        for threshold in &thresholds {
            let Some(warning) = threshold.warning_value else {
                continue;
            };
            evaluated += 1;
            let created = self
                .evaluate(
                    &target,
                    &target_row.name,
                    &sample.metric_type,
                    &threshold.metric_name,
                    measured,
                    warning,
                    threshold.critical_value,
                    threshold.bound,
                    sample_time,
                )
                .await?;
            alerts.extend(created);
        }
        if evaluated == 0 {
            return Ok(SampleOutcome::Skipped(SkipReason::NoThresholds));
        }
        Ok(SampleOutcome::Evaluated {
            thresholds: evaluated,
            alerts,
        })
    }
}
