use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};

use crate::entities::violation_tracker::{self, Column, Entity};
use crate::error::StorageError;
use crate::store::MonitorStore;
use rackwatch_common::types::{TargetRef, TargetType};

/// Per-(target, metric) violation counter state (`violation_trackers`
/// table). One row per monitored metric stream, created lazily on first
/// evaluation and never deleted.
#[derive(Debug, Clone)]
pub struct ViolationTrackerRow {
    pub id: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub metric_type: String,
    pub metric_name: String,
    pub consecutive_violations: i32,
    pub last_violation_time: DateTime<Utc>,
    pub last_measured_value: Option<f64>,
    pub last_alert_sent_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

fn to_row(m: violation_tracker::Model) -> Result<ViolationTrackerRow> {
    let target_type = m
        .target_type
        .parse()
        .map_err(|_| StorageError::InvalidColumnValue {
            column: "target_type",
            value: m.target_type.clone(),
        })?;
    Ok(ViolationTrackerRow {
        id: m.id,
        target_type,
        target_id: m.target_id,
        metric_type: m.metric_type,
        metric_name: m.metric_name,
        consecutive_violations: m.consecutive_violations,
        last_violation_time: m.last_violation_time.with_timezone(&Utc),
        last_measured_value: m.last_measured_value,
        last_alert_sent_at: m.last_alert_sent_at.map(|t| t.with_timezone(&Utc)),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

impl MonitorStore {
    async fn find_tracker(
        &self,
        target: &TargetRef,
        metric_type: &str,
        metric_name: &str,
    ) -> Result<Option<violation_tracker::Model>> {
        Ok(Entity::find()
            .filter(Column::TargetType.eq(target.target_type.to_string()))
            .filter(Column::TargetId.eq(target.target_id.as_str()))
            .filter(Column::MetricType.eq(metric_type))
            .filter(Column::MetricName.eq(metric_name))
            .one(self.db())
            .await?)
    }

    /// Loads the tracker for the given key, creating it on first use.
    ///
    /// Creation races are settled by the unique index on the key: if the
    /// insert loses, the winning row is read back so concurrent first
    /// evaluations of one key never yield duplicate trackers.
    pub async fn get_or_create_tracker(
        &self,
        target: &TargetRef,
        metric_type: &str,
        metric_name: &str,
    ) -> Result<ViolationTrackerRow> {
        if let Some(m) = self.find_tracker(target, metric_type, metric_name).await? {
            return to_row(m);
        }

        let now = Utc::now().fixed_offset();
        let am = violation_tracker::ActiveModel {
            id: Set(rackwatch_common::id::next_id()),
            target_type: Set(target.target_type.to_string()),
            target_id: Set(target.target_id.clone()),
            metric_type: Set(metric_type.to_string()),
            metric_name: Set(metric_name.to_string()),
            consecutive_violations: Set(0),
            last_violation_time: Set(now),
            last_measured_value: Set(None),
            last_alert_sent_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        match am.insert(self.db()).await {
            Ok(m) => to_row(m),
            Err(_) => {
                // UNIQUE violation: another evaluation inserted first.
                match self.find_tracker(target, metric_type, metric_name).await? {
                    Some(m) => to_row(m),
                    None => Err(StorageError::InsertReadback {
                        entity: "violation_tracker",
                    }
                    .into()),
                }
            }
        }
    }

    /// Persists the mutable tracker fields (counter, timestamps, value).
    pub async fn save_tracker(&self, row: &ViolationTrackerRow) -> Result<ViolationTrackerRow> {
        let model = Entity::find_by_id(&row.id).one(self.db()).await?;
        let Some(m) = model else {
            return Err(StorageError::NotFound {
                entity: "violation_tracker",
                id: row.id.clone(),
            }
            .into());
        };
        let now = Utc::now().fixed_offset();
        let mut am: violation_tracker::ActiveModel = m.into();
        am.consecutive_violations = Set(row.consecutive_violations);
        am.last_violation_time = Set(row.last_violation_time.fixed_offset());
        am.last_measured_value = Set(row.last_measured_value);
        am.last_alert_sent_at = Set(row.last_alert_sent_at.map(|t| t.fixed_offset()));
        am.updated_at = Set(now);
        let updated = am.update(self.db()).await?;
        to_row(updated)
    }
}
