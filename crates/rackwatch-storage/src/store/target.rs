use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::{metric_threshold, monitored_target};
use crate::error::StorageError;
use crate::store::MonitorStore;
use rackwatch_common::types::{Bound, TargetRef, TargetType};

/// A monitored entity row (`monitored_targets` table). Evaluation is
/// skipped entirely for rows with `monitoring_enabled = false`.
#[derive(Debug, Clone)]
pub struct MonitoredTargetRow {
    pub id: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub name: String,
    pub monitoring_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A configured threshold row (`metric_thresholds` table).
#[derive(Debug, Clone)]
pub struct MetricThresholdRow {
    pub id: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub metric_type: String,
    pub metric_name: String,
    pub bound: Bound,
    pub warning_value: Option<f64>,
    pub critical_value: Option<f64>,
}

/// Threshold input used when replacing a target's configuration.
#[derive(Debug, Clone)]
pub struct ThresholdSpec {
    pub metric_type: String,
    pub metric_name: String,
    pub bound: Bound,
    pub warning_value: Option<f64>,
    pub critical_value: Option<f64>,
}

fn to_target_row(m: monitored_target::Model) -> Result<MonitoredTargetRow> {
    let target_type = m
        .target_type
        .parse()
        .map_err(|_| StorageError::InvalidColumnValue {
            column: "target_type",
            value: m.target_type.clone(),
        })?;
    Ok(MonitoredTargetRow {
        id: m.id,
        target_type,
        target_id: m.target_id,
        name: m.name,
        monitoring_enabled: m.monitoring_enabled,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn to_threshold_row(m: metric_threshold::Model) -> Result<MetricThresholdRow> {
    let target_type = m
        .target_type
        .parse()
        .map_err(|_| StorageError::InvalidColumnValue {
            column: "target_type",
            value: m.target_type.clone(),
        })?;
    let bound = m
        .bound
        .parse()
        .map_err(|_| StorageError::InvalidColumnValue {
            column: "bound",
            value: m.bound.clone(),
        })?;
    Ok(MetricThresholdRow {
        id: m.id,
        target_type,
        target_id: m.target_id,
        metric_type: m.metric_type,
        metric_name: m.metric_name,
        bound,
        warning_value: m.warning_value,
        critical_value: m.critical_value,
    })
}

impl MonitorStore {
    pub async fn get_target(&self, target: &TargetRef) -> Result<Option<MonitoredTargetRow>> {
        let model = monitored_target::Entity::find()
            .filter(monitored_target::Column::TargetType.eq(target.target_type.to_string()))
            .filter(monitored_target::Column::TargetId.eq(target.target_id.as_str()))
            .one(self.db())
            .await?;
        model.map(to_target_row).transpose()
    }

    /// Registers a target, updating name/enabled flag if it exists.
    pub async fn upsert_target(
        &self,
        target: &TargetRef,
        name: &str,
        monitoring_enabled: bool,
    ) -> Result<MonitoredTargetRow> {
        let now = Utc::now().fixed_offset();
        let existing = monitored_target::Entity::find()
            .filter(monitored_target::Column::TargetType.eq(target.target_type.to_string()))
            .filter(monitored_target::Column::TargetId.eq(target.target_id.as_str()))
            .one(self.db())
            .await?;
        match existing {
            Some(m) => {
                let mut am: monitored_target::ActiveModel = m.into();
                am.name = Set(name.to_string());
                am.monitoring_enabled = Set(monitoring_enabled);
                am.updated_at = Set(now);
                to_target_row(am.update(self.db()).await?)
            }
            None => {
                let am = monitored_target::ActiveModel {
                    id: Set(rackwatch_common::id::next_id()),
                    target_type: Set(target.target_type.to_string()),
                    target_id: Set(target.target_id.clone()),
                    name: Set(name.to_string()),
                    monitoring_enabled: Set(monitoring_enabled),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                to_target_row(am.insert(self.db()).await?)
            }
        }
    }

    pub async fn list_targets(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MonitoredTargetRow>> {
        let models = monitored_target::Entity::find()
            .order_by(monitored_target::Column::CreatedAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        models.into_iter().map(to_target_row).collect()
    }

    pub async fn count_targets(&self) -> Result<u64> {
        Ok(monitored_target::Entity::find().count(self.db()).await?)
    }

    /// Replaces the full threshold set for one target.
    pub async fn replace_thresholds(
        &self,
        target: &TargetRef,
        thresholds: &[ThresholdSpec],
    ) -> Result<Vec<MetricThresholdRow>> {
        metric_threshold::Entity::delete_many()
            .filter(metric_threshold::Column::TargetType.eq(target.target_type.to_string()))
            .filter(metric_threshold::Column::TargetId.eq(target.target_id.as_str()))
            .exec(self.db())
            .await?;

        let now = Utc::now().fixed_offset();
        let mut rows = Vec::with_capacity(thresholds.len());
        for spec in thresholds {
            let am = metric_threshold::ActiveModel {
                id: Set(rackwatch_common::id::next_id()),
                target_type: Set(target.target_type.to_string()),
                target_id: Set(target.target_id.clone()),
                metric_type: Set(spec.metric_type.clone()),
                metric_name: Set(spec.metric_name.clone()),
                bound: Set(spec.bound.to_string()),
                warning_value: Set(spec.warning_value),
                critical_value: Set(spec.critical_value),
                created_at: Set(now),
                updated_at: Set(now),
            };
            rows.push(to_threshold_row(am.insert(self.db()).await?)?);
        }
        Ok(rows)
    }

    pub async fn list_thresholds(&self, target: &TargetRef) -> Result<Vec<MetricThresholdRow>> {
        let models = metric_threshold::Entity::find()
            .filter(metric_threshold::Column::TargetType.eq(target.target_type.to_string()))
            .filter(metric_threshold::Column::TargetId.eq(target.target_id.as_str()))
            .order_by(metric_threshold::Column::MetricName, Order::Asc)
            .all(self.db())
            .await?;
        models.into_iter().map(to_threshold_row).collect()
    }

    /// Thresholds configured for one metric type on one target. There
    /// may be several (e.g. `humidity_min` and `humidity_max`).
    pub async fn list_thresholds_for_metric(
        &self,
        target: &TargetRef,
        metric_type: &str,
    ) -> Result<Vec<MetricThresholdRow>> {
        let models = metric_threshold::Entity::find()
            .filter(metric_threshold::Column::TargetType.eq(target.target_type.to_string()))
            .filter(metric_threshold::Column::TargetId.eq(target.target_id.as_str()))
            .filter(metric_threshold::Column::MetricType.eq(metric_type))
            .order_by(metric_threshold::Column::MetricName, Order::Asc)
            .all(self.db())
            .await?;
        models.into_iter().map(to_threshold_row).collect()
    }
}
