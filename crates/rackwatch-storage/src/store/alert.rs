use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::alert_record::{self, Column, Entity};
use crate::error::StorageError;
use crate::store::MonitorStore;
use rackwatch_common::types::{AlertRecord, AlertStatus, Severity, TargetRef, TargetType};

/// Filters for the active-alert listing.
#[derive(Debug, Clone, Default)]
pub struct ActiveAlertFilter {
    pub target_type_eq: Option<TargetType>,
    pub target_id_eq: Option<String>,
    pub level_eq: Option<Severity>,
    pub metric_type_eq: Option<String>,
}

/// Filters for the historical alert listing.
#[derive(Debug, Clone, Default)]
pub struct AlertHistoryFilter {
    pub target_type_eq: Option<TargetType>,
    pub target_id_eq: Option<String>,
    pub level_eq: Option<Severity>,
    pub status_eq: Option<AlertStatus>,
    pub triggered_gte: Option<DateTime<Utc>>,
    pub triggered_lte: Option<DateTime<Utc>>,
}

fn to_record(m: alert_record::Model) -> Result<AlertRecord> {
    let target_type = m
        .target_type
        .parse()
        .map_err(|_| StorageError::InvalidColumnValue {
            column: "target_type",
            value: m.target_type.clone(),
        })?;
    let level = m
        .level
        .parse()
        .map_err(|_| StorageError::InvalidColumnValue {
            column: "level",
            value: m.level.clone(),
        })?;
    let status = m
        .status
        .parse()
        .map_err(|_| StorageError::InvalidColumnValue {
            column: "status",
            value: m.status.clone(),
        })?;
    Ok(AlertRecord {
        id: m.id,
        target_type,
        target_id: m.target_id,
        target_name: m.target_name,
        metric_type: m.metric_type,
        metric_name: m.metric_name,
        level,
        measured_value: m.measured_value,
        threshold_value: m.threshold_value,
        status,
        message: m.message,
        triggered_at: m.triggered_at.with_timezone(&Utc),
        resolved_at: m.resolved_at.map(|t| t.with_timezone(&Utc)),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn records(models: Vec<alert_record::Model>) -> Result<Vec<AlertRecord>> {
    models.into_iter().map(to_record).collect()
}

impl MonitorStore {
    pub async fn insert_alert(&self, record: &AlertRecord) -> Result<AlertRecord> {
        let now = Utc::now().fixed_offset();
        let am = alert_record::ActiveModel {
            id: Set(record.id.clone()),
            target_type: Set(record.target_type.to_string()),
            target_id: Set(record.target_id.clone()),
            target_name: Set(record.target_name.clone()),
            metric_type: Set(record.metric_type.clone()),
            metric_name: Set(record.metric_name.clone()),
            level: Set(record.level.to_string()),
            measured_value: Set(record.measured_value),
            threshold_value: Set(record.threshold_value),
            status: Set(record.status.to_string()),
            message: Set(record.message.clone()),
            triggered_at: Set(record.triggered_at.fixed_offset()),
            resolved_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        to_record(model)
    }

    pub async fn get_alert_by_id(&self, id: &str) -> Result<Option<AlertRecord>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        model.map(to_record).transpose()
    }

    /// Non-resolved alert records for exactly this (target, metric) key.
    /// Never matches across targets or across metric names.
    pub async fn find_active_alerts(
        &self,
        target: &TargetRef,
        metric_type: &str,
        metric_name: &str,
    ) -> Result<Vec<AlertRecord>> {
        let models = Entity::find()
            .filter(Column::TargetType.eq(target.target_type.to_string()))
            .filter(Column::TargetId.eq(target.target_id.as_str()))
            .filter(Column::MetricType.eq(metric_type))
            .filter(Column::MetricName.eq(metric_name))
            .filter(Column::Status.ne(AlertStatus::Resolved.to_string()))
            .order_by(Column::TriggeredAt, Order::Asc)
            .all(self.db())
            .await?;
        records(models)
    }

    /// Transitions a record to resolved. Returns `None` when the record
    /// does not exist or is already resolved (idempotent).
    pub async fn resolve_alert(
        &self,
        id: &str,
        resolved_at: DateTime<Utc>,
    ) -> Result<Option<AlertRecord>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        let Some(m) = model else {
            return Ok(None);
        };
        if m.status == AlertStatus::Resolved.to_string() {
            return Ok(None);
        }
        let now = Utc::now().fixed_offset();
        let mut am: alert_record::ActiveModel = m.into();
        am.status = Set(AlertStatus::Resolved.to_string());
        am.resolved_at = Set(Some(resolved_at.fixed_offset()));
        am.updated_at = Set(now);
        let updated = am.update(self.db()).await?;
        to_record(updated).map(Some)
    }

    /// Marks a triggered record as acknowledged. Returns `None` when the
    /// record does not exist or is not in the triggered state.
    pub async fn acknowledge_alert(&self, id: &str) -> Result<Option<AlertRecord>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        let Some(m) = model else {
            return Ok(None);
        };
        if m.status != AlertStatus::Triggered.to_string() {
            return Ok(None);
        }
        let now = Utc::now().fixed_offset();
        let mut am: alert_record::ActiveModel = m.into();
        am.status = Set(AlertStatus::Acknowledged.to_string());
        am.updated_at = Set(now);
        let updated = am.update(self.db()).await?;
        to_record(updated).map(Some)
    }

    fn apply_active_filter(
        mut q: sea_orm::Select<Entity>,
        filter: &ActiveAlertFilter,
    ) -> sea_orm::Select<Entity> {
        q = q.filter(Column::Status.ne(AlertStatus::Resolved.to_string()));
        if let Some(tt) = filter.target_type_eq {
            q = q.filter(Column::TargetType.eq(tt.to_string()));
        }
        if let Some(ref id) = filter.target_id_eq {
            q = q.filter(Column::TargetId.eq(id.as_str()));
        }
        if let Some(level) = filter.level_eq {
            q = q.filter(Column::Level.eq(level.to_string()));
        }
        if let Some(ref mt) = filter.metric_type_eq {
            q = q.filter(Column::MetricType.eq(mt.as_str()));
        }
        q
    }

    pub async fn list_active_alerts(
        &self,
        filter: &ActiveAlertFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<AlertRecord>> {
        let models = Self::apply_active_filter(Entity::find(), filter)
            .order_by(Column::TriggeredAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        records(models)
    }

    pub async fn count_active_alerts(&self, filter: &ActiveAlertFilter) -> Result<u64> {
        Ok(Self::apply_active_filter(Entity::find(), filter)
            .count(self.db())
            .await?)
    }

    fn apply_history_filter(
        mut q: sea_orm::Select<Entity>,
        filter: &AlertHistoryFilter,
    ) -> sea_orm::Select<Entity> {
        if let Some(tt) = filter.target_type_eq {
            q = q.filter(Column::TargetType.eq(tt.to_string()));
        }
        if let Some(ref id) = filter.target_id_eq {
            q = q.filter(Column::TargetId.eq(id.as_str()));
        }
        if let Some(level) = filter.level_eq {
            q = q.filter(Column::Level.eq(level.to_string()));
        }
        if let Some(status) = filter.status_eq {
            q = q.filter(Column::Status.eq(status.to_string()));
        }
        if let Some(from) = filter.triggered_gte {
            q = q.filter(Column::TriggeredAt.gte(from.fixed_offset()));
        }
        if let Some(to) = filter.triggered_lte {
            q = q.filter(Column::TriggeredAt.lte(to.fixed_offset()));
        }
        q
    }

    pub async fn list_alert_history(
        &self,
        filter: &AlertHistoryFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<AlertRecord>> {
        let models = Self::apply_history_filter(Entity::find(), filter)
            .order_by(Column::TriggeredAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        records(models)
    }

    pub async fn count_alert_history(&self, filter: &AlertHistoryFilter) -> Result<u64> {
        Ok(Self::apply_history_filter(Entity::find(), filter)
            .count(self.db())
            .await?)
    }
}
