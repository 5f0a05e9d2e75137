use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};

use crate::entities::alert_settings::{self, Entity};
use crate::store::MonitorStore;

/// The singleton alert-settings row. Absence is a valid state: the
/// engine falls back to built-in defaults.
#[derive(Debug, Clone)]
pub struct AlertSettingsRow {
    pub id: String,
    pub consecutive_count_threshold: i32,
    pub cooldown_minutes: i64,
    pub updated_at: DateTime<Utc>,
}

fn to_row(m: alert_settings::Model) -> AlertSettingsRow {
    AlertSettingsRow {
        id: m.id,
        consecutive_count_threshold: m.consecutive_count_threshold,
        cooldown_minutes: m.cooldown_minutes,
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl MonitorStore {
    pub async fn get_alert_settings(&self) -> Result<Option<AlertSettingsRow>> {
        let model = Entity::find().one(self.db()).await?;
        Ok(model.map(to_row))
    }

    /// Creates or updates the settings row in place.
    pub async fn upsert_alert_settings(
        &self,
        consecutive_count_threshold: i32,
        cooldown_minutes: i64,
    ) -> Result<AlertSettingsRow> {
        let now = Utc::now().fixed_offset();
        match Entity::find().one(self.db()).await? {
            Some(m) => {
                let mut am: alert_settings::ActiveModel = m.into();
                am.consecutive_count_threshold = Set(consecutive_count_threshold);
                am.cooldown_minutes = Set(cooldown_minutes);
                am.updated_at = Set(now);
                Ok(to_row(am.update(self.db()).await?))
            }
            None => {
                let am = alert_settings::ActiveModel {
                    id: Set(rackwatch_common::id::next_id()),
                    consecutive_count_threshold: Set(consecutive_count_threshold),
                    cooldown_minutes: Set(cooldown_minutes),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                Ok(to_row(am.insert(self.db()).await?))
            }
        }
    }
}
