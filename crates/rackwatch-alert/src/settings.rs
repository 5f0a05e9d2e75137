//! Engine tuning parameters backed by the `alert_settings` storage row.

use std::sync::Arc;

use anyhow::Result;
use rackwatch_storage::MonitorStore;
use tokio::sync::RwLock;

/// Debounce and cooldown tuning for the alert evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertSettings {
    /// Consecutive violations required before an alert is created.
    pub consecutive_count_threshold: i32,
    /// Minimum gap, in minutes, between repeat alerts for one tracker.
    pub cooldown_minutes: i64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            consecutive_count_threshold: 3,
            cooldown_minutes: 10,
        }
    }
}

/// Cached view over the persisted settings row.
///
/// The engine reads `current()` on every evaluation; `reload()` is
/// called after the settings endpoint writes a new row. Built-in
/// defaults apply while no row exists.
pub struct SettingsProvider {
    store: Arc<MonitorStore>,
    cached: RwLock<AlertSettings>,
}

impl SettingsProvider {
    /// Loads the persisted row (if any) and builds the provider.
    pub async fn load(store: Arc<MonitorStore>) -> Result<Self> {
        let provider = Self {
            store,
            cached: RwLock::new(AlertSettings::default()),
        };
        provider.reload().await?;
        Ok(provider)
    }

    pub async fn current(&self) -> AlertSettings {
        *self.cached.read().await
    }

    /// Re-reads the settings row and replaces the cache.
    pub async fn reload(&self) -> Result<AlertSettings> {
        let settings = match self.store.get_alert_settings().await? {
            Some(row) => AlertSettings {
                consecutive_count_threshold: row.consecutive_count_threshold,
                cooldown_minutes: row.cooldown_minutes,
            },
            None => AlertSettings::default(),
        };
        *self.cached.write().await = settings;
        Ok(settings)
    }
}
