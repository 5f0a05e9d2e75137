use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use std::path::Path;

pub mod alert;
pub mod settings;
pub mod target;
pub mod tracker;

// ---- Row types re-exported from the sub-modules ----
pub use alert::{ActiveAlertFilter, AlertHistoryFilter};
pub use settings::AlertSettingsRow;
pub use target::{MetricThresholdRow, MonitoredTargetRow, ThresholdSpec};
pub use tracker::ViolationTrackerRow;

/// Unified access layer for the engine's management database.
///
/// All methods are `async fn` over SeaORM + SQLite. The store is shared
/// between the evaluation engine (trackers, alert records) and the REST
/// API (targets, thresholds, settings, alert queries), so it must stay
/// `Send + Sync`; SeaORM's `DatabaseConnection` already is.
pub struct MonitorStore {
    pub(crate) db: DatabaseConnection,
}

impl MonitorStore {
    /// Opens (creating if needed) the SQLite database at `path` and runs
    /// pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let db = Database::connect(&url).await?;
        Migrator::up(&db, None).await?;
        Ok(Self { db })
    }

    /// In-memory store for tests.
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::connect("sqlite::memory:").await?;
        Migrator::up(&db, None).await?;
        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
