use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

const UP_SQL: &str = "
PRAGMA journal_mode=WAL;

CREATE TABLE IF NOT EXISTS monitored_targets (
    id TEXT PRIMARY KEY NOT NULL,
    target_type TEXT NOT NULL,
    target_id TEXT NOT NULL,
    name TEXT NOT NULL,
    monitoring_enabled INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_targets_key
    ON monitored_targets(target_type, target_id);

CREATE TABLE IF NOT EXISTS metric_thresholds (
    id TEXT PRIMARY KEY NOT NULL,
    target_type TEXT NOT NULL,
    target_id TEXT NOT NULL,
    metric_type TEXT NOT NULL,
    metric_name TEXT NOT NULL,
    bound TEXT NOT NULL DEFAULT 'upper',
    warning_value REAL,
    critical_value REAL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_thresholds_key
    ON metric_thresholds(target_type, target_id, metric_type, metric_name);

CREATE TABLE IF NOT EXISTS violation_trackers (
    id TEXT PRIMARY KEY NOT NULL,
    target_type TEXT NOT NULL,
    target_id TEXT NOT NULL,
    metric_type TEXT NOT NULL,
    metric_name TEXT NOT NULL,
    consecutive_violations INTEGER NOT NULL DEFAULT 0,
    last_violation_time TEXT NOT NULL,
    last_measured_value REAL,
    last_alert_sent_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_trackers_key
    ON violation_trackers(target_type, target_id, metric_type, metric_name);

CREATE TABLE IF NOT EXISTS alert_records (
    id TEXT PRIMARY KEY NOT NULL,
    target_type TEXT NOT NULL,
    target_id TEXT NOT NULL,
    target_name TEXT NOT NULL,
    metric_type TEXT NOT NULL,
    metric_name TEXT NOT NULL,
    level TEXT NOT NULL,
    measured_value REAL NOT NULL,
    threshold_value REAL NOT NULL,
    status TEXT NOT NULL DEFAULT 'triggered',
    message TEXT NOT NULL,
    triggered_at TEXT NOT NULL,
    resolved_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alerts_key
    ON alert_records(target_type, target_id, metric_type, metric_name, status);
CREATE INDEX IF NOT EXISTS idx_alerts_triggered_at
    ON alert_records(triggered_at);
CREATE INDEX IF NOT EXISTS idx_alerts_status
    ON alert_records(status);

CREATE TABLE IF NOT EXISTS alert_settings (
    id TEXT PRIMARY KEY NOT NULL,
    consecutive_count_threshold INTEGER NOT NULL,
    cooldown_minutes INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS alert_settings;
DROP TABLE IF EXISTS alert_records;
DROP TABLE IF EXISTS violation_trackers;
DROP TABLE IF EXISTS metric_thresholds;
DROP TABLE IF EXISTS monitored_targets;
";
