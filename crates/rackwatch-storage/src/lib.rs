//! Persistence layer for the alert engine's own state.
//!
//! [`store::MonitorStore`] wraps a single SeaORM/SQLite connection and
//! exposes per-domain store modules: monitored targets and their
//! thresholds, per-(target, metric) violation trackers, alert records,
//! and the singleton alert settings row. Raw metric persistence is a
//! separate collaborator and is not handled here.

pub mod entities;
pub mod error;
pub mod store;

#[cfg(test)]
mod tests;

pub use store::{
    ActiveAlertFilter, AlertHistoryFilter, AlertSettingsRow, MetricThresholdRow, MonitorStore,
    MonitoredTargetRow, ThresholdSpec, ViolationTrackerRow,
};
