pub mod alert_record;
pub mod alert_settings;
pub mod metric_threshold;
pub mod monitored_target;
pub mod violation_tracker;
