//! Threshold evaluation and alert lifecycle.
//!
//! Incoming metric samples are classified against per-target thresholds
//! and fed through durable per-(target, metric) violation trackers. An
//! alert is created only after a configurable number of consecutive
//! violations, repeat alerts are suppressed for a cooldown period, and
//! a sample back inside the threshold resolves the open alerts for that
//! metric. Every lifecycle change is pushed to live stream subscribers.

pub mod engine;
pub mod settings;
pub mod threshold;

#[cfg(test)]
mod tests;

pub use engine::{AlertEvaluator, SampleOutcome, SkipReason};
pub use settings::{AlertSettings, SettingsProvider};
