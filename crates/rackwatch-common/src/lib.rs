//! Shared domain types for the rackwatch monitoring platform.
//!
//! Everything that crosses a crate boundary lives here: the monitored
//! target reference, alert severity/status enums, metric sample shapes,
//! and the [`types::AlertRecord`] snapshot pushed to live subscribers.

pub mod id;
pub mod types;
