use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of monitored entity an alert or metric sample refers to.
///
/// # Examples
///
/// ```
/// use rackwatch_common::types::TargetType;
///
/// let tt: TargetType = "server_room".parse().unwrap();
/// assert_eq!(tt, TargetType::ServerRoom);
/// assert_eq!(tt.to_string(), "server_room");
/// assert_eq!(tt.topic_prefix(), "serverroom");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Equipment,
    Rack,
    ServerRoom,
    DataCenter,
}

impl TargetType {
    /// Prefix used when deriving the push topic for a target
    /// (e.g. `equipment-7`, `serverroom-3`).
    pub fn topic_prefix(&self) -> &'static str {
        match self {
            TargetType::Equipment => "equipment",
            TargetType::Rack => "rack",
            TargetType::ServerRoom => "serverroom",
            TargetType::DataCenter => "datacenter",
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetType::Equipment => write!(f, "equipment"),
            TargetType::Rack => write!(f, "rack"),
            TargetType::ServerRoom => write!(f, "server_room"),
            TargetType::DataCenter => write!(f, "data_center"),
        }
    }
}

impl std::str::FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "equipment" => Ok(TargetType::Equipment),
            "rack" => Ok(TargetType::Rack),
            "server_room" | "serverroom" => Ok(TargetType::ServerRoom),
            "data_center" | "datacenter" => Ok(TargetType::DataCenter),
            _ => Err(format!("unknown target type: {s}")),
        }
    }
}

/// A monitored target carried as one value object instead of per-type
/// foreign keys.
///
/// # Examples
///
/// ```
/// use rackwatch_common::types::{TargetRef, TargetType};
///
/// let target = TargetRef::new(TargetType::Equipment, "7");
/// assert_eq!(target.topic(), "equipment-7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TargetRef {
    pub target_type: TargetType,
    pub target_id: String,
}

impl TargetRef {
    pub fn new(target_type: TargetType, target_id: impl Into<String>) -> Self {
        Self {
            target_type,
            target_id: target_id.into(),
        }
    }

    /// The target-scoped push topic this target's alerts are published to.
    pub fn topic(&self) -> String {
        format!("{}-{}", self.target_type.topic_prefix(), self.target_id)
    }
}

impl std::fmt::Display for TargetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.target_type, self.target_id)
    }
}

/// Alert severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use rackwatch_common::types::Severity;
///
/// let sev: Severity = "critical".parse().unwrap();
/// assert_eq!(sev, Severity::Critical);
/// assert!(Severity::Critical > Severity::Warning);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Lifecycle status of a persisted alert record. "Active" means any
/// status other than `Resolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Triggered,
    Acknowledged,
    Resolved,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Triggered => write!(f, "triggered"),
            AlertStatus::Acknowledged => write!(f, "acknowledged"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl std::str::FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "triggered" => Ok(AlertStatus::Triggered),
            "acknowledged" => Ok(AlertStatus::Acknowledged),
            "resolved" => Ok(AlertStatus::Resolved),
            _ => Err(format!("unknown alert status: {s}")),
        }
    }
}

/// Which side of a threshold counts as a violation.
///
/// `Upper` is the usual ceiling (`measured >= threshold` violates);
/// `Lower` is a floor (`measured < threshold` violates), used for
/// thresholds such as `humidity_min`. One target may carry both a floor
/// and a ceiling for the same metric type, evaluated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Bound {
    Upper,
    Lower,
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bound::Upper => write!(f, "upper"),
            Bound::Lower => write!(f, "lower"),
        }
    }
}

impl std::str::FromStr for Bound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "upper" => Ok(Bound::Upper),
            "lower" => Ok(Bound::Lower),
            _ => Err(format!("unknown bound: {s}")),
        }
    }
}

/// One incoming metric sample, as ingested from a collector.
///
/// Mapping raw metric fields to the evaluated value (e.g. "100 − idle%"
/// for CPU usage) is the producer's responsibility. A sample without a
/// value is skipped by the engine, not rejected.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricSample {
    pub target_type: TargetType,
    pub target_id: String,
    /// Metric type key (e.g. `cpu`, `memory`, `disk`, `temperature`,
    /// `humidity`).
    pub metric_type: String,
    pub value: Option<f64>,
    /// Defaults to the server's receive time when absent.
    pub sample_time: Option<DateTime<Utc>>,
}

/// A persisted alert occurrence.
///
/// This doubles as the push snapshot delivered to live subscribers; it
/// carries enough to render without a follow-up query.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AlertRecord {
    pub id: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub target_name: String,
    pub metric_type: String,
    /// Disambiguates multiple thresholds of one metric type on one
    /// target (e.g. `humidity_min` vs `humidity_max`).
    pub metric_name: String,
    pub level: Severity,
    pub measured_value: f64,
    /// The threshold value actually breached.
    pub threshold_value: f64,
    pub status: AlertStatus,
    pub message: String,
    pub triggered_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlertRecord {
    pub fn target(&self) -> TargetRef {
        TargetRef::new(self.target_type, self.target_id.clone())
    }

    pub fn is_active(&self) -> bool {
        self.status != AlertStatus::Resolved
    }
}
