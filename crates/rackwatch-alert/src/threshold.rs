//! Threshold classification.

use rackwatch_common::types::{Bound, Severity};

/// Classifies a measured value against a warning threshold and an
/// optional critical threshold.
///
/// With [`Bound::Upper`] a value at or above a threshold violates it
/// (ceiling, e.g. `cpu_usage`); with [`Bound::Lower`] a value strictly
/// below a threshold violates it (floor, e.g. `humidity_min`). The
/// critical threshold wins when both are crossed.
///
/// # Examples
///
/// ```rust
/// use rackwatch_alert::threshold::classify;
/// use rackwatch_common::types::{Bound, Severity};
///
/// assert_eq!(classify(95.0, 70.0, Some(90.0), Bound::Upper), Some(Severity::Critical));
/// assert_eq!(classify(75.0, 70.0, Some(90.0), Bound::Upper), Some(Severity::Warning));
/// assert_eq!(classify(50.0, 70.0, Some(90.0), Bound::Upper), None);
/// assert_eq!(classify(12.0, 30.0, Some(15.0), Bound::Lower), Some(Severity::Critical));
/// ```
pub fn classify(
    measured: f64,
    warning: f64,
    critical: Option<f64>,
    bound: Bound,
) -> Option<Severity> {
    match bound {
        Bound::Upper => {
            if critical.is_some_and(|c| measured >= c) {
                Some(Severity::Critical)
            } else if measured >= warning {
                Some(Severity::Warning)
            } else {
                None
            }
        }
        Bound::Lower => {
            if critical.is_some_and(|c| measured < c) {
                Some(Severity::Critical)
            } else if measured < warning {
                Some(Severity::Warning)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_bound_boundaries_are_inclusive() {
        assert_eq!(classify(69.9, 70.0, Some(90.0), Bound::Upper), None);
        assert_eq!(
            classify(70.0, 70.0, Some(90.0), Bound::Upper),
            Some(Severity::Warning)
        );
        assert_eq!(
            classify(89.9, 70.0, Some(90.0), Bound::Upper),
            Some(Severity::Warning)
        );
        assert_eq!(
            classify(90.0, 70.0, Some(90.0), Bound::Upper),
            Some(Severity::Critical)
        );
    }

    #[test]
    fn lower_bound_boundaries_are_exclusive() {
        assert_eq!(classify(30.0, 30.0, Some(15.0), Bound::Lower), None);
        assert_eq!(
            classify(29.9, 30.0, Some(15.0), Bound::Lower),
            Some(Severity::Warning)
        );
        assert_eq!(
            classify(15.0, 30.0, Some(15.0), Bound::Lower),
            Some(Severity::Warning)
        );
        assert_eq!(
            classify(14.9, 30.0, Some(15.0), Bound::Lower),
            Some(Severity::Critical)
        );
    }

    #[test]
    fn missing_critical_caps_at_warning() {
        assert_eq!(
            classify(99.9, 70.0, None, Bound::Upper),
            Some(Severity::Warning)
        );
        assert_eq!(classify(0.1, 30.0, None, Bound::Lower), Some(Severity::Warning));
    }
}
