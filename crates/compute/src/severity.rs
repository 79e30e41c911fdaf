use sentinel_core::Severity;

/// Multiplier over the anomaly threshold above which an anomaly is Major.
pub const MAJOR_FACTOR: f64 = 1.5;
/// Multiplier over the anomaly threshold above which an anomaly is Critical.
pub const CRITICAL_FACTOR: f64 = 2.0;

/// Map a reconstruction error to a severity tier.
///
/// Both band comparisons are strict: an error of exactly `2 * threshold` is
/// Major and exactly `1.5 * threshold` is Minor. Only meaningful for records
/// already classified as anomalies.
pub fn classify_severity(error: f64, threshold: f64) -> Severity {
    if error > threshold * CRITICAL_FACTOR {
        Severity::Critical
    } else if error > threshold * MAJOR_FACTOR {
        Severity::Major
    } else {
        Severity::Minor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: f64 = 20.0;

    #[test]
    fn band_boundaries_are_strict() {
        assert_eq!(classify_severity(30.0, T), Severity::Minor);
        assert_eq!(classify_severity(30.0 + 1e-9, T), Severity::Major);
        assert_eq!(classify_severity(40.0, T), Severity::Major);
        assert_eq!(classify_severity(40.0 + 1e-9, T), Severity::Critical);
    }

    #[test]
    fn just_over_threshold_is_minor() {
        assert_eq!(classify_severity(20.5, T), Severity::Minor);
    }

    #[test]
    fn large_errors_are_critical() {
        assert_eq!(classify_severity(10_000.0, T), Severity::Critical);
    }

    #[test]
    fn bands_scale_with_threshold() {
        assert_eq!(classify_severity(16.0, 10.0), Severity::Major);
        assert_eq!(classify_severity(21.0, 10.0), Severity::Critical);
        assert_eq!(classify_severity(21.0, 20.0), Severity::Minor);
    }
}
