use crate::config::{ColorConfig, Thresholds};
use std::fmt;

const CERT_CRITICAL_DAYS: i64 = 30;
const CERT_WARN_DAYS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Ok,
    Warn,
    Critical,
    Unknown,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Warn => write!(f, "WARN"),
            Self::Critical => write!(f, "CRITICAL"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl Severity {
    pub fn color_name<'a>(&self, colors: &'a ColorConfig) -> &'a str {
        match self {
            Self::Ok => &colors.ok,
            Self::Warn => &colors.warn,
            Self::Critical => &colors.critical,
            Self::Unknown => &colors.unknown,
        }
    }
}

/// Higher is worse. Both comparisons are strict, so a value equal to a
/// threshold stays in the lower tier.
pub fn classify(value: f64, thresholds: Thresholds) -> Severity {
    if !value.is_finite() {
        return Severity::Unknown;
    }
    if value > thresholds.critical {
        Severity::Critical
    } else if value > thresholds.warn {
        Severity::Warn
    } else {
        Severity::Ok
    }
}

pub fn classify_reading(value: Option<f64>, thresholds: Thresholds) -> Severity {
    value.map_or(Severity::Unknown, |v| classify(v, thresholds))
}

/// Lower is worse: fewer days remaining before expiry.
pub fn classify_certificate(days_remaining: i64) -> Severity {
    if days_remaining < CERT_CRITICAL_DAYS {
        Severity::Critical
    } else if days_remaining < CERT_WARN_DAYS {
        Severity::Warn
    } else {
        Severity::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Thresholds = Thresholds {
        warn: 70.0,
        critical: 85.0,
    };

    #[test]
    fn boundaries_are_strict() {
        let eps = 1e-9;
        assert_eq!(classify(T.warn, T), Severity::Ok);
        assert_eq!(classify(T.warn + eps, T), Severity::Warn);
        assert_eq!(classify(T.critical, T), Severity::Warn);
        assert_eq!(classify(T.critical + eps, T), Severity::Critical);
    }

    #[test]
    fn boundary_law_holds_for_other_pairs() {
        for (w, c) in [(0.0, 1.0), (50.0, 90.0), (10.5, 10.75), (98.0, 100.0)] {
            let t = Thresholds { warn: w, critical: c };
            assert_eq!(classify(w, t), Severity::Ok);
            assert_eq!(classify(w + 0.01, t), Severity::Warn);
            assert_eq!(classify(c, t), Severity::Warn);
            assert_eq!(classify(c + 0.01, t), Severity::Critical);
        }
    }

    #[test]
    fn nan_and_missing_are_unknown() {
        assert_eq!(classify(f64::NAN, T), Severity::Unknown);
        assert_eq!(classify_reading(None, T), Severity::Unknown);
        assert_eq!(classify_reading(Some(92.0), T), Severity::Critical);
    }

    #[test]
    fn certificate_rule_is_inverted() {
        assert_eq!(classify_certificate(-3), Severity::Critical);
        assert_eq!(classify_certificate(10), Severity::Critical);
        assert_eq!(classify_certificate(29), Severity::Critical);
        assert_eq!(classify_certificate(30), Severity::Warn);
        assert_eq!(classify_certificate(59), Severity::Warn);
        assert_eq!(classify_certificate(60), Severity::Ok);
        assert_eq!(classify_certificate(365), Severity::Ok);
    }

    #[test]
    fn tiers_map_to_configured_colors() {
        let colors = ColorConfig::default();
        assert_eq!(Severity::Ok.color_name(&colors), "green");
        assert_eq!(Severity::Critical.color_name(&colors), "red");
        assert_eq!(Severity::Unknown.to_string(), "UNKNOWN");
    }
}
