use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Final judgment, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Pass,
    Warning,
    Fail,
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictStatus::Pass => write!(f, "PASS"),
            VerdictStatus::Warning => write!(f, "WARNING"),
            VerdictStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// Which metric the verdict was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictBasis {
    /// Peak CPU temperature (°C).
    Temperature,
    /// Peak CPU usage (%), used when no temperature was ever available.
    UsageFallback,
}

impl VerdictBasis {
    pub fn unit(&self) -> &'static str {
        match self {
            VerdictBasis::Temperature => "°C",
            VerdictBasis::UsageFallback => "%",
        }
    }
}

/// Three-band policy for one metric.
///
/// `value < warning_from` is Pass, `warning_from <= value <= fail_above` is
/// Warning, `value > fail_above` is Fail. Both boundaries belong to Warning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandThresholds {
    pub warning_from: f32,
    pub fail_above: f32,
}

impl BandThresholds {
    pub fn new(warning_from: f32, fail_above: f32) -> Self {
        Self {
            warning_from,
            fail_above,
        }
    }

    pub fn classify(&self, value: f32) -> VerdictStatus {
        if value > self.fail_above {
            VerdictStatus::Fail
        } else if value >= self.warning_from {
            VerdictStatus::Warning
        } else {
            VerdictStatus::Pass
        }
    }

    /// Whether the bands are well-formed (finite and ordered).
    pub fn is_valid(&self) -> bool {
        self.warning_from.is_finite()
            && self.fail_above.is_finite()
            && self.warning_from <= self.fail_above
    }
}

/// Threshold configuration per basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdTable {
    pub temperature: BandThresholds,
    pub usage: BandThresholds,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            temperature: BandThresholds::new(DEFAULT_TEMP_WARNING_C, DEFAULT_TEMP_FAIL_C),
            usage: BandThresholds::new(DEFAULT_USAGE_WARNING_PCT, DEFAULT_USAGE_FAIL_PCT),
        }
    }
}

impl ThresholdTable {
    pub fn for_basis(&self, basis: VerdictBasis) -> BandThresholds {
        match basis {
            VerdictBasis::Temperature => self.temperature,
            VerdictBasis::UsageFallback => self.usage,
        }
    }
}

/// The single, immutable outcome of a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub basis: VerdictBasis,
    /// Peak of the basis metric; None when no reading carried it.
    pub peak_value: Option<f32>,
    pub threshold_used: BandThresholds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_boundaries_belong_to_warning() {
        let t = BandThresholds::new(75.0, 85.0);
        assert_eq!(t.classify(74.9), VerdictStatus::Pass);
        assert_eq!(t.classify(75.0), VerdictStatus::Warning);
        assert_eq!(t.classify(85.0), VerdictStatus::Warning);
        assert_eq!(t.classify(85.1), VerdictStatus::Fail);
    }

    #[test]
    fn status_orders_by_severity() {
        assert!(VerdictStatus::Pass < VerdictStatus::Warning);
        assert!(VerdictStatus::Warning < VerdictStatus::Fail);
    }

    #[test]
    fn band_validity() {
        assert!(BandThresholds::new(50.0, 90.0).is_valid());
        assert!(BandThresholds::new(90.0, 90.0).is_valid());
        assert!(!BandThresholds::new(91.0, 90.0).is_valid());
        assert!(!BandThresholds::new(f32::NAN, 90.0).is_valid());
    }

    #[test]
    fn table_selects_by_basis() {
        let table = ThresholdTable::default();
        assert_eq!(table.for_basis(VerdictBasis::Temperature).warning_from, 75.0);
        assert_eq!(table.for_basis(VerdictBasis::UsageFallback).fail_above, 90.0);
    }
}
