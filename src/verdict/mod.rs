//! Threshold scoring of a completed session.
//!
//! The evaluator is a pure function of the reading sequence and the
//! threshold table: no clock, no I/O, safe to re-run.

use crate::models::{Reading, ThresholdTable, Verdict, VerdictBasis, VerdictStatus};

/// Peak of an optional metric across readings, ignoring absent values.
fn peak(readings: &[Reading], metric: impl Fn(&Reading) -> Option<f32>) -> Option<f32> {
    readings
        .iter()
        .filter_map(metric)
        .fold(None, |acc: Option<f32>, v| Some(acc.map_or(v, |a| a.max(v))))
}

/// Produce the verdict for a finished reading sequence.
///
/// Temperature is the basis whenever at least one reading carries a CPU
/// temperature; otherwise peak CPU usage is scored against the fallback band.
/// With no usage data either there is nothing to judge and the result is a
/// Pass without a peak value.
pub fn evaluate(readings: &[Reading], thresholds: &ThresholdTable) -> Verdict {
    if let Some(peak_temp) = peak(readings, Reading::cpu_temp_c) {
        let band = thresholds.for_basis(VerdictBasis::Temperature);
        return Verdict {
            status: band.classify(peak_temp),
            basis: VerdictBasis::Temperature,
            peak_value: Some(peak_temp),
            threshold_used: band,
        };
    }

    let band = thresholds.for_basis(VerdictBasis::UsageFallback);
    let peak_usage = peak(readings, Reading::cpu_usage_percent);
    Verdict {
        status: peak_usage.map_or(VerdictStatus::Pass, |p| band.classify(p)),
        basis: VerdictBasis::UsageFallback,
        peak_value: peak_usage,
        threshold_used: band,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Local;

    use super::*;
    use crate::models::{BandThresholds, Phase, SensorSample};

    fn reading(i: u64, cpu_usage: Option<f32>, cpu_temp: Option<f32>) -> Reading {
        Reading::new(
            Local::now(),
            Duration::from_secs(i * 5),
            Phase::Stress,
            SensorSample {
                cpu_usage_percent: cpu_usage,
                cpu_temp_c: cpu_temp,
                ram_usage_percent: Some(40.0),
                disk_usage_percent: Some(55.0),
                ssd_temp_c: None,
            },
        )
    }

    fn fallback_table() -> ThresholdTable {
        ThresholdTable {
            usage: BandThresholds::new(50.0, 90.0),
            ..ThresholdTable::default()
        }
    }

    #[test]
    fn exactly_75_is_warning_on_temperature() {
        let readings = vec![reading(0, Some(10.0), Some(75.0))];
        let v = evaluate(&readings, &ThresholdTable::default());
        assert_eq!(v.status, VerdictStatus::Warning);
        assert_eq!(v.basis, VerdictBasis::Temperature);
        assert_eq!(v.peak_value, Some(75.0));
    }

    #[test]
    fn temperature_bands() {
        let table = ThresholdTable::default();
        let pass = evaluate(&[reading(0, None, Some(74.9))], &table);
        let warn = evaluate(&[reading(0, None, Some(85.0))], &table);
        let fail = evaluate(&[reading(0, None, Some(85.1))], &table);
        assert_eq!(pass.status, VerdictStatus::Pass);
        assert_eq!(warn.status, VerdictStatus::Warning);
        assert_eq!(fail.status, VerdictStatus::Fail);
    }

    #[test]
    fn peak_ignores_absent_temperatures() {
        let readings = vec![
            reading(0, Some(5.0), None),
            reading(1, Some(95.0), Some(62.0)),
            reading(2, Some(97.0), None),
            reading(3, Some(20.0), Some(70.5)),
        ];
        let v = evaluate(&readings, &ThresholdTable::default());
        assert_eq!(v.basis, VerdictBasis::Temperature);
        assert_eq!(v.peak_value, Some(70.5));
        assert_eq!(v.status, VerdictStatus::Pass);
    }

    #[test]
    fn usage_fallback_upper_bound_is_warning() {
        let readings = vec![
            reading(0, Some(12.0), None),
            reading(1, Some(90.0), None),
            reading(2, Some(48.0), None),
        ];
        let v = evaluate(&readings, &fallback_table());
        assert_eq!(v.status, VerdictStatus::Warning);
        assert_eq!(v.basis, VerdictBasis::UsageFallback);
        assert_eq!(v.peak_value, Some(90.0));
        assert_eq!(v.threshold_used, BandThresholds::new(50.0, 90.0));
    }

    #[test]
    fn usage_fallback_fail_and_pass() {
        let fail = evaluate(&[reading(0, Some(90.1), None)], &fallback_table());
        let pass = evaluate(&[reading(0, Some(49.9), None)], &fallback_table());
        assert_eq!(fail.status, VerdictStatus::Fail);
        assert_eq!(pass.status, VerdictStatus::Pass);
    }

    #[test]
    fn no_data_passes_without_peak() {
        let readings = vec![reading(0, None, None), reading(1, None, None)];
        let v = evaluate(&readings, &ThresholdTable::default());
        assert_eq!(v.status, VerdictStatus::Pass);
        assert_eq!(v.basis, VerdictBasis::UsageFallback);
        assert_eq!(v.peak_value, None);

        let empty = evaluate(&[], &ThresholdTable::default());
        assert_eq!(empty, v);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let readings: Vec<Reading> = (0..20)
            .map(|i| reading(i, Some(i as f32 * 4.0), Some(50.0 + i as f32)))
            .collect();
        let table = ThresholdTable::default();
        let first = evaluate(&readings, &table);
        for _ in 0..5 {
            assert_eq!(evaluate(&readings, &table), first);
        }
        assert_eq!(first.peak_value, Some(69.0));
    }
}
