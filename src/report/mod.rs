//! Report assembly: turns a completed session, its verdict and the machine
//! description into the four output artifacts.
//!
//! - `idm-test-log.csv`: one row per reading, `N/A` for absent values
//! - `idm-test-cpu-temp.svg`: CPU temperature / usage trend chart
//! - `idm-test-report.txt`: localized human-readable report
//! - `idm-test-report.json`: machine-readable summary

mod chart;
mod csv_log;
mod text;

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::benchmark::DiskBenchResult;
use crate::constants::*;
use crate::models::{
    CompletedSession, CompletionStatus, Phase, PhaseTransition, Reading, SystemInfo,
    ThresholdTable, Verdict,
};
use crate::stress::StressIntensity;
use crate::utils::round1;

pub use chart::render_svg;
pub use csv_log::write_csv;
pub use text::{render_text, status_message, verdict_description, verdict_label};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write CSV {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to encode summary: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything a report is built from.
pub struct ReportInput<'a> {
    pub session: &'a CompletedSession,
    pub verdict: &'a Verdict,
    pub system: &'a SystemInfo,
    pub thresholds: &'a ThresholdTable,
    pub benchmark: Option<&'a DiskBenchResult>,
}

/// Paths of the written artifacts.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub csv: PathBuf,
    pub chart: PathBuf,
    pub text: PathBuf,
    pub summary: PathBuf,
}

impl Artifacts {
    pub fn paths(&self) -> [&Path; 4] {
        [&self.csv, &self.chart, &self.text, &self.summary]
    }
}

/// Write every artifact into `dir` (created if missing), localized in `lang`.
pub fn write_all(dir: &Path, input: &ReportInput<'_>, lang: &str) -> Result<Artifacts, ReportError> {
    std::fs::create_dir_all(dir).map_err(|source| ReportError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let artifacts = Artifacts {
        csv: dir.join(CSV_FILE_NAME),
        chart: dir.join(CHART_FILE_NAME),
        text: dir.join(REPORT_FILE_NAME),
        summary: dir.join(SUMMARY_FILE_NAME),
    };
    let readings = input.session.readings();

    write_csv(&artifacts.csv, readings, lang)?;
    write_file(&artifacts.chart, &render_svg(readings, input.thresholds, lang))?;
    write_file(&artifacts.text, &render_text(input, lang))?;
    write_file(&artifacts.summary, &serde_json::to_string_pretty(&Summary::new(input))?)?;

    for path in artifacts.paths() {
        log::info!("wrote {}", path.display());
    }
    Ok(artifacts)
}

fn write_file(path: &Path, content: &str) -> Result<(), ReportError> {
    std::fs::write(path, content).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

// ── Statistics ────────────────────────────────────────────────────

/// Min / max / mean of one metric over the readings that carry it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricStats {
    pub min: f32,
    pub max: f32,
    pub avg: f32,
    pub samples: usize,
}

impl MetricStats {
    pub fn collect(readings: &[Reading], metric: impl Fn(&Reading) -> Option<f32>) -> Option<Self> {
        let values: Vec<f32> = readings.iter().filter_map(metric).collect();
        if values.is_empty() {
            return None;
        }
        let min = values.iter().copied().fold(f32::INFINITY, f32::min);
        let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let sum: f64 = values.iter().map(|v| *v as f64).sum();
        Some(Self {
            min,
            max,
            avg: round1((sum / values.len() as f64) as f32),
            samples: values.len(),
        })
    }
}

/// Per-metric statistics for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionStats {
    pub cpu_usage: Option<MetricStats>,
    pub cpu_temp: Option<MetricStats>,
    pub ram_usage: Option<MetricStats>,
    pub disk_usage: Option<MetricStats>,
    pub ssd_temp: Option<MetricStats>,
}

impl SessionStats {
    pub fn from_readings(readings: &[Reading]) -> Self {
        Self {
            cpu_usage: MetricStats::collect(readings, Reading::cpu_usage_percent),
            cpu_temp: MetricStats::collect(readings, Reading::cpu_temp_c),
            ram_usage: MetricStats::collect(readings, Reading::ram_usage_percent),
            disk_usage: MetricStats::collect(readings, Reading::disk_usage_percent),
            ssd_temp: MetricStats::collect(readings, Reading::ssd_temp_c),
        }
    }
}

/// Readings recorded in `phase`.
pub fn count_in_phase(readings: &[Reading], phase: Phase) -> usize {
    readings.iter().filter(|r| r.phase == phase).count()
}

// ── JSON summary ──────────────────────────────────────────────────

#[derive(Serialize)]
struct Summary<'a> {
    tool: &'static str,
    version: &'static str,
    started_at: chrono::DateTime<chrono::Local>,
    ended_at: chrono::DateTime<chrono::Local>,
    elapsed_secs: f64,
    interval_secs: u64,
    status: &'a CompletionStatus,
    intensity: StressIntensity,
    transitions: &'a [PhaseTransition],
    readings: usize,
    idle_readings: usize,
    stress_readings: usize,
    cadence_ok: bool,
    verdict: &'a Verdict,
    stats: SessionStats,
    system: &'a SystemInfo,
    disk_benchmark: Option<&'a DiskBenchResult>,
}

impl<'a> Summary<'a> {
    fn new(input: &ReportInput<'a>) -> Self {
        let session = input.session;
        let readings = session.readings();
        Self {
            tool: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            started_at: session.started_at(),
            ended_at: session.ended_at(),
            elapsed_secs: session.elapsed().as_secs_f64(),
            interval_secs: session.interval().as_secs(),
            status: session.status(),
            intensity: session.intensity(),
            transitions: session.transitions(),
            readings: readings.len(),
            idle_readings: count_in_phase(readings, Phase::Idle),
            stress_readings: count_in_phase(readings, Phase::Stress),
            cadence_ok: session.cadence_holds(),
            verdict: input.verdict,
            stats: SessionStats::from_readings(readings),
            system: input.system,
            disk_benchmark: input.benchmark,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::models::SystemInfo;

    #[test]
    fn stats_skip_absent_values() {
        let session = completed();
        let stats = SessionStats::from_readings(session.readings());

        let temp = stats.cpu_temp.unwrap();
        assert_eq!(temp.samples, 3);
        assert_eq!(temp.min, 48.0);
        assert_eq!(temp.max, 71.5);
        assert_eq!(temp.avg, 56.2);

        assert_eq!(stats.cpu_usage.unwrap().samples, 4);
        assert_eq!(stats.ssd_temp, None);
    }

    #[test]
    fn phase_counts() {
        let session = completed();
        assert_eq!(count_in_phase(session.readings(), Phase::Idle), 2);
        assert_eq!(count_in_phase(session.readings(), Phase::Stress), 2);
        assert_eq!(count_in_phase(session.readings(), Phase::Complete), 0);
    }

    #[test]
    fn write_all_creates_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("out");
        let session = completed();
        let thresholds = ThresholdTable::default();
        let verdict = crate::verdict::evaluate(session.readings(), &thresholds);
        let system = SystemInfo::default();
        let input = ReportInput {
            session: &session,
            verdict: &verdict,
            system: &system,
            thresholds: &thresholds,
            benchmark: None,
        };

        let artifacts = write_all(&out, &input, "en").unwrap();
        for path in artifacts.paths() {
            assert!(path.exists(), "{} missing", path.display());
        }

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&artifacts.summary).unwrap()).unwrap();
        assert_eq!(json["readings"], 4);
        assert_eq!(json["stress_readings"], 2);
        assert_eq!(json["status"]["kind"], "finished");
        assert_eq!(json["verdict"]["status"], "pass");
        assert_eq!(json["verdict"]["basis"], "temperature");
        assert_eq!(json["transitions"][0]["at_ms"], 10_000);
        assert!(json["disk_benchmark"].is_null());
    }

    #[test]
    fn unwritable_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();
        let session = completed();
        let thresholds = ThresholdTable::default();
        let verdict = crate::verdict::evaluate(session.readings(), &thresholds);
        let system = SystemInfo::default();
        let input = ReportInput {
            session: &session,
            verdict: &verdict,
            system: &system,
            thresholds: &thresholds,
            benchmark: None,
        };

        let err = write_all(&file.join("sub"), &input, "en").unwrap_err();
        assert!(matches!(err, ReportError::CreateDir { .. }));
    }
}
