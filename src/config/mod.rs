use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::constants::*;
use crate::models::{BandThresholds, ThresholdTable};
use crate::session::SessionPlan;
use crate::stress::StressIntensity;

/// Application configuration with sensible defaults.
///
/// Can be overridden via ~/.config/idm-test/config.toml, then by CLI flags.
#[derive(Debug, Clone)]
pub struct Config {
    pub session: SessionConfig,
    pub stress: StressConfig,
    pub thresholds: ThresholdTable,
    pub thermal: ThermalConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle baseline length in seconds.
    pub idle_secs: u64,
    /// Total test length in minutes, idle included.
    pub duration_minutes: u64,
    /// Sampling cadence in seconds.
    pub interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_secs: DEFAULT_IDLE_SECS,
            duration_minutes: DEFAULT_DURATION_MINUTES,
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StressConfig {
    pub duty_percent: u8,
    pub cycle_ms: u64,
    /// None = min(2, logical cores).
    pub workers: Option<usize>,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            duty_percent: DEFAULT_DUTY_PERCENT,
            cycle_ms: DEFAULT_CYCLE_MS,
            workers: None,
        }
    }
}

/// Temperature fallback settings (LibreHardwareMonitor integration).
#[derive(Debug, Clone)]
pub struct ThermalConfig {
    /// Poll LHM at all.
    pub lhm_enabled: bool,
    /// LHM HTTP JSON endpoint URL.
    pub lhm_url: String,
    /// Polling interval in seconds.
    pub poll_interval_secs: u64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            lhm_enabled: true,
            lhm_url: DEFAULT_LHM_URL.to_string(),
            poll_interval_secs: DEFAULT_LHM_POLL_SECS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    /// Report language (en, id).
    pub lang: String,
    /// Run the disk benchmark after the session.
    pub disk_bench: bool,
    pub disk_bench_mb: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            lang: "en".to_string(),
            disk_bench: false,
            disk_bench_mb: DEFAULT_DISK_BENCH_MB,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            stress: StressConfig::default(),
            thresholds: ThresholdTable::default(),
            thermal: ThermalConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

/// TOML-deserializable config file format.
/// All fields are optional — missing fields use defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    session: Option<FileSessionConfig>,
    stress: Option<FileStressConfig>,
    thresholds: Option<FileThresholds>,
    thermal: Option<FileThermalConfig>,
    report: Option<FileReportConfig>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileSessionConfig {
    idle_secs: Option<u64>,
    duration_minutes: Option<u64>,
    interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileStressConfig {
    duty_percent: Option<u8>,
    cycle_ms: Option<u64>,
    workers: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileThresholds {
    temperature: Option<FileBand>,
    usage: Option<FileBand>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileBand {
    warning_from: Option<f32>,
    fail_above: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileThermalConfig {
    lhm_enabled: Option<bool>,
    lhm_url: Option<String>,
    poll_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileReportConfig {
    output_dir: Option<PathBuf>,
    lang: Option<String>,
    disk_bench: Option<bool>,
    disk_bench_mb: Option<u64>,
}

impl Config {
    /// Load config from ~/.config/idm-test/config.toml, falling back to
    /// defaults for any missing fields. If the file doesn't exist, returns
    /// pure defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Config::default(), // No config file — use defaults
        };
        match Self::from_toml(&content) {
            Ok(config) => {
                log::debug!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!(
                    "failed to parse {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Config::default()
            }
        }
    }

    /// Parse a config document and merge it over the defaults.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let file_config: FileConfig = toml::from_str(content)?;
        let mut config = Config::default();
        config.merge(file_config);
        Ok(config)
    }

    fn merge(&mut self, file_config: FileConfig) {
        if let Some(s) = file_config.session {
            if let Some(v) = s.idle_secs {
                self.session.idle_secs = v.min(MAX_SESSION_SECS);
            }
            if let Some(v) = s.duration_minutes {
                self.session.duration_minutes = v.clamp(1, MAX_DURATION_MINUTES);
            }
            if let Some(v) = s.interval_secs {
                self.session.interval_secs = v.clamp(MIN_INTERVAL_SECS, MAX_SESSION_SECS);
            }
        }

        if let Some(s) = file_config.stress {
            if let Some(v) = s.duty_percent {
                self.stress.duty_percent = v.clamp(MIN_DUTY_PERCENT, MAX_DUTY_PERCENT);
            }
            if let Some(v) = s.cycle_ms {
                self.stress.cycle_ms = v.clamp(MIN_CYCLE_MS, MAX_CYCLE_MS);
            }
            if let Some(v) = s.workers {
                self.stress.workers = Some(v.max(1));
            }
        }

        if let Some(t) = file_config.thresholds {
            if let Some(band) = t.temperature {
                self.thresholds.temperature = merge_band(
                    self.thresholds.temperature,
                    band,
                    "temperature",
                    MIN_PLAUSIBLE_TEMP_C..=MAX_PLAUSIBLE_TEMP_C,
                );
            }
            if let Some(band) = t.usage {
                self.thresholds.usage =
                    merge_band(self.thresholds.usage, band, "usage", 0.0..=100.0);
            }
        }

        if let Some(t) = file_config.thermal {
            if let Some(v) = t.lhm_enabled {
                self.thermal.lhm_enabled = v;
            }
            if let Some(v) = t.lhm_url {
                if !v.is_empty() {
                    self.thermal.lhm_url = v;
                }
            }
            if let Some(v) = t.poll_interval_secs {
                self.thermal.poll_interval_secs = v.max(1);
            }
        }

        if let Some(r) = file_config.report {
            if let Some(v) = r.output_dir {
                if !v.as_os_str().is_empty() {
                    self.report.output_dir = v;
                }
            }
            if let Some(v) = r.lang {
                self.set_lang(&v);
            }
            if let Some(v) = r.disk_bench {
                self.report.disk_bench = v;
            }
            if let Some(v) = r.disk_bench_mb {
                self.report.disk_bench_mb = v.max(1);
            }
        }
    }

    /// Set the report language; unsupported codes are ignored.
    pub fn set_lang(&mut self, lang: &str) {
        let lang = lang.trim().to_lowercase();
        if LANGUAGES.contains(&lang.as_str()) {
            self.report.lang = lang;
        } else {
            log::warn!("unsupported language '{}', keeping '{}'", lang, self.report.lang);
        }
    }

    /// Session timing derived from the configuration.
    ///
    /// Stress runs for the rest of the total duration after the idle
    /// baseline, and always for at least one sampling interval.
    pub fn plan(&self) -> SessionPlan {
        let interval = Duration::from_secs(
            self.session
                .interval_secs
                .clamp(MIN_INTERVAL_SECS, MAX_SESSION_SECS),
        );
        let idle = Duration::from_secs(self.session.idle_secs.min(MAX_SESSION_SECS));
        let total = Duration::from_secs(
            self.session.duration_minutes.clamp(1, MAX_DURATION_MINUTES) * 60,
        );
        SessionPlan {
            idle,
            stress: total.saturating_sub(idle).max(interval),
            interval,
            intensity: StressIntensity::new(
                self.stress.duty_percent,
                self.stress.cycle_ms,
                self.stress.workers,
            ),
        }
    }
}

/// Apply a file band over `current`; an ill-formed or out-of-range result
/// keeps `current`.
fn merge_band(
    current: BandThresholds,
    band: FileBand,
    name: &str,
    range: RangeInclusive<f32>,
) -> BandThresholds {
    let merged = BandThresholds::new(
        band.warning_from.unwrap_or(current.warning_from),
        band.fail_above.unwrap_or(current.fail_above),
    );
    if !range.contains(&merged.warning_from) || !range.contains(&merged.fail_above) {
        log::warn!(
            "ignoring {} thresholds: {} / {} outside {}..={}",
            name,
            merged.warning_from,
            merged.fail_above,
            range.start(),
            range.end()
        );
        current
    } else if merged.is_valid() {
        merged
    } else {
        log::warn!(
            "ignoring {} thresholds: warning_from {} must not exceed fail_above {}",
            name,
            merged.warning_from,
            merged.fail_above
        );
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_defaults() {
        let c = Config::from_toml("").unwrap();
        assert_eq!(c.session.idle_secs, DEFAULT_IDLE_SECS);
        assert_eq!(c.session.interval_secs, DEFAULT_INTERVAL_SECS);
        assert_eq!(c.thresholds, ThresholdTable::default());
        assert_eq!(c.report.lang, "en");
        assert!(c.thermal.lhm_enabled);
    }

    #[test]
    fn sections_merge_over_defaults() {
        let c = Config::from_toml(
            r#"
            [session]
            duration_minutes = 10
            interval_secs = 2

            [stress]
            duty_percent = 75
            workers = 1

            [thresholds.temperature]
            warning_from = 70.0

            [thresholds.usage]
            fail_above = 95.0

            [thermal]
            lhm_url = "http://10.0.0.5:8085/data.json"

            [report]
            lang = "id"
            disk_bench = true
            "#,
        )
        .unwrap();

        assert_eq!(c.session.duration_minutes, 10);
        assert_eq!(c.session.idle_secs, DEFAULT_IDLE_SECS);
        assert_eq!(c.session.interval_secs, 2);
        assert_eq!(c.stress.duty_percent, 75);
        assert_eq!(c.stress.workers, Some(1));
        assert_eq!(c.thresholds.temperature, BandThresholds::new(70.0, 85.0));
        assert_eq!(c.thresholds.usage, BandThresholds::new(50.0, 95.0));
        assert_eq!(c.thermal.lhm_url, "http://10.0.0.5:8085/data.json");
        assert_eq!(c.report.lang, "id");
        assert!(c.report.disk_bench);
    }

    #[test]
    fn values_are_clamped() {
        let c = Config::from_toml(
            r#"
            [session]
            interval_secs = 0
            duration_minutes = 0
            [stress]
            duty_percent = 100
            cycle_ms = 1
            workers = 0
            "#,
        )
        .unwrap();
        assert_eq!(c.session.interval_secs, MIN_INTERVAL_SECS);
        assert_eq!(c.session.duration_minutes, 1);
        assert_eq!(c.stress.duty_percent, MAX_DUTY_PERCENT);
        assert_eq!(c.stress.cycle_ms, MIN_CYCLE_MS);
        assert_eq!(c.stress.workers, Some(1));
    }

    #[test]
    fn inverted_band_is_ignored() {
        let c = Config::from_toml(
            r#"
            [thresholds.temperature]
            warning_from = 90.0
            fail_above = 80.0
            "#,
        )
        .unwrap();
        assert_eq!(c.thresholds.temperature, ThresholdTable::default().temperature);
    }

    #[test]
    fn unsupported_language_is_ignored() {
        let c = Config::from_toml("[report]\nlang = \"fr\"\n").unwrap();
        assert_eq!(c.report.lang, "en");
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session\nidle_secs = ").unwrap();
        let c = Config::load_from(&path);
        assert_eq!(c.session.idle_secs, DEFAULT_IDLE_SECS);

        let missing = Config::load_from(&dir.path().join("nope.toml"));
        assert_eq!(missing.session.duration_minutes, DEFAULT_DURATION_MINUTES);
    }

    #[test]
    fn plan_splits_total_duration() {
        let c = Config::default();
        let plan = c.plan();
        assert_eq!(plan.idle, Duration::from_secs(30));
        assert_eq!(plan.stress, Duration::from_secs(270));
        assert_eq!(plan.total(), Duration::from_secs(300));
        assert_eq!(plan.interval, Duration::from_secs(5));
    }

    #[test]
    fn timings_are_bounded_in_file() {
        let c = Config::from_toml(
            r#"
            [session]
            idle_secs = 9223372036854775807
            interval_secs = 9223372036854775807
            "#,
        )
        .unwrap();
        assert_eq!(c.session.idle_secs, MAX_SESSION_SECS);
        assert_eq!(c.session.interval_secs, MAX_SESSION_SECS);
    }

    #[test]
    fn plan_bounds_out_of_range_fields() {
        let mut c = Config::default();
        c.session.idle_secs = u64::MAX;
        c.session.interval_secs = u64::MAX;
        c.session.duration_minutes = u64::MAX;
        let plan = c.plan();
        assert_eq!(plan.idle, Duration::from_secs(MAX_SESSION_SECS));
        assert_eq!(plan.interval, Duration::from_secs(MAX_SESSION_SECS));
        assert_eq!(
            plan.total(),
            Duration::from_secs(MAX_SESSION_SECS) + plan.stress
        );
    }

    #[test]
    fn implausible_bands_are_ignored() {
        let c = Config::from_toml(
            r#"
            [thresholds.temperature]
            fail_above = 1e20
            [thresholds.usage]
            warning_from = -5.0
            "#,
        )
        .unwrap();
        assert_eq!(c.thresholds, ThresholdTable::default());

        let c = Config::from_toml("[thresholds.temperature]
fail_above = 95.0
").unwrap();
        assert_eq!(c.thresholds.temperature, BandThresholds::new(75.0, 95.0));
    }

    #[test]
    fn stress_never_shorter_than_one_interval() {
        let mut c = Config::default();
        c.session.duration_minutes = 1;
        c.session.idle_secs = 120;
        let plan = c.plan();
        assert_eq!(plan.stress, plan.interval);
    }
}
