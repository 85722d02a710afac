//! Application-wide constants.
//!
//! Centralizes session timings, thresholds, workload bounds and output paths
//! so the defaults live in one place.

use std::path::PathBuf;

// ── Session timing ────────────────────────────────────────────────
/// Default idle baseline length (seconds).
pub const DEFAULT_IDLE_SECS: u64 = 30;
/// Default total test length (minutes), idle phase included.
pub const DEFAULT_DURATION_MINUTES: u64 = 5;
/// Default sampling cadence (seconds).
pub const DEFAULT_INTERVAL_SECS: u64 = 5;
/// Shortest accepted sampling cadence (seconds).
pub const MIN_INTERVAL_SECS: u64 = 1;
/// Longest accepted test (minutes).
pub const MAX_DURATION_MINUTES: u64 = 24 * 60;
/// Upper bound for idle baseline and sampling interval (seconds).
pub const MAX_SESSION_SECS: u64 = MAX_DURATION_MINUTES * 60;
/// Settling delay after the first CPU refresh so the first usage sample is meaningful (ms).
pub const INITIAL_SETTLE_MS: u64 = 250;

// ── Stress workload ───────────────────────────────────────────────
/// Default busy share of each duty cycle (percent).
pub const DEFAULT_DUTY_PERCENT: u8 = 60;
/// Lowest accepted duty (percent).
pub const MIN_DUTY_PERCENT: u8 = 10;
/// Highest accepted duty (percent). Never 100: workers always idle part of each cycle.
pub const MAX_DUTY_PERCENT: u8 = 90;
/// Default busy + idle cycle length (ms).
pub const DEFAULT_CYCLE_MS: u64 = 500;
/// Accepted cycle length range (ms).
pub const MIN_CYCLE_MS: u64 = 50;
pub const MAX_CYCLE_MS: u64 = 5_000;
/// Default worker count cap when none is configured.
pub const DEFAULT_MAX_WORKERS: usize = 2;
/// Arithmetic iterations between stop-flag / deadline checks in a busy slice.
pub const BUSY_BURST_ITERATIONS: u32 = 20_000;
/// Nice value applied to stress workers on Linux.
pub const WORKER_NICE: i32 = 10;

// ── Verdict thresholds ────────────────────────────────────────────
/// CPU temperature at which the verdict becomes Warning (Celsius).
pub const DEFAULT_TEMP_WARNING_C: f32 = 75.0;
/// CPU temperature above which the verdict becomes Fail (Celsius).
pub const DEFAULT_TEMP_FAIL_C: f32 = 85.0;
/// CPU usage at which the fallback verdict becomes Warning (percent).
pub const DEFAULT_USAGE_WARNING_PCT: f32 = 50.0;
/// CPU usage above which the fallback verdict becomes Fail (percent).
pub const DEFAULT_USAGE_FAIL_PCT: f32 = 90.0;

// ── Sensor plausibility ───────────────────────────────────────────
/// Temperatures at or below this are discarded (Celsius).
pub const MIN_PLAUSIBLE_TEMP_C: f32 = 0.0;
/// Temperatures at or above this are discarded (Celsius).
pub const MAX_PLAUSIBLE_TEMP_C: f32 = 150.0;

// ── Thermal (LibreHardwareMonitor) ────────────────────────────────
/// Default LibreHardwareMonitor HTTP JSON URL.
pub const DEFAULT_LHM_URL: &str = "http://localhost:8085/data.json";
/// LHM request timeout (seconds).
pub const LHM_TIMEOUT_SECS: u64 = 3;
/// LHM polling interval (seconds).
pub const DEFAULT_LHM_POLL_SECS: u64 = 2;

// ── Disk benchmark ────────────────────────────────────────────────
/// Default benchmark file size (MiB).
pub const DEFAULT_DISK_BENCH_MB: u64 = 128;
/// Benchmark block size (KiB).
pub const DISK_BENCH_BLOCK_KB: usize = 1024;
/// Benchmark scratch file name (inside the system temp dir).
pub const DISK_BENCH_FILE: &str = "idm_disk_bench.tmp";

// ── Output ────────────────────────────────────────────────────────
pub const CSV_FILE_NAME: &str = "idm-test-log.csv";
pub const CHART_FILE_NAME: &str = "idm-test-cpu-temp.svg";
pub const REPORT_FILE_NAME: &str = "idm-test-report.txt";
pub const SUMMARY_FILE_NAME: &str = "idm-test-report.json";
/// Chart canvas size (px).
pub const CHART_WIDTH: u32 = 1000;
pub const CHART_HEIGHT: u32 = 500;

// ── Supported Languages ───────────────────────────────────────────
pub const LANGUAGES: &[&str] = &["en", "id"];

// ── Paths ─────────────────────────────────────────────────────────

/// Returns the user's home directory, falling back to the temp dir.
pub fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}

/// Returns `~/.config/idm-test/`.
pub fn config_dir() -> PathBuf {
    home_dir().join(".config").join("idm-test")
}

/// Returns `~/.config/idm-test/config.toml`.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Returns `~/Desktop` when it exists, else the home directory.
pub fn default_output_dir() -> PathBuf {
    let desktop = home_dir().join("Desktop");
    if desktop.is_dir() {
        desktop
    } else {
        home_dir()
    }
}
