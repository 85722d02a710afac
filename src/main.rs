//! # IDM Test - POS Hardware Diagnostic
//!
//! Records an idle baseline, loads the CPU with a bounded stress workload,
//! samples temperatures and utilization throughout, and classifies the
//! machine as PASS / WARNING / FAIL with CSV, chart, text and JSON reports.

#[macro_use]
extern crate rust_i18n;

// Load locale files from `locales/` directory, default to English
i18n!("locales", fallback = "en");

mod app;
mod benchmark;
mod config;
pub mod constants;
mod models;
mod monitor;
mod report;
mod session;
mod stress;
mod thermal;
mod utils;
mod verdict;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use config::Config;
use constants::*;

/// IDM Test - POS hardware diagnostic (idle baseline, CPU stress, thermal verdict)
#[derive(Parser, Debug)]
#[command(
    name = "idm-test",
    version,
    about = "Point-of-sale hardware diagnostic with thermal verdict",
    after_help = "Outputs: CSV log, SVG chart, plain-text report and JSON summary.\n\
                  The chart and report are SVG and .txt rather than PNG and PDF."
)]
struct Cli {
    /// Total test length in minutes, idle baseline included (5, 10 or 30 are typical)
    #[arg(long, short = 'd', value_name = "MINUTES")]
    duration: Option<u64>,

    /// Idle baseline length in seconds
    #[arg(long, value_name = "SECS")]
    idle_secs: Option<u64>,

    /// Sampling interval in seconds
    #[arg(long, short = 'i', value_name = "SECS")]
    interval_secs: Option<u64>,

    /// Busy share of each stress cycle in percent (10-90)
    #[arg(long, value_name = "PERCENT")]
    duty: Option<u8>,

    /// Stress worker threads (default: up to 2, never more than logical cores)
    #[arg(long, short = 'w')]
    workers: Option<usize>,

    /// Directory for the CSV log, SVG chart, plain-text report and JSON summary
    #[arg(long, short = 'o', value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Report language (en, id)
    #[arg(long, short = 'l', value_name = "LANG")]
    lang: Option<String>,

    /// LibreHardwareMonitor JSON endpoint used when native sensors are missing
    #[arg(long, value_name = "URL")]
    lhm_url: Option<String>,

    /// Do not query LibreHardwareMonitor
    #[arg(long)]
    no_lhm: bool,

    /// Run the sequential disk benchmark after the session
    #[arg(long)]
    disk_bench: bool,

    /// Disk benchmark size in MiB
    #[arg(long, value_name = "MIB")]
    disk_bench_mb: Option<u64>,

    /// Debug logging (RUST_LOG still takes precedence)
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the file configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(minutes) = self.duration {
            config.session.duration_minutes = minutes.clamp(1, MAX_DURATION_MINUTES);
        }
        if let Some(secs) = self.idle_secs {
            config.session.idle_secs = secs.min(MAX_SESSION_SECS);
        }
        if let Some(secs) = self.interval_secs {
            config.session.interval_secs = secs.clamp(MIN_INTERVAL_SECS, MAX_SESSION_SECS);
        }
        if let Some(duty) = self.duty {
            config.stress.duty_percent = duty.clamp(MIN_DUTY_PERCENT, MAX_DUTY_PERCENT);
        }
        if let Some(workers) = self.workers {
            config.stress.workers = Some(workers.max(1));
        }
        if let Some(ref dir) = self.output_dir {
            config.report.output_dir = dir.clone();
        }
        if let Some(ref lang) = self.lang {
            config.set_lang(lang);
        }
        if let Some(ref url) = self.lhm_url {
            config.thermal.lhm_url = url.clone();
        }
        if self.no_lhm {
            config.thermal.lhm_enabled = false;
        }
        if self.disk_bench {
            config.report.disk_bench = true;
        }
        if let Some(mb) = self.disk_bench_mb {
            config.report.disk_bench_mb = mb.max(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    // Load and apply CLI overrides to config
    let mut config = Config::load();
    cli.apply(&mut config);

    // Report language (CLI > config > default "en")
    rust_i18n::set_locale(&config.report.lang);

    let outcome = app::App::new(config).run().await?;
    log::info!(
        "{} finished: {:?}, verdict {}, summary at {}",
        env!("CARGO_PKG_NAME"),
        outcome.status,
        outcome.verdict.status,
        outcome.artifacts.summary.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("idm-test").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn no_flags_keep_config() {
        let mut config = Config::default();
        parse(&[]).apply(&mut config);
        assert_eq!(config.session.duration_minutes, DEFAULT_DURATION_MINUTES);
        assert_eq!(config.session.idle_secs, DEFAULT_IDLE_SECS);
        assert!(config.thermal.lhm_enabled);
        assert!(!config.report.disk_bench);
    }

    #[test]
    fn flags_override_and_clamp() {
        let mut config = Config::default();
        parse(&[
            "--duration",
            "10",
            "--idle-secs",
            "60",
            "--interval-secs",
            "0",
            "--duty",
            "100",
            "--workers",
            "0",
            "--lang",
            "id",
            "--no-lhm",
            "--disk-bench",
        ])
        .apply(&mut config);

        assert_eq!(config.session.duration_minutes, 10);
        assert_eq!(config.session.idle_secs, 60);
        assert_eq!(config.session.interval_secs, MIN_INTERVAL_SECS);
        assert_eq!(config.stress.duty_percent, MAX_DUTY_PERCENT);
        assert_eq!(config.stress.workers, Some(1));
        assert_eq!(config.report.lang, "id");
        assert!(!config.thermal.lhm_enabled);
        assert!(config.report.disk_bench);

        let plan = config.plan();
        assert_eq!(plan.idle.as_secs(), 60);
        assert_eq!(plan.stress.as_secs(), 540);
    }

    #[test]
    fn huge_timings_are_bounded() {
        let mut config = Config::default();
        let max = u64::MAX.to_string();
        parse(&["--idle-secs", max.as_str(), "--interval-secs", max.as_str()]).apply(&mut config);
        assert_eq!(config.session.idle_secs, MAX_SESSION_SECS);
        assert_eq!(config.session.interval_secs, MAX_SESSION_SECS);

        let plan = config.plan();
        assert_eq!(plan.idle.as_secs(), MAX_SESSION_SECS);
        assert!(plan.total() >= plan.idle);
    }

    #[test]
    fn help_names_output_formats() {
        let help = <Cli as clap::CommandFactory>::command().render_long_help().to_string();
        assert!(help.contains("SVG"));
        assert!(help.contains("PDF"));
    }

    #[test]
    fn unsupported_language_is_ignored() {
        let mut config = Config::default();
        parse(&["--lang", "fr"]).apply(&mut config);
        assert_eq!(config.report.lang, "en");
    }
}
