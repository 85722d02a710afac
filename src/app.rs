//! Application wiring.
//!
//! Builds the sensor, workload and controller from the configuration, runs
//! one session with live progress on stderr, then evaluates the verdict and
//! writes the reports.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::benchmark::{run_disk_benchmark, DiskBenchResult};
use crate::config::Config;
use crate::models::{CompletedSession, CompletionStatus, Verdict};
use crate::monitor::SystemSensor;
use crate::report::{self, Artifacts, ReportInput};
use crate::session::{abort_pair, AbortHandle, PhaseController, SessionEvent};
use crate::stress::CpuStress;
use crate::thermal;
use crate::utils::{format_mm_ss, format_opt};
use crate::verdict;

/// What a finished run produced.
pub struct Outcome {
    pub status: CompletionStatus,
    pub verdict: Verdict,
    pub artifacts: Artifacts,
}

pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn lang(&self) -> &str {
        &self.config.report.lang
    }

    /// Run one diagnostic session and write its reports.
    pub async fn run(self) -> Result<Outcome> {
        let lang = self.lang().to_string();
        let plan = self.config.plan();

        eprintln!(
            "{} ({})",
            t!("app.name", locale = lang.as_str()),
            t!("app.tagline", locale = lang.as_str())
        );
        let (idle, stress, interval) = (
            plan.idle.as_secs(),
            plan.stress.as_secs(),
            plan.interval.as_secs(),
        );
        eprintln!(
            "{}",
            t!(
                "app.plan",
                locale = lang.as_str(),
                idle = idle,
                stress = stress,
                interval = interval
            )
        );
        let (workers, duty, cycle) = (
            plan.intensity.workers,
            plan.intensity.duty_percent,
            plan.intensity.cycle_ms,
        );
        eprintln!(
            "{}",
            t!(
                "app.intensity",
                locale = lang.as_str(),
                workers = workers,
                duty = duty,
                cycle = cycle
            )
        );

        let lhm = if self.config.thermal.lhm_enabled {
            let url = self.config.thermal.lhm_url.clone();
            eprintln!("{}", t!("app.lhm_enabled", locale = lang.as_str(), url = url));
            Some(thermal::spawn_poller(
                &url,
                Duration::from_secs(self.config.thermal.poll_interval_secs),
            ))
        } else {
            None
        };

        // The constructor settles the first CPU usage delta with a short sleep.
        let sensor = tokio::task::spawn_blocking(move || SystemSensor::new(lhm))
            .await
            .context("sensor initialization panicked")?;
        let mut system = sensor.system_info();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let printer = spawn_event_printer(events_rx, lang.clone());
        let (abort_handle, abort_signal) = abort_pair();
        let interrupt = spawn_interrupt_watcher(abort_handle, lang.clone());

        let path = self.config.report.output_dir.display().to_string();
        eprintln!("{}", t!("app.output_dir", locale = lang.as_str(), path = path));
        eprintln!("{}", t!("app.abort_hint", locale = lang.as_str()));
        let controller = PhaseController::new(plan, Box::new(sensor), Box::new(CpuStress::new()))
            .with_events(events_tx);
        let session = controller.run(abort_signal).await;
        if !session.status().is_finished() {
            log::warn!(
                "session stopped in {:?} with status {:?}",
                session.phase(),
                session.status()
            );
        }

        interrupt.abort();
        // The controller dropped its sender, so the printer drains and exits.
        if let Err(e) = printer.await {
            log::warn!("progress printer ended abnormally: {}", e);
        }

        let (cpu_source, ssd_source) = session.temp_sources();
        system.cpu_temp_source = cpu_source;
        system.ssd_temp_source = ssd_source;

        let verdict = verdict::evaluate(session.readings(), &self.config.thresholds);
        log::info!(
            "verdict: {} on {:?}, peak {:?}",
            verdict.status,
            verdict.basis,
            verdict.peak_value
        );

        let benchmark = self.maybe_benchmark(&session).await;

        let input = ReportInput {
            session: &session,
            verdict: &verdict,
            system: &system,
            thresholds: &self.config.thresholds,
            benchmark: benchmark.as_ref(),
        };
        let output_dir = self.config.report.output_dir.clone();
        let artifacts = report::write_all(&output_dir, &input, &lang)
            .with_context(|| format!("writing reports to {}", output_dir.display()))?;

        print_summary(&verdict, &artifacts, &lang);

        Ok(Outcome {
            status: session.status().clone(),
            verdict,
            artifacts,
        })
    }

    /// Disk benchmark after the session, when enabled and not aborted.
    /// A failed benchmark is reported and left out of the reports.
    async fn maybe_benchmark(&self, session: &CompletedSession) -> Option<DiskBenchResult> {
        if !self.config.report.disk_bench || *session.status() == CompletionStatus::Aborted {
            return None;
        }
        let lang = self.lang();
        let size = self.config.report.disk_bench_mb;
        eprintln!("{}", t!("progress.benchmark", locale = lang, size = size));

        let dir: PathBuf = std::env::temp_dir();
        let result = tokio::task::spawn_blocking(move || run_disk_benchmark(&dir, size)).await;
        match result {
            Ok(Ok(bench)) => Some(bench),
            Ok(Err(e)) => {
                let error = e.to_string();
                log::warn!("disk benchmark failed: {}", error);
                eprintln!("{}", t!("progress.benchmark_failed", locale = lang, error = error));
                None
            }
            Err(e) => {
                log::error!("disk benchmark task panicked: {}", e);
                None
            }
        }
    }
}

/// Fire the abort on the first Ctrl+C.
fn spawn_interrupt_watcher(handle: AbortHandle, lang: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!();
                eprintln!("{}", t!("app.aborting", locale = lang.as_str()));
                handle.abort();
            }
            Err(e) => log::warn!("cannot listen for Ctrl+C: {}", e),
        }
    })
}

/// Print one localized line per session event until the channel closes.
fn spawn_event_printer(
    mut rx: mpsc::UnboundedReceiver<SessionEvent>,
    lang: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            eprintln!("{}", describe_event(&event, &lang));
        }
    })
}

fn describe_event(event: &SessionEvent, lang: &str) -> String {
    match event {
        SessionEvent::PhaseChanged { phase, at } => {
            let phase = t!(phase.label_key(), locale = lang).to_string();
            let at = format_mm_ss(*at);
            t!("progress.phase", locale = lang, phase = phase, at = at).to_string()
        }
        SessionEvent::Tick {
            reading,
            progress,
            remaining,
        } => {
            let progress = format!("{:.0}", progress);
            let phase = t!(reading.phase.label_key(), locale = lang).to_string();
            let usage = format_opt(reading.cpu_usage_percent(), "%");
            let temp = format_opt(reading.cpu_temp_c(), "°C");
            let remaining = format_mm_ss(*remaining);
            t!(
                "progress.tick",
                locale = lang,
                progress = progress,
                phase = phase,
                usage = usage,
                temp = temp,
                remaining = remaining
            )
            .to_string()
        }
        SessionEvent::Completed { status, readings } => {
            let status = report::status_message(status, lang);
            let readings = *readings;
            t!("progress.done", locale = lang, status = status, readings = readings).to_string()
        }
    }
}

fn print_summary(verdict: &Verdict, artifacts: &Artifacts, lang: &str) {
    let label = report::verdict_label(verdict.status, lang);
    println!();
    println!("{}", t!("result.verdict", locale = lang, label = label));
    println!("{}", report::verdict_description(verdict.status, verdict.basis, lang));
    if let Some(peak) = verdict.peak_value {
        let value = format!("{:.1}{}", peak, verdict.basis.unit());
        println!("{}", t!("result.peak", locale = lang, value = value));
    }
    println!("{}", artifacts_heading(lang));
    for path in artifacts.paths() {
        println!("  {}", path.display());
    }
}

fn artifacts_heading(lang: &str) -> String {
    t!("result.artifacts", locale = lang).to_string()
}
