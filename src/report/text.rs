//! Localized plain-text report.

use std::fmt::Write as _;

use crate::models::{CompletionStatus, Phase, SystemInfo, VerdictBasis, VerdictStatus};
use crate::utils::{format_bytes, format_mm_ss};

use super::{count_in_phase, MetricStats, ReportInput, SessionStats};

const RULE: &str = "════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "────────────────────────────────────────────────────────────";
const LABEL_WIDTH: usize = 24;

fn row(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "  {:<width$} {}", label, value, width = LABEL_WIDTH);
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", THIN_RULE);
}

fn na(lang: &str) -> String {
    t!("report.not_available", locale = lang).to_string()
}

fn or_na(value: Option<String>, lang: &str) -> String {
    value.unwrap_or_else(|| na(lang))
}

pub fn verdict_label(status: VerdictStatus, lang: &str) -> String {
    match status {
        VerdictStatus::Pass => t!("verdict.pass.label", locale = lang),
        VerdictStatus::Warning => t!("verdict.warning.label", locale = lang),
        VerdictStatus::Fail => t!("verdict.fail.label", locale = lang),
    }
    .to_string()
}

pub fn verdict_description(status: VerdictStatus, basis: VerdictBasis, lang: &str) -> String {
    match (status, basis) {
        (VerdictStatus::Pass, _) => t!("verdict.pass.description", locale = lang),
        (VerdictStatus::Warning, VerdictBasis::Temperature) => {
            t!("verdict.warning.description", locale = lang)
        }
        (VerdictStatus::Fail, VerdictBasis::Temperature) => {
            t!("verdict.fail.description", locale = lang)
        }
        (VerdictStatus::Warning, VerdictBasis::UsageFallback) => {
            t!("verdict.warning.usage_description", locale = lang)
        }
        (VerdictStatus::Fail, VerdictBasis::UsageFallback) => {
            t!("verdict.fail.usage_description", locale = lang)
        }
    }
    .to_string()
}

pub fn status_message(status: &CompletionStatus, lang: &str) -> String {
    match status {
        CompletionStatus::Finished => t!("status.finished", locale = lang).to_string(),
        CompletionStatus::Aborted => t!("status.aborted", locale = lang).to_string(),
        CompletionStatus::TerminatedEarly { reason } => {
            t!("status.terminated_early", locale = lang, reason = reason).to_string()
        }
    }
}

fn system_section(out: &mut String, sys: &SystemInfo, lang: &str) {
    heading(out, &t!("report.system_info", locale = lang));
    row(out, &t!("report.hostname", locale = lang), &sys.hostname);
    row(out, &t!("report.os", locale = lang), &sys.os_name);
    row(out, &t!("report.kernel", locale = lang), &sys.kernel);
    row(out, &t!("report.cpu", locale = lang), &sys.cpu_brand);
    row(
        out,
        &t!("report.physical_cores", locale = lang),
        &or_na(sys.physical_cores.map(|c| c.to_string()), lang),
    );
    row(
        out,
        &t!("report.logical_cores", locale = lang),
        &sys.logical_cores.to_string(),
    );
    row(
        out,
        &t!("report.cpu_freq", locale = lang),
        &or_na(sys.cpu_freq_mhz.map(|f| format!("{} MHz", f)), lang),
    );
    row(
        out,
        &t!("report.total_ram", locale = lang),
        &format_bytes(sys.total_memory),
    );
    let disk_label = match &sys.disk_mount {
        Some(mount) => t!("report.disk_total_on", locale = lang, mount = mount).to_string(),
        None => t!("report.disk_total", locale = lang).to_string(),
    };
    row(out, &disk_label, &or_na(sys.disk_total.map(format_bytes), lang));
    row(
        out,
        &t!("report.disk_free", locale = lang),
        &or_na(sys.disk_free.map(format_bytes), lang),
    );
    row(
        out,
        &t!("report.gpu", locale = lang),
        &or_na(sys.gpu_name.clone(), lang),
    );
}

fn stats_section(out: &mut String, stats: &SessionStats, lang: &str) {
    heading(out, &t!("report.statistics", locale = lang));
    let _ = writeln!(
        out,
        "  {:<w$} {:>10} {:>10} {:>10}",
        t!("report.parameter", locale = lang),
        t!("report.min", locale = lang),
        t!("report.max", locale = lang),
        t!("report.avg", locale = lang),
        w = LABEL_WIDTH
    );

    let lines: [(String, Option<MetricStats>, &str); 5] = [
        (t!("metric.cpu_usage", locale = lang).to_string(), stats.cpu_usage, "%"),
        (t!("metric.cpu_temp", locale = lang).to_string(), stats.cpu_temp, "°C"),
        (t!("metric.ram_usage", locale = lang).to_string(), stats.ram_usage, "%"),
        (t!("metric.disk_usage", locale = lang).to_string(), stats.disk_usage, "%"),
        (t!("metric.ssd_temp", locale = lang).to_string(), stats.ssd_temp, "°C"),
    ];
    for (label, s, unit) in lines {
        let (min, max, avg) = match s {
            Some(s) => (
                format!("{:.1}{}", s.min, unit),
                format!("{:.1}{}", s.max, unit),
                format!("{:.1}{}", s.avg, unit),
            ),
            None => (na(lang), na(lang), na(lang)),
        };
        let _ = writeln!(
            out,
            "  {:<w$} {:>10} {:>10} {:>10}",
            label,
            min,
            max,
            avg,
            w = LABEL_WIDTH
        );
    }
}

/// Render the full report.
pub fn render_text(input: &ReportInput<'_>, lang: &str) -> String {
    let session = input.session;
    let verdict = input.verdict;
    let readings = session.readings();
    let intensity = session.intensity();
    let mut out = String::new();

    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "  {}", t!("report.title", locale = lang));
    let _ = writeln!(out, "  {}", t!("report.subtitle", locale = lang));
    let _ = writeln!(out, "{}", RULE);
    row(
        &mut out,
        &t!("report.generated", locale = lang),
        &session.ended_at().format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    row(
        &mut out,
        &t!("report.started", locale = lang),
        &session.started_at().format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    row(
        &mut out,
        &t!("report.duration", locale = lang),
        &format_mm_ss(session.elapsed()),
    );
    row(
        &mut out,
        &t!("report.completion", locale = lang),
        &status_message(session.status(), lang),
    );
    row(
        &mut out,
        &t!("report.cpu_temp_source", locale = lang),
        &input.system.cpu_temp_source.to_string(),
    );
    row(
        &mut out,
        &t!("report.ssd_temp_source", locale = lang),
        &input.system.ssd_temp_source.to_string(),
    );

    system_section(&mut out, input.system, lang);

    heading(&mut out, &t!("report.test_setup", locale = lang));
    row(
        &mut out,
        &t!("report.interval", locale = lang),
        &format!("{}s", session.interval().as_secs()),
    );
    let (total, idle, stress) = (
        readings.len(),
        count_in_phase(readings, Phase::Idle),
        count_in_phase(readings, Phase::Stress),
    );
    row(
        &mut out,
        &t!("report.readings", locale = lang),
        &t!(
            "report.readings_value",
            locale = lang,
            total = total,
            idle = idle,
            stress = stress
        ),
    );
    let (workers, duty, cycle) = (intensity.workers, intensity.duty_percent, intensity.cycle_ms);
    row(
        &mut out,
        &t!("report.intensity", locale = lang),
        &t!(
            "report.intensity_value",
            locale = lang,
            workers = workers,
            duty = duty,
            cycle = cycle
        ),
    );

    stats_section(&mut out, &SessionStats::from_readings(readings), lang);

    if let Some(bench) = input.benchmark {
        heading(&mut out, &t!("report.disk_bench", locale = lang));
        row(
            &mut out,
            &t!("report.bench_size", locale = lang),
            &format_bytes(bench.size_bytes),
        );
        row(
            &mut out,
            &t!("report.bench_write", locale = lang),
            &format!("{:.1} MB/s", bench.write_mb_s),
        );
        row(
            &mut out,
            &t!("report.bench_read", locale = lang),
            &format!("{:.1} MB/s", bench.read_mb_s),
        );
    }

    heading(&mut out, &t!("report.conclusion", locale = lang));
    let _ = writeln!(out);
    let _ = writeln!(out, "  >>> {} <<<", verdict_label(verdict.status, lang));
    let _ = writeln!(
        out,
        "  {}",
        verdict_description(verdict.status, verdict.basis, lang)
    );
    let _ = writeln!(out);
    let basis = match verdict.basis {
        VerdictBasis::Temperature => t!("basis.temperature", locale = lang),
        VerdictBasis::UsageFallback => t!("basis.usage_fallback", locale = lang),
    };
    row(&mut out, &t!("report.basis", locale = lang), &basis);
    row(
        &mut out,
        &t!("report.peak", locale = lang),
        &or_na(
            verdict
                .peak_value
                .map(|p| format!("{:.1}{}", p, verdict.basis.unit())),
            lang,
        ),
    );

    heading(&mut out, &t!("report.criteria", locale = lang));
    let band = verdict.threshold_used;
    let unit = verdict.basis.unit();
    let metric = match verdict.basis {
        VerdictBasis::Temperature => t!("metric.cpu_temp", locale = lang),
        VerdictBasis::UsageFallback => t!("metric.cpu_usage", locale = lang),
    };
    row(
        &mut out,
        &verdict_label(VerdictStatus::Pass, lang),
        &format!("{} < {:.0}{}", metric, band.warning_from, unit),
    );
    row(
        &mut out,
        &verdict_label(VerdictStatus::Warning, lang),
        &format!(
            "{} {:.0}{} – {:.0}{}",
            metric, band.warning_from, unit, band.fail_above, unit
        ),
    );
    row(
        &mut out,
        &verdict_label(VerdictStatus::Fail, lang),
        &format!("{} > {:.0}{}", metric, band.fail_above, unit),
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "  {}", t!("report.footer", locale = lang));
    out
}
