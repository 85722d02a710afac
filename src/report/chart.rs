//! SVG trend chart: CPU temperature (left axis) and CPU usage (right axis)
//! over session time, with dashed guide lines at the temperature bands.
//!
//! Gaps in a series stay gaps: an absent value ends the current polyline
//! instead of dropping to zero.

use std::fmt::Write as _;

use crate::constants::{CHART_HEIGHT, CHART_WIDTH, MAX_PLAUSIBLE_TEMP_C};
use crate::models::{Phase, Reading, ThresholdTable};

const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 70.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 60.0;
/// Gridlines on the temperature axis, bottom to top.
const TEMP_TICKS: usize = 7;
const TEMP_AXIS_MIN: f64 = 20.0;

const BG: &str = "#1a1a2e";
const PLOT_BG: &str = "#16213e";
const GRID: &str = "#444444";
const AXIS_TEXT: &str = "#aaaaaa";
const TEMP_COLOR: &str = "#e94560";
const USAGE_COLOR: &str = "#4f8fd6";
const WARN_COLOR: &str = "#f5a623";
const FAIL_COLOR: &str = "#ff0000";

/// Plot area and value → pixel mapping.
struct Frame {
    x0: f64,
    y0: f64,
    w: f64,
    h: f64,
    t_max: f64,
    temp_min: f64,
    temp_max: f64,
}

impl Frame {
    fn x(&self, secs: f64) -> f64 {
        self.x0 + secs / self.t_max * self.w
    }

    fn y_temp(&self, c: f64) -> f64 {
        let c = c.clamp(self.temp_min, self.temp_max);
        self.y0 + self.h - (c - self.temp_min) / (self.temp_max - self.temp_min) * self.h
    }

    fn y_pct(&self, pct: f64) -> f64 {
        self.y0 + self.h - pct.clamp(0.0, 100.0) / 100.0 * self.h
    }
}

/// Split a series into runs of consecutive present values.
fn runs(points: impl Iterator<Item = (f64, Option<f64>)>) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (x, y) in points {
        match y {
            Some(y) => current.push((x, y)),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn polyline(svg: &mut String, run: &[(f64, f64)], color: &str, width: f64) {
    if run.len() == 1 {
        let (x, y) = run[0];
        let _ = writeln!(svg, r#"<circle cx="{x:.1}" cy="{y:.1}" r="2.5" fill="{color}"/>"#);
        return;
    }
    let pts: Vec<String> = run.iter().map(|(x, y)| format!("{x:.1},{y:.1}")).collect();
    let _ = writeln!(
        svg,
        r#"<polyline points="{}" fill="none" stroke="{color}" stroke-width="{width}" stroke-linejoin="round"/>"#,
        pts.join(" ")
    );
}

/// Render the chart as a standalone SVG document.
pub fn render_svg(readings: &[Reading], thresholds: &ThresholdTable, lang: &str) -> String {
    let width = CHART_WIDTH as f64;
    let height = CHART_HEIGHT as f64;
    let band = thresholds.temperature;

    let t_max = readings
        .iter()
        .map(|r| r.offset.as_secs_f64())
        .fold(0.0_f64, f64::max)
        .max(1.0);
    let peak_temp = readings
        .iter()
        .filter_map(|r| r.cpu_temp_c())
        .fold(band.fail_above, f32::max) as f64;
    let temp_max = (((peak_temp + 5.0) / 10.0).ceil() * 10.0)
        .min(MAX_PLAUSIBLE_TEMP_C as f64)
        .max(TEMP_AXIS_MIN + 10.0);
    let frame = Frame {
        x0: MARGIN_LEFT,
        y0: MARGIN_TOP,
        w: width - MARGIN_LEFT - MARGIN_RIGHT,
        h: height - MARGIN_TOP - MARGIN_BOTTOM,
        t_max,
        temp_min: TEMP_AXIS_MIN,
        temp_max,
    };

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="sans-serif">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="{BG}"/>"#);
    let _ = writeln!(
        svg,
        r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{PLOT_BG}" stroke="{GRID}"/>"#,
        frame.x0, frame.y0, frame.w, frame.h
    );
    let _ = writeln!(
        svg,
        r##"<text x="{}" y="32" fill="#ffffff" font-size="18" font-weight="bold" text-anchor="middle">{}</text>"##,
        width / 2.0,
        escape(&t!("chart.title", locale = lang))
    );

    // Stress phase shading.
    if let Some(start) = readings.iter().find(|r| r.phase == Phase::Stress) {
        let x = frame.x(start.offset.as_secs_f64());
        let _ = writeln!(
            svg,
            r##"<rect x="{x:.1}" y="{}" width="{:.1}" height="{}" fill="#ffffff" fill-opacity="0.04"/>"##,
            frame.y0,
            frame.x0 + frame.w - x,
            frame.h
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{}" fill="{AXIS_TEXT}" font-size="11">{}</text>"#,
            x + 4.0,
            frame.y0 + 14.0,
            escape(&t!("phase.stress", locale = lang))
        );
    }

    // Axes: temperature ticks left, usage ticks right, time ticks bottom.
    for i in 0..=TEMP_TICKS {
        let c = frame.temp_min + (frame.temp_max - frame.temp_min) * i as f64 / TEMP_TICKS as f64;
        let y = frame.y_temp(c);
        let _ = writeln!(
            svg,
            r#"<line x1="{}" y1="{y:.1}" x2="{}" y2="{y:.1}" stroke="{GRID}" stroke-width="0.5"/>"#,
            frame.x0,
            frame.x0 + frame.w
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{:.1}" fill="{TEMP_COLOR}" font-size="11" text-anchor="end">{c:.0}</text>"#,
            frame.x0 - 8.0,
            y + 4.0
        );
    }
    for pct in (0..=100).step_by(20) {
        let y = frame.y_pct(pct as f64);
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{:.1}" fill="{USAGE_COLOR}" font-size="11">{pct}</text>"#,
            frame.x0 + frame.w + 8.0,
            y + 4.0
        );
    }
    for i in 0..=5 {
        let secs = t_max * i as f64 / 5.0;
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{}" fill="{AXIS_TEXT}" font-size="11" text-anchor="middle">{}:{:02}</text>"#,
            frame.x(secs),
            frame.y0 + frame.h + 18.0,
            secs as u64 / 60,
            secs as u64 % 60
        );
    }
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" fill="{AXIS_TEXT}" font-size="12" text-anchor="middle">{}</text>"#,
        frame.x0 + frame.w / 2.0,
        height - 16.0,
        escape(&t!("chart.time_axis", locale = lang))
    );

    // Temperature band guide lines.
    let (warn_at, fail_at) = (band.warning_from, band.fail_above);
    for (value, color, label) in [
        (warn_at, WARN_COLOR, t!("chart.warning_line", locale = lang, value = warn_at)),
        (fail_at, FAIL_COLOR, t!("chart.fail_line", locale = lang, value = fail_at)),
    ] {
        let y = frame.y_temp(value as f64);
        let _ = writeln!(
            svg,
            r#"<line x1="{}" y1="{y:.1}" x2="{}" y2="{y:.1}" stroke="{color}" stroke-width="1.2" stroke-dasharray="6,4" stroke-opacity="0.7"/>"#,
            frame.x0,
            frame.x0 + frame.w
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{:.1}" fill="{color}" font-size="10" text-anchor="end">{}</text>"#,
            frame.x0 + frame.w - 4.0,
            y - 4.0,
            escape(&label)
        );
    }

    // Series.
    let usage_runs = runs(readings.iter().map(|r| {
        (
            frame.x(r.offset.as_secs_f64()),
            r.cpu_usage_percent().map(|v| frame.y_pct(v as f64)),
        )
    }));
    for run in &usage_runs {
        polyline(&mut svg, run, USAGE_COLOR, 1.5);
    }
    let temp_runs = runs(readings.iter().map(|r| {
        (
            frame.x(r.offset.as_secs_f64()),
            r.cpu_temp_c().map(|v| frame.y_temp(v as f64)),
        )
    }));
    for run in &temp_runs {
        polyline(&mut svg, run, TEMP_COLOR, 2.0);
    }

    // Legend.
    let mut legend_y = frame.y0 + 16.0;
    if temp_runs.is_empty() {
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{legend_y}" fill="{AXIS_TEXT}" font-size="11">{}</text>"#,
            frame.x0 + 10.0,
            escape(&t!("chart.no_temperature", locale = lang))
        );
        legend_y += 16.0;
    }
    for (color, label) in [
        (TEMP_COLOR, t!("chart.cpu_temp", locale = lang)),
        (USAGE_COLOR, t!("chart.cpu_usage", locale = lang)),
    ] {
        let _ = writeln!(
            svg,
            r#"<line x1="{}" y1="{:.1}" x2="{}" y2="{:.1}" stroke="{color}" stroke-width="2"/>"#,
            frame.x0 + 10.0,
            legend_y - 4.0,
            frame.x0 + 28.0,
            legend_y - 4.0
        );
        let _ = writeln!(
            svg,
            r##"<text x="{}" y="{legend_y}" fill="#cccccc" font-size="11">{}</text>"##,
            frame.x0 + 34.0,
            escape(&label)
        );
        legend_y += 16.0;
    }

    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BandThresholds;
    use crate::report::test_support::{completed, reading};

    #[test]
    fn runs_break_at_gaps() {
        let pts = vec![
            (0.0, Some(1.0)),
            (1.0, Some(2.0)),
            (2.0, None),
            (3.0, Some(4.0)),
            (4.0, None),
            (5.0, None),
        ];
        let r = runs(pts.into_iter());
        assert_eq!(r, vec![vec![(0.0, 1.0), (1.0, 2.0)], vec![(3.0, 4.0)]]);
    }

    #[test]
    fn chart_has_series_and_guide_lines() {
        let session = completed();
        let svg = render_svg(session.readings(), &ThresholdTable::default(), "en");

        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("stroke-dasharray").count(), 2);
        assert!(svg.contains(TEMP_COLOR));
        assert!(svg.contains(USAGE_COLOR));
        assert!(svg.matches("<polyline").count() >= 2);
    }

    #[test]
    fn chart_without_temperature_still_renders() {
        let readings: Vec<Reading> = (0..4)
            .map(|i| reading(i * 5, Phase::Idle, Some(10.0 + i as f32), None))
            .collect();
        let svg = render_svg(&readings, &ThresholdTable::default(), "en");
        assert_eq!(svg.matches("<polyline").count(), 1);
        assert_eq!(svg.matches("stroke-dasharray").count(), 2);
    }

    #[test]
    fn extreme_band_keeps_axis_bounded() {
        let thresholds = ThresholdTable {
            temperature: BandThresholds::new(75.0, 1e20),
            ..ThresholdTable::default()
        };
        let svg = render_svg(&[], &thresholds, "en");

        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("stroke-dasharray").count(), 2);
        assert!(svg.contains(">150</text>"));
        assert!(svg.lines().count() < 60);
    }

    #[test]
    fn axis_labels_step_by_ten_for_default_band() {
        let svg = render_svg(&[], &ThresholdTable::default(), "en");
        for c in (20..=90).step_by(10) {
            assert!(svg.contains(&format!(">{}</text>", c)), "missing {}", c);
        }
    }

    #[test]
    fn escape_xml_text() {
        assert_eq!(escape("a < b & c"), "a &lt; b &amp; c");
    }

    #[test]
    fn empty_session_renders_frame() {
        let svg = render_svg(&[], &ThresholdTable::default(), "id");
        assert!(svg.contains("<rect"));
        assert!(!svg.contains("<polyline"));
    }
}
