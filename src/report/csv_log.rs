use std::path::Path;

use crate::models::Reading;

use super::ReportError;

const NOT_AVAILABLE: &str = "N/A";

fn cell(value: Option<f32>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{:.1}", v))
}

/// Write one row per reading with headers in `lang`.
pub fn write_csv(path: &Path, readings: &[Reading], lang: &str) -> Result<(), ReportError> {
    let csv_err = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;

    let headers = [
        t!("csv.time", locale = lang),
        t!("csv.elapsed", locale = lang),
        t!("csv.phase", locale = lang),
        t!("csv.cpu_usage", locale = lang),
        t!("csv.cpu_temp", locale = lang),
        t!("csv.ram_usage", locale = lang),
        t!("csv.disk_usage", locale = lang),
        t!("csv.ssd_temp", locale = lang),
    ]
    .map(|h| h.to_string());
    writer.write_record(&headers).map_err(csv_err)?;

    for r in readings {
        writer
            .write_record([
                r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                format!("{:.1}", r.offset.as_secs_f64()),
                r.phase.to_string(),
                cell(r.cpu_usage_percent()),
                cell(r.cpu_temp_c()),
                cell(r.ram_usage_percent()),
                cell(r.disk_usage_percent()),
                cell(r.ssd_temp_c()),
            ])
            .map_err(csv_err)?;
    }

    writer
        .flush()
        .map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })
}
