//! Shared utility functions used across modules.

use std::time::Duration;

/// Round to one decimal place, the precision every recorded metric uses.
pub fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

/// Format a byte count as a human-readable string (binary units).
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let b = bytes as f64;
    if b >= GIB {
        format!("{:.2} GB", b / GIB)
    } else if b >= MIB {
        format!("{:.1} MB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a duration as `Xm YYs` for progress lines.
pub fn format_mm_ss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}m {:02}s", secs / 60, secs % 60)
}

/// Render an optional metric, `N/A` when absent.
pub fn format_opt(value: Option<f32>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.1}{}", v, unit),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round1_keeps_one_decimal() {
        assert_eq!(round1(72.34), 72.3);
        assert_eq!(round1(72.36), 72.4);
        assert_eq!(round1(100.0), 100.0);
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(8 * 1024 * 1024 * 1024), "8.00 GB");
    }

    #[test]
    fn format_mm_ss_pads_seconds() {
        assert_eq!(format_mm_ss(Duration::from_secs(0)), "0m 00s");
        assert_eq!(format_mm_ss(Duration::from_secs(65)), "1m 05s");
        assert_eq!(format_mm_ss(Duration::from_secs(600)), "10m 00s");
    }

    #[test]
    fn format_opt_absent_is_na() {
        assert_eq!(format_opt(None, "°C"), "N/A");
        assert_eq!(format_opt(Some(71.26), "°C"), "71.3°C");
    }
}
