use std::fmt;

use serde::Serialize;

/// Where a temperature value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TempSource {
    /// sysinfo components (hwmon and thermal zones on Linux).
    Sysinfo,
    /// LibreHardwareMonitor HTTP JSON endpoint.
    Lhm,
    #[default]
    Unavailable,
}

impl fmt::Display for TempSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TempSource::Sysinfo => write!(f, "sysinfo"),
            TempSource::Lhm => write!(f, "LibreHardwareMonitor"),
            TempSource::Unavailable => write!(f, "N/A"),
        }
    }
}

/// Machine description captured once at session start for the report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemInfo {
    pub hostname: String,
    pub os_name: String,
    pub kernel: String,
    pub cpu_brand: String,
    pub physical_cores: Option<usize>,
    pub logical_cores: usize,
    pub cpu_freq_mhz: Option<u64>,
    pub total_memory: u64,
    /// System volume, when one was found.
    pub disk_mount: Option<String>,
    pub disk_total: Option<u64>,
    pub disk_free: Option<u64>,
    pub gpu_name: Option<String>,
    pub cpu_temp_source: TempSource,
    pub ssd_temp_source: TempSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_source_labels() {
        assert_eq!(TempSource::Sysinfo.to_string(), "sysinfo");
        assert_eq!(TempSource::Lhm.to_string(), "LibreHardwareMonitor");
        assert_eq!(TempSource::default().to_string(), "N/A");
    }
}
