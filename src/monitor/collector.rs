use std::path::Path;
use std::time::Duration;

use sysinfo::{Components, Disks, System};
use tokio::sync::watch;

use crate::constants::*;
use crate::models::{SensorSample, SystemInfo, TempSource};
use crate::thermal::LhmSnapshot;

use super::{SensorError, SensorPort};

/// Component label fragments that identify a CPU die / package sensor.
const CPU_SENSOR_LABELS: &[&str] = &[
    "coretemp",
    "k10temp",
    "zenpower",
    "cpu_thermal",
    "x86_pkg_temp",
    "acpitz",
    "package",
    "tdie",
    "tctl",
];

/// Component label fragments that identify a storage sensor.
const SSD_SENSOR_LABELS: &[&str] = &["nvme", "ssd", "drive", "composite"];

/// Production sensor adapter.
///
/// Only gathers data: no thresholds, no phase knowledge. Usage figures come
/// from sysinfo; temperatures from sysinfo components first, then from the
/// latest LibreHardwareMonitor snapshot when one is wired in.
pub struct SystemSensor {
    sys: System,
    disks: Disks,
    components: Components,
    lhm: Option<watch::Receiver<Option<LhmSnapshot>>>,
    cpu_temp_source: TempSource,
    ssd_temp_source: TempSource,
}

impl SystemSensor {
    pub fn new(lhm: Option<watch::Receiver<Option<LhmSnapshot>>>) -> Self {
        let mut sys = System::new_all();
        sys.refresh_cpu_usage();
        // Usage is a delta between refreshes; give the first one something to compare.
        std::thread::sleep(Duration::from_millis(INITIAL_SETTLE_MS));
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let components = Components::new_with_refreshed_list();
        log::debug!(
            "sysinfo components: {:?}",
            components.list().iter().map(|c| c.label()).collect::<Vec<_>>()
        );

        Self {
            sys,
            disks: Disks::new_with_refreshed_list(),
            components,
            lhm,
            cpu_temp_source: TempSource::Unavailable,
            ssd_temp_source: TempSource::Unavailable,
        }
    }

    /// Static machine description for the report header.
    pub fn system_info(&self) -> SystemInfo {
        let cpus = self.sys.cpus();
        let (disk_mount, disk_total, disk_free) = match system_volume(&self.disks) {
            Some((mount, total, free)) => (Some(mount), Some(total), Some(free)),
            None => (None, None, None),
        };

        SystemInfo {
            hostname: System::host_name().unwrap_or_else(|| "unknown".into()),
            os_name: format!(
                "{} {}",
                System::name().unwrap_or_else(|| "Unknown".into()),
                System::os_version().unwrap_or_default()
            )
            .trim()
            .to_string(),
            kernel: System::kernel_version().unwrap_or_default(),
            cpu_brand: cpus
                .first()
                .map(|c| c.brand().trim().to_string())
                .unwrap_or_default(),
            physical_cores: self.sys.physical_core_count(),
            logical_cores: cpus.len(),
            cpu_freq_mhz: cpus.first().map(|c| c.frequency()).filter(|f| *f > 0),
            total_memory: self.sys.total_memory(),
            disk_mount,
            disk_total,
            disk_free,
            gpu_name: gpu_name(),
            cpu_temp_source: self.cpu_temp_source,
            ssd_temp_source: self.ssd_temp_source,
        }
    }

    fn lhm_snapshot(&self) -> Option<LhmSnapshot> {
        self.lhm.as_ref().and_then(|rx| *rx.borrow())
    }

    fn note_source(slot: &mut TempSource, found: TempSource, what: &str) {
        if *slot != found && found != TempSource::Unavailable {
            log::info!("{} temperature source: {}", what, found);
            *slot = found;
        }
    }
}

impl SensorPort for SystemSensor {
    fn temp_sources(&self) -> (TempSource, TempSource) {
        (self.cpu_temp_source, self.ssd_temp_source)
    }

    fn sample(&mut self) -> Result<SensorSample, SensorError> {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        self.disks.refresh();
        self.components.refresh();

        if self.sys.cpus().is_empty() && self.sys.total_memory() == 0 {
            return Err(SensorError::CapabilityFailure(
                "no CPU or memory information available".into(),
            ));
        }

        let cpu_usage = (!self.sys.cpus().is_empty()).then(|| self.sys.global_cpu_usage());
        let ram_usage = percent(self.sys.used_memory(), self.sys.total_memory());
        let disk_usage = system_volume(&self.disks)
            .and_then(|(_, total, free)| percent(total.saturating_sub(free), total));

        let labelled: Vec<(String, f32)> = self
            .components
            .list()
            .iter()
            .map(|c| (c.label().to_lowercase(), c.temperature()))
            .collect();
        let lhm = self.lhm_snapshot();

        let (cpu_temp, cpu_src) = match pick_cpu_temp(&labelled) {
            Some(t) => (Some(t), TempSource::Sysinfo),
            None => match lhm.and_then(|s| s.cpu_temp) {
                Some(t) => (Some(t), TempSource::Lhm),
                None => (None, TempSource::Unavailable),
            },
        };
        let (ssd_temp, ssd_src) = match pick_ssd_temp(&labelled) {
            Some(t) => (Some(t), TempSource::Sysinfo),
            None => match lhm.and_then(|s| s.ssd_temp) {
                Some(t) => (Some(t), TempSource::Lhm),
                None => (None, TempSource::Unavailable),
            },
        };
        Self::note_source(&mut self.cpu_temp_source, cpu_src, "CPU");
        Self::note_source(&mut self.ssd_temp_source, ssd_src, "SSD");

        Ok(SensorSample {
            cpu_usage_percent: cpu_usage,
            cpu_temp_c: cpu_temp,
            ram_usage_percent: ram_usage,
            disk_usage_percent: disk_usage,
            ssd_temp_c: ssd_temp,
        })
    }
}

fn percent(used: u64, total: u64) -> Option<f32> {
    (total > 0).then(|| (used as f64 / total as f64 * 100.0) as f32)
}

fn plausible(t: f32) -> bool {
    t.is_finite() && t > MIN_PLAUSIBLE_TEMP_C && t < MAX_PLAUSIBLE_TEMP_C
}

/// CPU temperature from component labels: a package/die sensor when one is
/// present, else the hottest matching sensor.
fn pick_cpu_temp(components: &[(String, f32)]) -> Option<f32> {
    let cpu: Vec<&(String, f32)> = components
        .iter()
        .filter(|(label, t)| plausible(*t) && CPU_SENSOR_LABELS.iter().any(|k| label.contains(k)))
        .collect();

    let package = cpu
        .iter()
        .find(|(label, _)| {
            label.contains("package") || label.contains("tdie") || label.contains("tctl")
        })
        .map(|(_, t)| *t);

    package.or_else(|| cpu.iter().map(|(_, t)| *t).reduce(f32::max))
}

/// Hottest storage sensor.
fn pick_ssd_temp(components: &[(String, f32)]) -> Option<f32> {
    components
        .iter()
        .filter(|(label, t)| plausible(*t) && SSD_SENSOR_LABELS.iter().any(|k| label.contains(k)))
        .map(|(_, t)| *t)
        .reduce(f32::max)
}

/// (mount, total, available) of the system volume: `/` or `C:\`, else the
/// largest disk.
fn system_volume(disks: &Disks) -> Option<(String, u64, u64)> {
    let list: Vec<(String, u64, u64)> = disks
        .list()
        .iter()
        .map(|d| {
            (
                d.mount_point().to_string_lossy().to_string(),
                d.total_space(),
                d.available_space(),
            )
        })
        .collect();
    pick_system_volume(list)
}

fn pick_system_volume(disks: Vec<(String, u64, u64)>) -> Option<(String, u64, u64)> {
    let is_root = |m: &str| {
        let p = Path::new(m);
        p == Path::new("/") || m.eq_ignore_ascii_case("C:\\")
    };
    let disks: Vec<_> = disks.into_iter().filter(|(_, total, _)| *total > 0).collect();
    if let Some(root) = disks.iter().find(|(m, _, _)| is_root(m)) {
        return Some(root.clone());
    }
    disks.into_iter().max_by_key(|(_, total, _)| *total)
}

/// First NVIDIA GPU name via NVML, when the driver is present.
fn gpu_name() -> Option<String> {
    let nvml = nvml_wrapper::Nvml::init().ok()?;
    let device = nvml.device_by_index(0).ok()?;
    device.name().ok()
}
