//! Temperature fallback via LibreHardwareMonitor's HTTP JSON API.
//!
//! LHM exposes a tree of hardware → sub-hardware → sensors at `/data.json`.
//! A background task polls that endpoint and publishes the latest parsed
//! [`LhmSnapshot`] on a watch channel; the sensor adapter reads it whenever
//! the native sensors come up empty.
//!
//! Graceful fallback: if LHM is unreachable or the JSON format changes,
//! `poll()` returns `None` and sampling continues without LHM temperatures.

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::watch;

use crate::constants::LHM_TIMEOUT_SECS;

/// CPU and storage temperatures from one LHM poll.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LhmSnapshot {
    /// CPU package temperature, else the hottest CPU sensor.
    pub cpu_temp: Option<f32>,
    /// Hottest storage temperature.
    pub ssd_temp: Option<f32>,
}

/// Client for polling LibreHardwareMonitor's HTTP JSON endpoint.
pub struct LhmClient {
    url: String,
    client: reqwest::Client,
}

impl LhmClient {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(LHM_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Poll LHM, or None if unreachable / parse error.
    pub async fn poll(&self) -> Option<LhmSnapshot> {
        let resp = self.client.get(&self.url).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let text = resp.text().await.ok()?;
        parse_lhm_json(&text)
    }
}

/// Poll `url` every `interval` in the background and publish each result.
///
/// A failed poll publishes `None` so stale temperatures never outlive the
/// endpoint. The task ends when every receiver is dropped.
pub fn spawn_poller(url: &str, interval: Duration) -> watch::Receiver<Option<LhmSnapshot>> {
    let (tx, rx) = watch::channel(None);
    let client = LhmClient::new(url);
    let url = url.to_string();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut reachable = false;
        loop {
            ticker.tick().await;
            let snapshot = client.poll().await;
            if snapshot.is_some() != reachable {
                reachable = snapshot.is_some();
                if reachable {
                    log::info!("LibreHardwareMonitor reachable at {}", url);
                } else {
                    log::debug!("LibreHardwareMonitor not reachable at {}", url);
                }
            }
            if tx.send(snapshot).is_err() {
                break;
            }
        }
    });

    rx
}

// ── LHM JSON structures ──────────────────────────────────────────

/// LHM tree node: a hardware item, a sensor group or a sensor.
/// The JSON is recursive: each node can have `Children` containing more nodes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LhmNode {
    /// Display text, e.g. "Intel Core i5-8500" or "CPU Core #1: 65 °C".
    #[serde(default)]
    text: String,
    #[serde(default)]
    children: Vec<LhmNode>,
    /// Current value (present on sensor nodes), e.g. "65.2 °C".
    #[serde(default)]
    value: String,
}

/// One temperature sensor with the hardware it hangs off.
#[derive(Debug)]
struct TempSensor {
    /// Lowercased breadcrumb of hardware names above the sensor.
    hardware: String,
    /// Lowercased sensor name (text before the colon).
    name: String,
    value: f32,
}

/// Parse the LHM JSON tree into an [`LhmSnapshot`].
///
/// Returns None when the document is not an LHM tree or carries no usable
/// CPU or storage temperature.
pub fn parse_lhm_json(json_str: &str) -> Option<LhmSnapshot> {
    let root: LhmNode = serde_json::from_str(json_str).ok()?;

    let mut sensors = Vec::new();
    collect_temperatures(&root, &mut Vec::new(), false, &mut sensors);

    let mut package: Option<f32> = None;
    let mut cpu_max: Option<f32> = None;
    let mut ssd_max: Option<f32> = None;

    for sensor in &sensors {
        if is_cpu_hardware(&sensor.hardware) {
            if sensor.name.contains("package") || sensor.name.contains("cpu total") {
                package = Some(sensor.value);
            }
            cpu_max = Some(cpu_max.map_or(sensor.value, |m| m.max(sensor.value)));
        } else if is_storage_hardware(&sensor.hardware) {
            ssd_max = Some(ssd_max.map_or(sensor.value, |m| m.max(sensor.value)));
        }
    }

    let snapshot = LhmSnapshot {
        cpu_temp: package.or(cpu_max),
        ssd_temp: ssd_max,
    };
    if snapshot == LhmSnapshot::default() {
        return None;
    }
    Some(snapshot)
}

// ── Tree walking ──────────────────────────────────────────────────

/// Walk the LHM tree, collecting leaves below a "Temperatures" group.
fn collect_temperatures(
    node: &LhmNode,
    hardware_path: &mut Vec<String>,
    in_temperatures: bool,
    out: &mut Vec<TempSensor>,
) {
    let text = node.text.trim();

    if in_temperatures && node.children.is_empty() {
        if let Some(value) = parse_sensor_value(&node.value) {
            let name = text.split(':').next().unwrap_or(text).trim().to_lowercase();
            out.push(TempSensor {
                hardware: hardware_path.join(" ").to_lowercase(),
                name,
                value,
            });
        }
        return;
    }

    let is_group = is_sensor_group(text);
    let is_hardware = !is_group && !text.is_empty() && node.value.is_empty();
    if is_hardware {
        hardware_path.push(text.to_string());
    }

    let child_in_temps = if is_group {
        text == "Temperatures"
    } else {
        in_temperatures
    };
    for child in &node.children {
        collect_temperatures(child, hardware_path, child_in_temps, out);
    }

    if is_hardware {
        hardware_path.pop();
    }
}

fn is_sensor_group(text: &str) -> bool {
    matches!(
        text,
        "Temperatures" | "Fans" | "Voltages" | "Clocks" | "Powers" | "Load" | "Data" | "Throughput"
    )
}

/// Parse a sensor value string like "65.2 °C" or "65,2 °C" into f32.
fn parse_sensor_value(s: &str) -> Option<f32> {
    let s = s.trim();
    if s.is_empty() || s == "-" || s == "N/A" {
        return None;
    }
    let num_str: String = s
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-' || *c == ',')
        .collect();
    num_str.replace(',', ".").parse::<f32>().ok()
}

// ── Hardware classification ──────────────────────────────────────

fn is_cpu_hardware(path: &str) -> bool {
    path.contains("cpu")
        || path.contains("intel core")
        || path.contains("intel celeron")
        || path.contains("intel pentium")
        || path.contains("amd ryzen")
        || path.contains("processor")
}

fn is_storage_hardware(path: &str) -> bool {
    path.contains("ssd")
        || path.contains("nvme")
        || path.contains("samsung")
        || path.contains("wd ")
        || path.contains("western digital")
        || path.contains("crucial")
        || path.contains("kingston")
        || path.contains("hynix")
        || path.contains("sandisk")
}
