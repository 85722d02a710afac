use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::constants::{MAX_PLAUSIBLE_TEMP_C, MIN_PLAUSIBLE_TEMP_C};
use crate::utils::round1;

/// Session-wide mode. Ordered: a session only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Stress,
    Complete,
}

impl Phase {
    /// Locale key for the phase name.
    pub fn label_key(&self) -> &'static str {
        match self {
            Phase::Idle => "phase.idle",
            Phase::Stress => "phase.stress",
            Phase::Complete => "phase.complete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Stress => write!(f, "stress"),
            Phase::Complete => write!(f, "complete"),
        }
    }
}

/// Point-in-time telemetry as delivered by a sensor adapter.
///
/// Every field may be absent. Temperatures are commonly unavailable (no
/// sensor, no driver, no privileges); usage fields are only absent when the
/// whole query failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SensorSample {
    pub cpu_usage_percent: Option<f32>,
    pub cpu_temp_c: Option<f32>,
    pub ram_usage_percent: Option<f32>,
    pub disk_usage_percent: Option<f32>,
    pub ssd_temp_c: Option<f32>,
}

impl SensorSample {
    /// A sample with every field absent (total capability failure).
    pub fn absent() -> Self {
        Self::default()
    }

    /// Drop implausible values and round the rest to one decimal.
    pub fn sanitized(self) -> Self {
        Self {
            cpu_usage_percent: sanitize_percent(self.cpu_usage_percent),
            cpu_temp_c: sanitize_temp(self.cpu_temp_c),
            ram_usage_percent: sanitize_percent(self.ram_usage_percent),
            disk_usage_percent: sanitize_percent(self.disk_usage_percent),
            ssd_temp_c: sanitize_temp(self.ssd_temp_c),
        }
    }

    /// Names of the fields that are absent, for diagnostics.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.cpu_usage_percent.is_none() {
            missing.push("cpu_usage");
        }
        if self.cpu_temp_c.is_none() {
            missing.push("cpu_temp");
        }
        if self.ram_usage_percent.is_none() {
            missing.push("ram_usage");
        }
        if self.disk_usage_percent.is_none() {
            missing.push("disk_usage");
        }
        if self.ssd_temp_c.is_none() {
            missing.push("ssd_temp");
        }
        missing
    }
}

fn sanitize_percent(value: Option<f32>) -> Option<f32> {
    value
        .filter(|v| v.is_finite() && (0.0..=100.0).contains(v))
        .map(round1)
}

fn sanitize_temp(value: Option<f32>) -> Option<f32> {
    value
        .filter(|v| v.is_finite() && *v > MIN_PLAUSIBLE_TEMP_C && *v < MAX_PLAUSIBLE_TEMP_C)
        .map(round1)
}

/// One timestamped telemetry sample, recorded once per sampling tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Wall-clock time of the tick.
    pub timestamp: DateTime<Local>,
    /// Monotonic time since session start; the ordering key.
    pub offset: Duration,
    /// Phase the session was in when the tick fired.
    pub phase: Phase,
    pub values: SensorSample,
}

impl Reading {
    pub fn new(timestamp: DateTime<Local>, offset: Duration, phase: Phase, values: SensorSample) -> Self {
        Self {
            timestamp,
            offset,
            phase,
            values: values.sanitized(),
        }
    }

    pub fn cpu_usage_percent(&self) -> Option<f32> {
        self.values.cpu_usage_percent
    }

    pub fn cpu_temp_c(&self) -> Option<f32> {
        self.values.cpu_temp_c
    }

    pub fn ram_usage_percent(&self) -> Option<f32> {
        self.values.ram_usage_percent
    }

    pub fn disk_usage_percent(&self) -> Option<f32> {
        self.values.disk_usage_percent
    }

    pub fn ssd_temp_c(&self) -> Option<f32> {
        self.values.ssd_temp_c
    }
}
