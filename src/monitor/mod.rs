//! Telemetry acquisition.
//!
//! The session only sees the [`SensorPort`] capability; [`SystemSensor`] is
//! the production adapter over sysinfo with a LibreHardwareMonitor fallback.

pub mod collector;

pub use collector::SystemSensor;

use thiserror::Error;

use crate::models::{SensorSample, TempSource};

/// Failures of a sensor adapter. Absent fields are not errors.
#[derive(Debug, Error)]
pub enum SensorError {
    /// The whole query failed; the tick is recorded with every field absent.
    #[error("sensor query failed: {0}")]
    CapabilityFailure(String),
}

/// Supplies point-in-time telemetry. Individual fields may be absent.
pub trait SensorPort: Send {
    fn sample(&mut self) -> Result<SensorSample, SensorError>;

    /// Methods that produced the CPU and SSD temperatures so far.
    fn temp_sources(&self) -> (TempSource, TempSource) {
        (TempSource::Unavailable, TempSource::Unavailable)
    }
}
