//! Bounded CPU stress workload.
//!
//! Workers alternate bounded busy-work with bounded sleep so no core is held
//! at 100% for the whole stress phase. `stop()` joins every worker before it
//! returns, and dropping the workload stops it.

mod worker;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::constants::*;

use worker::DutyCycle;

/// Errors raised when starting a workload.
#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("stress workload is already running")]
    AlreadyRunning,
    #[error("failed to spawn stress worker {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },
}

/// A start/stop-able load generator driven by the phase controller.
pub trait Workload: Send {
    fn start(&mut self, intensity: StressIntensity) -> Result<(), WorkloadError>;

    /// Idempotent. Must not return while any worker is still running.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

/// How hard the stress phase pushes the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StressIntensity {
    /// Busy share of each cycle, 10–90 %.
    pub duty_percent: u8,
    /// Busy + idle cycle length.
    pub cycle_ms: u64,
    /// Worker threads, 1..=logical cores.
    pub workers: usize,
}

impl Default for StressIntensity {
    fn default() -> Self {
        Self::new(DEFAULT_DUTY_PERCENT, DEFAULT_CYCLE_MS, None)
    }
}

impl StressIntensity {
    /// Build a clamped intensity. Without an explicit worker count, up to
    /// two workers are used (bounded by the machine's logical cores).
    pub fn new(duty_percent: u8, cycle_ms: u64, workers: Option<usize>) -> Self {
        let cores = logical_cores();
        Self {
            duty_percent: duty_percent.clamp(MIN_DUTY_PERCENT, MAX_DUTY_PERCENT),
            cycle_ms: cycle_ms.clamp(MIN_CYCLE_MS, MAX_CYCLE_MS),
            workers: workers
                .unwrap_or_else(|| DEFAULT_MAX_WORKERS.min(cores))
                .clamp(1, cores),
        }
    }

    pub fn duty_cycle(&self) -> DutyCycle {
        DutyCycle::from_percent(self.duty_percent, Duration::from_millis(self.cycle_ms))
    }
}

/// Logical cores available to this process.
pub fn logical_cores() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Thread-per-worker CPU stress.
pub struct CpuStress {
    stop: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    active: Arc<AtomicUsize>,
}

impl CpuStress {
    pub fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            workers: Vec::new(),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Worker threads that have not yet exited.
    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for CpuStress {
    fn default() -> Self {
        Self::new()
    }
}

impl Workload for CpuStress {
    fn start(&mut self, intensity: StressIntensity) -> Result<(), WorkloadError> {
        if self.is_running() {
            return Err(WorkloadError::AlreadyRunning);
        }
        // Fresh flag per run so a previous stop cannot leak into this one.
        self.stop = Arc::new(AtomicBool::new(false));
        let cycle = intensity.duty_cycle();

        for index in 0..intensity.workers {
            let stop = Arc::clone(&self.stop);
            let guard = worker::ActiveGuard::new(&self.active);
            let spawned = thread::Builder::new()
                .name(format!("idm-stress-{}", index))
                .spawn(move || worker::run(cycle, stop, guard));
            match spawned {
                Ok(handle) => self.workers.push(handle),
                Err(source) => {
                    self.stop();
                    return Err(WorkloadError::Spawn { index, source });
                }
            }
        }

        log::info!(
            "stress started: {} worker(s), {:?} busy per {:?} cycle",
            intensity.workers,
            cycle.busy,
            cycle.period()
        );
        Ok(())
    }

    fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.stop.store(true, Ordering::Release);
        for handle in &self.workers {
            handle.thread().unpark();
        }
        let count = self.workers.len();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::warn!("stress worker panicked before stop");
            }
        }
        log::info!(
            "stress stopped: {} worker(s) joined, {} still active",
            count,
            self.active_workers()
        );
    }

    fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }
}

impl Drop for CpuStress {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> StressIntensity {
        StressIntensity::new(50, MIN_CYCLE_MS, Some(2))
    }

    #[test]
    fn intensity_is_clamped() {
        let cores = logical_cores();
        let i = StressIntensity::new(100, 1, Some(0));
        assert_eq!(i.duty_percent, MAX_DUTY_PERCENT);
        assert_eq!(i.cycle_ms, MIN_CYCLE_MS);
        assert_eq!(i.workers, 1);

        let i = StressIntensity::new(0, 60_000, Some(usize::MAX));
        assert_eq!(i.duty_percent, MIN_DUTY_PERCENT);
        assert_eq!(i.cycle_ms, MAX_CYCLE_MS);
        assert_eq!(i.workers, cores);
    }

    #[test]
    fn default_intensity_uses_at_most_two_workers() {
        let i = StressIntensity::default();
        assert_eq!(i.duty_percent, DEFAULT_DUTY_PERCENT);
        assert!(i.workers >= 1 && i.workers <= DEFAULT_MAX_WORKERS);
    }

    #[test]
    fn start_then_stop_joins_all_workers() {
        let mut stress = CpuStress::new();
        let intensity = quick();
        stress.start(intensity).unwrap();
        assert!(stress.is_running());
        assert_eq!(stress.active_workers(), intensity.workers);

        std::thread::sleep(Duration::from_millis(120));
        stress.stop();
        assert!(!stress.is_running());
        assert_eq!(stress.active_workers(), 0);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut stress = CpuStress::new();
        stress.stop();
        assert!(!stress.is_running());

        stress.start(quick()).unwrap();
        stress.stop();
        stress.stop();
        assert!(!stress.is_running());
        assert_eq!(stress.active_workers(), 0);
    }

    #[test]
    fn double_start_is_rejected() {
        let mut stress = CpuStress::new();
        stress.start(quick()).unwrap();
        let err = stress.start(quick()).unwrap_err();
        assert!(matches!(err, WorkloadError::AlreadyRunning));
        stress.stop();
    }

    #[test]
    fn restart_after_stop() {
        let mut stress = CpuStress::new();
        stress.start(quick()).unwrap();
        stress.stop();
        stress.start(quick()).unwrap();
        assert!(stress.is_running());
        stress.stop();
        assert_eq!(stress.active_workers(), 0);
    }

    #[test]
    fn drop_releases_workers() {
        let mut stress = CpuStress::new();
        stress.start(quick()).unwrap();
        let active = Arc::clone(&stress.active);
        drop(stress);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }
}
