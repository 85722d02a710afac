//! Fixed-cadence telemetry capture.
//!
//! Tick `n` is scheduled at `start + n * interval`, so a slow tick never pushes
//! the rest of the schedule back. A tick that overruns past later deadlines
//! skips them instead of firing a burst.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

use super::AbortSignal;
use crate::models::SensorSample;
use crate::monitor::SensorPort;

/// Receiver of sampling ticks.
pub trait TickHandler {
    /// Checked at every deadline before sampling; false ends the loop.
    fn is_active(&mut self, elapsed: Duration) -> bool;

    /// One sample per tick. Failed fields arrive absent, never zeroed.
    fn on_tick(&mut self, elapsed: Duration, sample: SensorSample);
}

/// Why [`SamplingLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The handler reported itself inactive.
    Inactive,
    /// An abort was requested.
    Aborted,
}

pub struct SamplingLoop {
    interval: Duration,
    ticks: u64,
    skipped: u64,
}

impl SamplingLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ticks: 0,
            skipped: 0,
        }
    }

    /// Ticks that produced a sample.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Deadlines dropped because a tick overran.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Sample until the handler goes inactive or `abort` fires. The first
    /// tick fires immediately.
    pub async fn run(
        &mut self,
        sensor: &mut dyn SensorPort,
        handler: &mut impl TickHandler,
        abort: &mut AbortSignal,
    ) -> LoopExit {
        let start = Instant::now();
        let mut index: u32 = 0;

        loop {
            let Some(deadline) = self
                .interval
                .checked_mul(index)
                .and_then(|offset| start.checked_add(offset))
            else {
                log::warn!("tick {} is past the clock range; waiting for abort", index);
                abort.requested().await;
                return LoopExit::Aborted;
            };
            tokio::select! {
                biased;
                _ = abort.requested() => return LoopExit::Aborted,
                _ = sleep_until(deadline) => {}
            }

            let elapsed = start.elapsed();
            if !handler.is_active(elapsed) {
                return LoopExit::Inactive;
            }

            let sample = match sensor.sample() {
                Ok(sample) => {
                    let missing = sample.missing_fields();
                    if !missing.is_empty() {
                        log::debug!("tick {}: unavailable {}", index, missing.join(", "));
                    }
                    sample
                }
                Err(e) => {
                    log::warn!("tick {}: {}; recording absent values", index, e);
                    SensorSample::absent()
                }
            };
            handler.on_tick(elapsed, sample);
            self.ticks += 1;

            let (next, skipped) = next_index(index, self.interval, start.elapsed());
            if skipped > 0 {
                log::debug!("sampling overran: skipped {} deadline(s)", skipped);
                self.skipped += u64::from(skipped);
            }
            index = next;
        }
    }
}

/// Next deadline index after tick `index`, and how many deadlines were
/// already in the past. A deadline equal to `elapsed` still fires.
fn next_index(index: u32, interval: Duration, elapsed: Duration) -> (u32, u32) {
    let next = index.saturating_add(1);
    match interval.checked_mul(next) {
        Some(due) if !interval.is_zero() && due < elapsed => {}
        _ => return (next, 0),
    }
    let passed = (elapsed.as_nanos() / interval.as_nanos()) as u32;
    let first_future = passed.saturating_add(1);
    (first_future, first_future - next)
}
