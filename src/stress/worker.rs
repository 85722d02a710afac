//! A single stress worker: a timer-driven Busy/Idle state machine.
//!
//! Busy slices run bounded arithmetic bursts and re-check the clock and the
//! stop flag between bursts; Idle slices park the thread so `stop()` can wake
//! it immediately with `unpark`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::constants::{BUSY_BURST_ITERATIONS, MAX_DUTY_PERCENT, MIN_DUTY_PERCENT};

/// Busy and idle share of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyCycle {
    pub busy: Duration,
    pub idle: Duration,
}

impl DutyCycle {
    /// Split `period` into busy/idle by `percent`, clamped so idle is never zero.
    pub fn from_percent(percent: u8, period: Duration) -> Self {
        let pct = percent.clamp(MIN_DUTY_PERCENT, MAX_DUTY_PERCENT) as u32;
        let busy = period * pct / 100;
        Self {
            busy,
            idle: period.saturating_sub(busy),
        }
    }

    pub fn period(&self) -> Duration {
        self.busy + self.idle
    }
}

/// Per-worker state. Transitions only happen in [`WorkerState::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Busy { until: Instant },
    Idle { until: Instant },
    Stopped,
}

impl WorkerState {
    pub fn begin(now: Instant, cycle: &DutyCycle) -> Self {
        WorkerState::Busy {
            until: now + cycle.busy,
        }
    }

    /// Advance on the clock. A stop request wins over any timer.
    pub fn next(self, now: Instant, cycle: &DutyCycle, stop_requested: bool) -> Self {
        if stop_requested {
            return WorkerState::Stopped;
        }
        match self {
            WorkerState::Busy { until } if now >= until => WorkerState::Idle {
                until: now + cycle.idle,
            },
            WorkerState::Idle { until } if now >= until => WorkerState::Busy {
                until: now + cycle.busy,
            },
            other => other,
        }
    }
}

/// Counts live workers. Created before spawn and moved into the thread, so
/// the count also drops if the spawn itself fails.
pub(super) struct ActiveGuard {
    counter: Arc<AtomicUsize>,
}

impl ActiveGuard {
    pub(super) fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self {
            counter: Arc::clone(counter),
        }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Worker thread body.
pub(super) fn run(cycle: DutyCycle, stop: Arc<AtomicBool>, _guard: ActiveGuard) {
    lower_priority();

    let mut acc = 0x9E37_79B9_7F4A_7C15_u64;
    let mut state = WorkerState::begin(Instant::now(), &cycle);
    loop {
        state = state.next(Instant::now(), &cycle, stop.load(Ordering::Acquire));
        match state {
            WorkerState::Busy { .. } => acc = burn(acc, BUSY_BURST_ITERATIONS),
            WorkerState::Idle { until } => {
                thread::park_timeout(until.saturating_duration_since(Instant::now()));
            }
            WorkerState::Stopped => break,
        }
    }
    std::hint::black_box(acc);
}

/// LCG-style integer churn; keeps one core's ALUs busy without touching memory.
fn burn(mut x: u64, iterations: u32) -> u64 {
    for _ in 0..iterations {
        x = x
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407)
            .rotate_left(5);
    }
    std::hint::black_box(x)
}

/// Run stress workers at a lower scheduling priority than the POS foreground.
#[cfg(target_os = "linux")]
fn lower_priority() {
    // On Linux the nice value is per thread; who = 0 targets the calling thread.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, crate::constants::WORKER_NICE) };
    if rc != 0 {
        log::debug!(
            "setpriority failed for stress worker: {}",
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(target_os = "linux"))]
fn lower_priority() {}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle() -> DutyCycle {
        DutyCycle::from_percent(60, Duration::from_millis(500))
    }

    #[test]
    fn duty_split_matches_percent() {
        let c = cycle();
        assert_eq!(c.busy, Duration::from_millis(300));
        assert_eq!(c.idle, Duration::from_millis(200));
        assert_eq!(c.period(), Duration::from_millis(500));
    }

    #[test]
    fn duty_never_saturates() {
        let c = DutyCycle::from_percent(100, Duration::from_millis(1000));
        assert_eq!(c.busy, Duration::from_millis(900));
        assert!(c.idle > Duration::ZERO);

        let c = DutyCycle::from_percent(0, Duration::from_millis(1000));
        assert_eq!(c.busy, Duration::from_millis(100));
    }

    #[test]
    fn busy_stays_busy_until_deadline() {
        let t0 = Instant::now();
        let c = cycle();
        let s = WorkerState::begin(t0, &c);
        let s2 = s.next(t0 + Duration::from_millis(100), &c, false);
        assert_eq!(s, s2);
    }

    #[test]
    fn busy_then_idle_then_busy() {
        let t0 = Instant::now();
        let c = cycle();
        let s = WorkerState::begin(t0, &c);

        let t1 = t0 + Duration::from_millis(300);
        let s = s.next(t1, &c, false);
        assert_eq!(
            s,
            WorkerState::Idle {
                until: t1 + Duration::from_millis(200)
            }
        );

        let t2 = t1 + Duration::from_millis(200);
        let s = s.next(t2, &c, false);
        assert_eq!(
            s,
            WorkerState::Busy {
                until: t2 + Duration::from_millis(300)
            }
        );
    }

    #[test]
    fn stop_wins_from_any_state() {
        let t0 = Instant::now();
        let c = cycle();
        let busy = WorkerState::begin(t0, &c);
        let idle = WorkerState::Idle { until: t0 };
        assert_eq!(busy.next(t0, &c, true), WorkerState::Stopped);
        assert_eq!(idle.next(t0, &c, true), WorkerState::Stopped);
        assert_eq!(
            WorkerState::Stopped.next(t0, &c, false),
            WorkerState::Stopped
        );
    }

    #[test]
    fn guard_tracks_live_count() {
        let counter = Arc::new(AtomicUsize::new(0));
        let a = ActiveGuard::new(&counter);
        let b = ActiveGuard::new(&counter);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        drop(a);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        drop(b);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
