//! Session orchestration: Idle → Stress → Complete.
//!
//! [`PhaseController`] owns the session, the sensor and the workload for the
//! whole run. It drives a [`SamplingLoop`] and decides phase transitions at
//! each tick; the loop only knows about time and samples. The workload is
//! released on every exit path (finished, aborted, failed start).

mod sampler;

pub use sampler::{LoopExit, SamplingLoop, TickHandler};

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::{mpsc, watch};

use crate::models::{CompletedSession, CompletionStatus, Phase, Reading, SensorSample, Session};
use crate::monitor::SensorPort;
use crate::stress::{StressIntensity, Workload};

// ── Abort ─────────────────────────────────────────────────────────

/// Requests an abort. Cheap to clone; any clone may fire it.
#[derive(Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

/// Observes an abort request.
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// Resolves once an abort has been requested. Never resolves if every
    /// handle is dropped without aborting.
    pub async fn requested(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// A connected abort handle / signal pair.
pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx: Arc::new(tx) }, AbortSignal { rx })
}

// ── Plan and events ───────────────────────────────────────────────

/// Timing and intensity of one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionPlan {
    pub idle: Duration,
    pub stress: Duration,
    pub interval: Duration,
    pub intensity: StressIntensity,
}

impl SessionPlan {
    pub fn total(&self) -> Duration {
        self.idle.saturating_add(self.stress)
    }
}

/// Live progress for the presentation layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    PhaseChanged {
        phase: Phase,
        at: Duration,
    },
    Tick {
        reading: Reading,
        /// 0–100.
        progress: f32,
        remaining: Duration,
    },
    Completed {
        status: CompletionStatus,
        readings: usize,
    },
}

// ── Controller ────────────────────────────────────────────────────

/// Drives one diagnostic session to completion.
pub struct PhaseController {
    plan: SessionPlan,
    sensor: Box<dyn SensorPort>,
    driver: Driver,
}

impl PhaseController {
    pub fn new(plan: SessionPlan, sensor: Box<dyn SensorPort>, workload: Box<dyn Workload>) -> Self {
        Self {
            plan,
            sensor,
            driver: Driver {
                plan,
                session: Session::new(plan.interval, plan.intensity),
                workload,
                workload_released: false,
                stress_started: None,
                outcome: None,
                events: None,
            },
        }
    }

    /// Publish progress events on `tx`. Send failures are ignored.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.driver.events = Some(tx);
        self
    }

    /// Run Idle → Stress → Complete, or until `abort` fires.
    pub async fn run(mut self, mut abort: AbortSignal) -> CompletedSession {
        log::info!(
            "session started: idle {}s, stress {}s, interval {}s",
            self.plan.idle.as_secs(),
            self.plan.stress.as_secs(),
            self.plan.interval.as_secs()
        );

        let started = tokio::time::Instant::now();
        let mut sampler = SamplingLoop::new(self.plan.interval);
        let exit = sampler
            .run(self.sensor.as_mut(), &mut self.driver, &mut abort)
            .await;

        if exit == LoopExit::Aborted {
            let at = started.elapsed();
            log::warn!("abort requested at {:.1}s", at.as_secs_f32());
            self.driver.finish_with(CompletionStatus::Aborted, at);
        }
        log::debug!("sampler fired {} tick(s)", sampler.ticks());
        if sampler.skipped() > 0 {
            log::warn!("{} sampling deadline(s) skipped", sampler.skipped());
        }

        let sources = self.sensor.temp_sources();
        self.driver
            .into_completed(started.elapsed())
            .with_temp_sources(sources)
    }
}

/// Tick-side state of the controller: the session, the workload and the
/// transition bookkeeping.
struct Driver {
    plan: SessionPlan,
    session: Session,
    workload: Box<dyn Workload>,
    workload_released: bool,
    /// Session offset at which Stress began.
    stress_started: Option<Duration>,
    /// Final status and the offset it was reached at.
    outcome: Option<(CompletionStatus, Duration)>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl Driver {
    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Stop the workload exactly once, whatever the exit path.
    fn release_workload(&mut self) {
        if !self.workload_released {
            self.workload.stop();
            self.workload_released = true;
        }
    }

    fn enter_stress(&mut self, at: Duration) -> bool {
        if let Err(e) = self.workload.start(self.plan.intensity) {
            log::error!("stress workload failed to start: {}", e);
            self.finish_with(
                CompletionStatus::TerminatedEarly {
                    reason: e.to_string(),
                },
                at,
            );
            return false;
        }
        if self.session.advance(Phase::Stress, at) {
            log::info!("phase idle -> stress at {:.1}s", at.as_secs_f32());
            self.emit(SessionEvent::PhaseChanged {
                phase: Phase::Stress,
                at,
            });
        }
        self.stress_started = Some(at);
        true
    }

    /// Release the workload and seal the phase as Complete. The first
    /// outcome wins.
    fn finish_with(&mut self, status: CompletionStatus, at: Duration) {
        self.release_workload();
        if self.outcome.is_some() {
            return;
        }
        let from = self.session.phase();
        if self.session.advance(Phase::Complete, at) {
            log::info!("phase {} -> complete at {:.1}s", from, at.as_secs_f32());
            self.emit(SessionEvent::PhaseChanged {
                phase: Phase::Complete,
                at,
            });
        }
        self.outcome = Some((status, at));
    }

    fn into_completed(mut self, fallback_elapsed: Duration) -> CompletedSession {
        self.release_workload();
        let (status, elapsed) = self
            .outcome
            .take()
            .unwrap_or((CompletionStatus::Finished, fallback_elapsed));
        self.emit(SessionEvent::Completed {
            status: status.clone(),
            readings: self.session.readings().len(),
        });
        log::info!(
            "session complete: {} reading(s) over {:.1}s",
            self.session.readings().len(),
            elapsed.as_secs_f32()
        );
        self.session.complete(status, elapsed)
    }

    fn progress(&self, elapsed: Duration) -> (f32, Duration) {
        let total = self.plan.total();
        if total.is_zero() {
            return (100.0, Duration::ZERO);
        }
        let pct = (elapsed.as_secs_f32() / total.as_secs_f32() * 100.0).min(100.0);
        (pct, total.saturating_sub(elapsed))
    }
}

impl TickHandler for Driver {
    fn is_active(&mut self, elapsed: Duration) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        match self.session.phase() {
            Phase::Idle if elapsed >= self.plan.idle => self.enter_stress(elapsed),
            Phase::Stress => {
                let since = elapsed.saturating_sub(self.stress_started.unwrap_or(self.plan.idle));
                if since >= self.plan.stress {
                    self.finish_with(CompletionStatus::Finished, elapsed);
                    return false;
                }
                true
            }
            Phase::Idle => true,
            Phase::Complete => false,
        }
    }

    fn on_tick(&mut self, elapsed: Duration, sample: SensorSample) {
        let reading = Reading::new(Local::now(), elapsed, self.session.phase(), sample);
        if !self.session.record(reading.clone()) {
            log::debug!("reading at {:?} rejected", elapsed);
            return;
        }
        let (progress, remaining) = self.progress(elapsed);
        self.emit(SessionEvent::Tick {
            reading,
            progress,
            remaining,
        });
    }
}
