use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use super::{Phase, Reading, TempSource};
use crate::stress::StressIntensity;

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompletionStatus {
    /// Both phases ran their full length.
    Finished,
    /// An external abort truncated the session.
    Aborted,
    /// A fault (e.g. the workload could not start) ended the session early.
    TerminatedEarly { reason: String },
}

impl CompletionStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, CompletionStatus::Finished)
    }
}

/// A recorded phase change, relative to session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
    #[serde(rename = "at_ms", serialize_with = "serialize_millis")]
    pub at: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// A diagnostic session while it is running.
///
/// Owned by the phase controller, which is the only writer. Readings are
/// append-only and ordered by offset; the phase only moves forward.
#[derive(Debug)]
pub struct Session {
    phase: Phase,
    started_at: DateTime<Local>,
    interval: Duration,
    intensity: StressIntensity,
    readings: Vec<Reading>,
    transitions: Vec<PhaseTransition>,
}

impl Session {
    pub fn new(interval: Duration, intensity: StressIntensity) -> Self {
        Self {
            phase: Phase::Idle,
            started_at: Local::now(),
            interval,
            intensity,
            readings: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// Move to `next`. Returns false (and changes nothing) for a non-forward move.
    pub(crate) fn advance(&mut self, next: Phase, at: Duration) -> bool {
        if next <= self.phase {
            return false;
        }
        self.transitions.push(PhaseTransition {
            from: self.phase,
            to: next,
            at,
        });
        self.phase = next;
        true
    }

    /// Append a reading. Rejected once Complete or if it would break offset order.
    pub(crate) fn record(&mut self, reading: Reading) -> bool {
        if self.phase == Phase::Complete {
            return false;
        }
        if let Some(last) = self.readings.last() {
            if reading.offset < last.offset {
                return false;
            }
        }
        self.readings.push(reading);
        true
    }

    /// Seal the session. Forces the phase to Complete if it is not already.
    pub(crate) fn complete(mut self, status: CompletionStatus, elapsed: Duration) -> CompletedSession {
        self.advance(Phase::Complete, elapsed);
        CompletedSession {
            session: self,
            status,
            elapsed,
            ended_at: Local::now(),
            temp_sources: (TempSource::Unavailable, TempSource::Unavailable),
        }
    }
}

/// A finished session, read-only. Only the phase controller can build one,
/// so consumers never observe an Idle or Stress session.
#[derive(Debug)]
pub struct CompletedSession {
    session: Session,
    status: CompletionStatus,
    elapsed: Duration,
    ended_at: DateTime<Local>,
    /// CPU and SSD temperature methods the sensor ended up using.
    temp_sources: (TempSource, TempSource),
}

impl CompletedSession {
    pub(crate) fn with_temp_sources(mut self, sources: (TempSource, TempSource)) -> Self {
        self.temp_sources = sources;
        self
    }

    pub fn temp_sources(&self) -> (TempSource, TempSource) {
        self.temp_sources
    }

    pub fn readings(&self) -> &[Reading] {
        &self.session.readings
    }

    pub fn status(&self) -> &CompletionStatus {
        &self.status
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn transitions(&self) -> &[PhaseTransition] {
        &self.session.transitions
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.session.started_at
    }

    pub fn ended_at(&self) -> DateTime<Local> {
        self.ended_at
    }

    /// Monotonic session length.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn interval(&self) -> Duration {
        self.session.interval
    }

    pub fn intensity(&self) -> StressIntensity {
        self.session.intensity
    }

    /// Whether the reading count matches elapsed / interval within one tick.
    pub fn cadence_holds(&self) -> bool {
        let interval = self.session.interval.as_secs_f64();
        if interval <= 0.0 {
            return false;
        }
        let expected = self.elapsed.as_secs_f64() / interval;
        (self.readings().len() as f64 - expected).abs() <= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SensorSample;

    fn reading_at(secs: u64, phase: Phase) -> Reading {
        Reading::new(
            Local::now(),
            Duration::from_secs(secs),
            phase,
            SensorSample::absent(),
        )
    }

    fn session() -> Session {
        Session::new(Duration::from_secs(1), StressIntensity::default())
    }

    #[test]
    fn phase_never_regresses() {
        let mut s = session();
        assert!(s.advance(Phase::Stress, Duration::from_secs(2)));
        assert!(!s.advance(Phase::Idle, Duration::from_secs(3)));
        assert!(!s.advance(Phase::Stress, Duration::from_secs(3)));
        assert_eq!(s.phase(), Phase::Stress);
        assert_eq!(s.transitions.len(), 1);
    }

    #[test]
    fn record_rejects_out_of_order_offsets() {
        let mut s = session();
        assert!(s.record(reading_at(2, Phase::Idle)));
        assert!(!s.record(reading_at(1, Phase::Idle)));
        assert!(s.record(reading_at(2, Phase::Idle)));
        assert_eq!(s.readings().len(), 2);
    }

    #[test]
    fn complete_seals_and_refuses_more() {
        let mut s = session();
        s.record(reading_at(0, Phase::Idle));
        s.advance(Phase::Complete, Duration::from_secs(1));
        assert!(!s.record(reading_at(1, Phase::Idle)));

        let done = s.complete(CompletionStatus::Aborted, Duration::from_secs(1));
        assert_eq!(done.phase(), Phase::Complete);
        assert_eq!(done.readings().len(), 1);
        assert_eq!(done.status(), &CompletionStatus::Aborted);
        // Already Complete: no duplicate transition.
        assert_eq!(done.transitions().len(), 1);
    }

    #[test]
    fn cadence_tolerance_is_one_tick() {
        let mut s = session();
        for i in 0..4 {
            s.record(reading_at(i, Phase::Idle));
        }
        let done = s.complete(CompletionStatus::Finished, Duration::from_secs(5));
        assert!(done.cadence_holds());

        let mut s = session();
        s.record(reading_at(0, Phase::Idle));
        let done = s.complete(CompletionStatus::Finished, Duration::from_secs(5));
        assert!(!done.cadence_holds());
    }

    #[test]
    fn completion_status_flags() {
        assert!(CompletionStatus::Finished.is_finished());
        assert!(!CompletionStatus::Aborted.is_finished());
        assert!(!CompletionStatus::TerminatedEarly {
            reason: "spawn failed".into()
        }
        .is_finished());
    }
}
