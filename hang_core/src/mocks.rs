//! Test and helper mocks for hang_core
use crate::display::DisplaySink;
use crate::error::{DisplayError, RecordError};
use crate::phase::{PhaseState, PhaseTag};
use crate::recorder::{Recorder, Updater};
use crate::status::WorkoutOutcome;
use hang_traits::{Context, Force, ForceSample, Sensor, SensorError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A sensor that replays a fixed script of readings.
///
/// Once the script runs out, `read` blocks until the context is done.
#[derive(Debug, Default)]
pub struct ScriptedSensor {
    script: VecDeque<Result<ForceSample, SensorError>>,
    pace: Option<Duration>,
    tares: Vec<usize>,
    resets: usize,
    halted: bool,
}

impl ScriptedSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole-newton readings spaced `period` apart starting at `t0`.
    pub fn with_forces(t0: Instant, period: Duration, newtons: &[i64]) -> Self {
        let mut s = Self::new();
        for (i, n) in newtons.iter().enumerate() {
            s.script.push_back(Ok(ForceSample::new(
                Force::NEWTON * *n,
                t0 + period * i as u32,
            )));
        }
        s
    }

    pub fn then(mut self, reading: Result<ForceSample, SensorError>) -> Self {
        self.script.push_back(reading);
        self
    }

    /// Really sleep this long before every read.
    pub fn paced(mut self, every: Duration) -> Self {
        self.pace = Some(every);
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Sample counts of every tare so far.
    pub fn tares(&self) -> &[usize] {
        &self.tares
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    pub fn halted(&self) -> bool {
        self.halted
    }
}

impl Sensor for ScriptedSensor {
    fn tare(&mut self, ctx: &Context, samples: usize) -> Result<(), SensorError> {
        ctx.check()?;
        if samples == 0 {
            return Err(SensorError::NotEnoughSamples(samples));
        }
        self.tares.push(samples);
        Ok(())
    }

    fn reset(&mut self, ctx: &Context) -> Result<(), SensorError> {
        ctx.check()?;
        self.resets += 1;
        Ok(())
    }

    fn halt(&mut self) -> Result<(), SensorError> {
        self.halted = true;
        Ok(())
    }

    fn read(&mut self, ctx: &Context) -> Result<ForceSample, SensorError> {
        ctx.check()?;
        if let Some(every) = self.pace {
            ctx.sleep(every)?;
        }
        match self.script.pop_front() {
            Some(reading) => reading,
            None => Err(ctx.wait().into()),
        }
    }
}

/// Remembers every state it is shown.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    states: Mutex<Vec<PhaseState>>,
    fail: bool,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// A display whose every update fails (after being recorded).
    pub fn failing() -> Self {
        Self {
            states: Mutex::default(),
            fail: true,
        }
    }

    pub fn states(&self) -> Vec<PhaseState> {
        lock(&self.states).clone()
    }

    pub fn tags(&self) -> Vec<PhaseTag> {
        lock(&self.states).iter().map(PhaseState::tag).collect()
    }

    pub fn last_tag(&self) -> Option<PhaseTag> {
        lock(&self.states).last().map(PhaseState::tag)
    }
}

impl DisplaySink for RecordingDisplay {
    fn update_state(&self, state: PhaseState) -> Result<(), DisplayError> {
        lock(&self.states).push(state);
        if self.fail {
            return Err(DisplayError::Sink("display unplugged".into()));
        }
        Ok(())
    }
}

/// What a [`MemoryRecorder`] saw for one session.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    pub descriptor: String,
    pub samples: Vec<ForceSample>,
    pub outcome: Option<WorkoutOutcome>,
    pub closed: bool,
}

/// Keeps sessions in memory for inspection; clones share the log.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecorder {
    sessions: Arc<Mutex<Vec<SessionLog>>>,
    fail_start: bool,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder whose `start` always fails.
    pub fn failing() -> Self {
        Self {
            sessions: Arc::default(),
            fail_start: true,
        }
    }

    pub fn sessions(&self) -> Vec<SessionLog> {
        lock(&self.sessions).clone()
    }
}

impl Recorder for MemoryRecorder {
    fn start(&self, _ctx: &Context, descriptor: &str) -> Result<Box<dyn Updater>, RecordError> {
        if self.fail_start {
            return Err(RecordError::Io(std::io::Error::other("recorder unavailable")));
        }
        let mut sessions = lock(&self.sessions);
        sessions.push(SessionLog {
            descriptor: descriptor.to_string(),
            ..SessionLog::default()
        });
        Ok(Box::new(MemoryUpdater {
            sessions: Arc::clone(&self.sessions),
            index: sessions.len() - 1,
        }))
    }
}

struct MemoryUpdater {
    sessions: Arc<Mutex<Vec<SessionLog>>>,
    index: usize,
}

impl MemoryUpdater {
    fn with_log<T>(&self, f: impl FnOnce(&mut SessionLog) -> T) -> T {
        f(&mut lock(&self.sessions)[self.index])
    }
}

impl Updater for MemoryUpdater {
    fn write(&self, samples: &[ForceSample]) -> Result<(), RecordError> {
        self.with_log(|log| {
            if log.closed {
                return Err(RecordError::WriteAfterClosed);
            }
            log.samples.extend_from_slice(samples);
            Ok(())
        })
    }

    fn finish(&self, outcome: WorkoutOutcome) -> Result<(), RecordError> {
        self.with_log(|log| {
            if log.closed {
                return Err(RecordError::WriteAfterClosed);
            }
            if log.samples.is_empty() {
                return Err(RecordError::NoData);
            }
            log.outcome = Some(outcome);
            log.closed = true;
            Ok(())
        })
    }

    fn close(&self) {
        self.with_log(|log| log.closed = true);
    }
}
