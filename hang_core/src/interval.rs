//! Interval primitives: setup, timed work, rest, and the max test.
//!
//! Every interval derives its own bounded context from the caller's, shows
//! `Halt` on the way out (rest excepted: its state expires to `Halt` on its
//! own) and surfaces cancellation as an error.
use crate::analytics::TrailingWindow;
use crate::display::DisplaySink;
use crate::error::{RecordError, WorkoutError};
use crate::input::{ActualInput, EdgeTracker, ExpectedInput};
use crate::phase;
use crate::recorder::{CloseOnDrop, Recorder, Updater};
use crate::status::WorkoutOutcome;
use crate::util::fmt_duration;
use crate::workout::{HaltOnExit, Workout, read_sample};
use hang_traits::{Context, ContextError, Force, ForceSample, Sensor};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Timing constants shared by the intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalTiming {
    /// How long the tare state is shown before a work interval.
    pub tare_window: Duration,
    /// Delay before taring so the athlete can let go.
    pub tare_settle: Duration,
    pub tare_samples: usize,
    pub setup_tare_window: Duration,
    pub setup_tare_settle: Duration,
    pub setup_tare_samples: usize,
    /// Force that ends setup.
    pub engagement_floor: Force,
    /// Rise that lights up a rising-edge input.
    pub edge_min_delta: Force,
    /// Work intervals fail after `safety_base + 2 * time_under_tension`.
    pub safety_base: Duration,
}

impl Default for IntervalTiming {
    fn default() -> Self {
        Self {
            tare_window: Duration::from_secs(2),
            tare_settle: Duration::from_secs(1),
            tare_samples: 20,
            setup_tare_window: Duration::from_secs(5),
            setup_tare_settle: Duration::from_secs(1),
            setup_tare_samples: 40,
            engagement_floor: Force::POUND_FORCE * 20,
            edge_min_delta: Force::NEWTON * 100,
            safety_base: Duration::from_secs(15),
        }
    }
}

/// Show a tare state for `window`, tare after `settle`, then wait out the window.
fn tare_under_display(
    ctx: &Context,
    display: &dyn DisplaySink,
    sensor: &mut dyn Sensor,
    window: Duration,
    settle: Duration,
    samples: usize,
) -> Result<(), WorkoutError> {
    let done = Instant::now() + window;
    display.update_state(phase::tare(done))?;
    ctx.sleep(settle)?;
    sensor.tare(ctx, samples)?;
    ctx.sleep(done.saturating_duration_since(Instant::now()))?;
    Ok(())
}

// ── Setup ───────────────────────────────────────────────────────────────────

/// Tare, then wait for the athlete to grab the board.
#[derive(Debug, Clone)]
pub struct SetupInterval {
    duration: Duration,
    timing: IntervalTiming,
}

impl SetupInterval {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            timing: IntervalTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: IntervalTiming) -> Self {
        self.timing = timing;
        self
    }
}

impl fmt::Display for SetupInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "setup-{}", fmt_duration(self.duration))
    }
}

impl Workout for SetupInterval {
    fn run(
        &self,
        ctx: &Context,
        display: &dyn DisplaySink,
        sensor: &mut dyn Sensor,
        _recorder: &dyn Recorder,
    ) -> Result<(), WorkoutError> {
        let ctx = ctx.with_timeout(self.duration);
        let _halt = HaltOnExit::new(display);
        let t = &self.timing;

        tare_under_display(
            &ctx,
            display,
            sensor,
            t.setup_tare_window,
            t.setup_tare_settle,
            t.setup_tare_samples,
        )?;

        let edge = Arc::new(EdgeTracker::new());
        display.update_state(phase::wait_for_input(
            ExpectedInput::rising_edge(t.edge_min_delta),
            ActualInput::Edge(Arc::clone(&edge)),
        ))?;
        loop {
            let sample = read_sample(&ctx, sensor)?;
            edge.update(&[sample]);
            if sample.force >= t.engagement_floor {
                tracing::info!(force = %sample.force, "athlete engaged");
                return Ok(());
            }
        }
    }
}

// ── Work ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tension {
    Idle,
    Engaged { since: Instant },
}

/// Hysteresis tracker for a static hold.
///
/// Engages above `threshold`, stays engaged while above 75% of it, and is
/// complete once engaged for `time_under_tension` with the latest sample back
/// at or above `threshold`.
#[derive(Debug, Clone)]
pub struct HoldTracker {
    threshold: Force,
    time_under_tension: Duration,
    state: Tension,
}

impl HoldTracker {
    pub fn new(threshold: Force, time_under_tension: Duration) -> Self {
        Self {
            threshold,
            time_under_tension,
            state: Tension::Idle,
        }
    }

    pub fn state(&self) -> Tension {
        self.state
    }

    /// Feed one sample; true once the hold is complete.
    pub fn observe(&mut self, sample: ForceSample) -> bool {
        match self.state {
            Tension::Engaged { since } if sample.force * 4 > self.threshold * 3 => {
                return sample.time.saturating_duration_since(since) >= self.time_under_tension
                    && sample.force >= self.threshold;
            }
            _ => {}
        }
        self.state = if sample.force > self.threshold {
            Tension::Engaged { since: sample.time }
        } else {
            Tension::Idle
        };
        false
    }
}

/// Hold at least `threshold` for `time_under_tension`.
#[derive(Debug, Clone)]
pub struct WorkInterval {
    threshold: Force,
    time_under_tension: Duration,
    timing: IntervalTiming,
}

impl WorkInterval {
    pub fn new(threshold: Force, time_under_tension: Duration) -> Self {
        Self {
            threshold,
            time_under_tension,
            timing: IntervalTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: IntervalTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Time after taring before the interval gives up.
    pub fn safety_deadline(&self) -> Duration {
        self.timing.safety_base + self.time_under_tension * 2
    }

    fn hold(
        &self,
        ctx: &Context,
        display: &dyn DisplaySink,
        sensor: &mut dyn Sensor,
        session: &dyn Updater,
    ) -> Result<(), WorkoutError> {
        let required = ExpectedInput::Force(self.threshold);
        display.update_state(phase::wait_for_input(required, ActualInput::None))?;

        let mut tracker = HoldTracker::new(self.threshold, self.time_under_tension);
        loop {
            let sample = read_sample(ctx, sensor)?;
            tracing::trace!(force = %sample.force, "sample");
            session.write(&[sample])?;

            let before = tracker.state();
            if tracker.observe(sample) {
                tracing::info!(interval = %self, "hold complete");
                session.finish(WorkoutOutcome::Success)?;
                return Ok(());
            }

            let received = ActualInput::Force(sample.force);
            let state = match tracker.state() {
                Tension::Engaged { since } => phase::work(
                    required,
                    received,
                    since,
                    since + self.time_under_tension,
                ),
                Tension::Idle => phase::wait_for_input(required, received),
            };
            if tracker.state() != before {
                tracing::debug!(tension = ?tracker.state(), "tension changed");
            }
            display.update_state(state)?;
        }
    }
}

impl fmt::Display for WorkInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "static-{}-{}",
            fmt_duration(self.time_under_tension),
            self.threshold
        )
    }
}

impl Workout for WorkInterval {
    fn run(
        &self,
        ctx: &Context,
        display: &dyn DisplaySink,
        sensor: &mut dyn Sensor,
        recorder: &dyn Recorder,
    ) -> Result<(), WorkoutError> {
        let _halt = HaltOnExit::new(display);
        let t = &self.timing;
        tare_under_display(
            ctx,
            display,
            sensor,
            t.tare_window,
            t.tare_settle,
            t.tare_samples,
        )?;

        let ctx = ctx.with_timeout(self.safety_deadline());
        let session = CloseOnDrop::new(recorder.start(&ctx, &self.to_string())?);
        // Running out of time is a failed hold, not an error.
        match self.hold(&ctx, display, sensor, &session) {
            Err(e) if e.context_error() == Some(ContextError::DeadlineExceeded) => {
                tracing::warn!(interval = %self, "time ran out before the hold was complete");
                match session.finish(WorkoutOutcome::Failure) {
                    Err(RecordError::NoData) => {
                        tracing::warn!(interval = %self, "no samples arrived; nothing recorded");
                        Ok(())
                    }
                    other => Ok(other?),
                }
            }
            other => other,
        }
    }
}

// ── Rest ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestInterval(pub Duration);

impl fmt::Display for RestInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rest-{}", fmt_duration(self.0))
    }
}

impl Workout for RestInterval {
    fn run(
        &self,
        ctx: &Context,
        display: &dyn DisplaySink,
        _sensor: &mut dyn Sensor,
        _recorder: &dyn Recorder,
    ) -> Result<(), WorkoutError> {
        let rest = ctx.with_timeout(self.0);
        display.update_state(phase::rest(Instant::now() + self.0))?;
        let why = rest.wait();
        tracing::debug!(reason = %why, "rest over");
        ctx.check()?;
        Ok(())
    }
}

// ── Max test ────────────────────────────────────────────────────────────────

/// Pull as hard as possible; done once the best pull so far has gone
/// unbeaten for a whole `hold`.
#[derive(Debug, Clone)]
pub struct MaxTest {
    hold: Duration,
    timing: IntervalTiming,
}

impl MaxTest {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            timing: IntervalTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: IntervalTiming) -> Self {
        self.timing = timing;
        self
    }
}

impl fmt::Display for MaxTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "max-test-{}", fmt_duration(self.hold))
    }
}

impl Workout for MaxTest {
    fn run(
        &self,
        ctx: &Context,
        display: &dyn DisplaySink,
        sensor: &mut dyn Sensor,
        recorder: &dyn Recorder,
    ) -> Result<(), WorkoutError> {
        let _halt = HaltOnExit::new(display);
        let ctx = ctx.with_timeout(self.hold * 3);
        let session = CloseOnDrop::new(recorder.start(&ctx, &self.to_string())?);

        let edge = Arc::new(EdgeTracker::new());
        display.update_state(phase::wait_for_input(
            ExpectedInput::rising_edge(self.timing.edge_min_delta),
            ActualInput::Edge(Arc::clone(&edge)),
        ))?;

        let mut window = TrailingWindow::new(self.hold);
        let mut best = Force::ZERO;
        loop {
            let sample = read_sample(&ctx, sensor)?;
            tracing::trace!(force = %sample.force, "sample");
            session.write(&[sample])?;
            edge.update(&[sample]);
            best = best.max(sample.force);
            window.push(sample);
            if window.ready() && best > window.max() {
                tracing::info!(peak = %best, "max test complete");
                session.finish(WorkoutOutcome::Success)?;
                return Ok(());
            }
        }
    }
}
