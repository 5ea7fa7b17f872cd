//! The workout abstraction and its sequential combinator.
use crate::display::DisplaySink;
use crate::error::WorkoutError;
use crate::phase;
use crate::recorder::Recorder;
use hang_traits::{Context, ForceSample, Sensor, SensorError};
use std::fmt;
use std::sync::Arc;

/// Something that can be run against a sensor, a display and a recorder.
///
/// The `Display` impl is the workout's descriptor, used for logging and as
/// the recording name.
pub trait Workout: fmt::Display + Send + Sync {
    fn run(
        &self,
        ctx: &Context,
        display: &dyn DisplaySink,
        sensor: &mut dyn Sensor,
        recorder: &dyn Recorder,
    ) -> Result<(), WorkoutError>;
}

/// Runs its children strictly in order; the first error aborts the rest.
#[derive(Clone, Default)]
pub struct Composite {
    workouts: Vec<Arc<dyn Workout>>,
}

impl Composite {
    pub fn new(workouts: Vec<Arc<dyn Workout>>) -> Self {
        Self { workouts }
    }

    pub fn push(&mut self, workout: Arc<dyn Workout>) {
        self.workouts.push(workout);
    }

    pub fn len(&self) -> usize {
        self.workouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty()
    }
}

impl fmt::Display for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, w) in self.workouts.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{w}")?;
        }
        Ok(())
    }
}

impl Workout for Composite {
    fn run(
        &self,
        ctx: &Context,
        display: &dyn DisplaySink,
        sensor: &mut dyn Sensor,
        recorder: &dyn Recorder,
    ) -> Result<(), WorkoutError> {
        for workout in &self.workouts {
            ctx.check()?;
            tracing::info!(workout = %workout, "starting");
            workout.run(ctx, display, sensor, recorder)?;
        }
        Ok(())
    }
}

/// Shows `Halt` when dropped. Failure to do so is logged, never returned.
pub(crate) struct HaltOnExit<'a> {
    display: &'a dyn DisplaySink,
}

impl<'a> HaltOnExit<'a> {
    pub(crate) fn new(display: &'a dyn DisplaySink) -> Self {
        Self { display }
    }
}

impl Drop for HaltOnExit<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.display.update_state(phase::halt()) {
            tracing::warn!(error = %e, "failed to show halt");
        }
    }
}

/// Read one sample, dropping transient bad reads.
pub(crate) fn read_sample(
    ctx: &Context,
    sensor: &mut dyn Sensor,
) -> Result<ForceSample, SensorError> {
    loop {
        ctx.check()?;
        match sensor.read(ctx) {
            Err(e) if e.is_transient() => tracing::warn!(error = %e, "discarding sample"),
            other => return other,
        }
    }
}
