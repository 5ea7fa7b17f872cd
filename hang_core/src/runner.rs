//! Top-level driver: runs one workout and reports how it went.
use crate::display::DisplaySink;
use crate::error::{Result, WorkoutError};
use crate::recorder::Recorder;
use crate::workout::Workout;
use eyre::WrapErr;
use hang_traits::{Context, Sensor};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub descriptor: String,
    pub elapsed: Duration,
}

/// Run `workout` to completion.
///
/// The returned report wraps the [`WorkoutError`]; callers can recover it
/// with `downcast_ref::<WorkoutError>()`.
pub fn run_workout(
    ctx: &Context,
    workout: &dyn Workout,
    display: &dyn DisplaySink,
    sensor: &mut dyn Sensor,
    recorder: &dyn Recorder,
) -> Result<RunReport> {
    let descriptor = workout.to_string();
    let started = Instant::now();
    tracing::info!(%descriptor, "workout started");

    let outcome: std::result::Result<(), WorkoutError> =
        workout.run(ctx, display, sensor, recorder);
    let elapsed = started.elapsed();
    let elapsed_ms = elapsed.as_millis() as u64;

    match outcome {
        Ok(()) => {
            tracing::info!(elapsed_ms, "workout finished");
            Ok(RunReport {
                descriptor,
                elapsed,
            })
        }
        Err(e) if e.is_cancelled() => {
            tracing::warn!(elapsed_ms, "workout cancelled");
            Err(e).wrap_err("workout cancelled")
        }
        Err(e) => {
            tracing::error!(elapsed_ms, error = %e, "workout aborted");
            Err(e).wrap_err_with(|| format!("workout {descriptor} failed"))
        }
    }
}
