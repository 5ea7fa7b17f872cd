//! Static-hold behaviour against a scripted 10Hz sensor.
//!
//! Sample timestamps are synthetic so the hold clock runs off the script,
//! while taring and deadlines use real (shortened) time.

use hang_core::mocks::{MemoryRecorder, RecordingDisplay, ScriptedSensor};
use hang_core::{IntervalTiming, PhaseTag, WorkInterval, Workout, WorkoutOutcome};
use hang_traits::{Context, ContextError, Force};
use std::time::{Duration, Instant};

const PERIOD: Duration = Duration::from_millis(100);

fn fast_timing() -> IntervalTiming {
    IntervalTiming {
        tare_window: Duration::from_millis(20),
        tare_settle: Duration::ZERO,
        safety_base: Duration::from_millis(50),
        ..IntervalTiming::default()
    }
}

/// 0N, then 500N from t=0.1s through t=5s with one dip at t=1s.
fn hold_with_dip(dip: i64) -> Vec<i64> {
    (0..=50)
        .map(|i| match i {
            0 => 0,
            10 => dip,
            _ => 500,
        })
        .collect()
}

fn run_hold(forces: &[i64]) -> (ScriptedSensor, RecordingDisplay, MemoryRecorder) {
    let mut sensor = ScriptedSensor::with_forces(Instant::now(), PERIOD, forces);
    let display = RecordingDisplay::new();
    let recorder = MemoryRecorder::new();
    let work = WorkInterval::new(Force::NEWTON * 400, Duration::from_secs(3)).with_timing(fast_timing());
    work.run(&Context::background(), &display, &mut sensor, &recorder)
        .expect("hold completes");
    (sensor, display, recorder)
}

#[test]
fn shallow_dip_keeps_the_hold_clock_running() {
    let forces = hold_with_dip(310);
    let (sensor, _display, recorder) = run_hold(&forces);

    // engaged at t=0.1s, complete at the first sample at or after t=3.1s
    let sessions = recorder.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].descriptor, "static-3s-400.0N");
    assert_eq!(sessions[0].outcome, Some(WorkoutOutcome::Success));
    assert_eq!(sessions[0].samples.len(), 32);
    assert!(sessions[0].closed);
    assert_eq!(sensor.remaining(), forces.len() - 32);
}

#[test]
fn deep_dip_restarts_the_hold_clock() {
    let forces = hold_with_dip(250);
    let (sensor, _display, recorder) = run_hold(&forces);

    // re-engaged at t=1.1s, so three more seconds are needed
    let sessions = recorder.sessions();
    assert_eq!(sessions[0].outcome, Some(WorkoutOutcome::Success));
    assert_eq!(sessions[0].samples.len(), 42);
    assert_eq!(sensor.remaining(), forces.len() - 42);
}

#[test]
fn display_walks_tare_wait_work_then_halts() {
    let (sensor, display, _recorder) = run_hold(&hold_with_dip(310));
    assert_eq!(sensor.tares(), &[IntervalTiming::default().tare_samples]);

    let tags = display.tags();
    assert_eq!(tags[0], PhaseTag::Tare);
    assert_eq!(tags[1], PhaseTag::Wait);
    // the 0N sample keeps waiting, everything after is work
    assert_eq!(tags[2], PhaseTag::Wait);
    assert!(tags[3..tags.len() - 1].iter().all(|t| *t == PhaseTag::Work));
    assert_eq!(display.last_tag(), Some(PhaseTag::Halt));

    let states = display.states();
    let work = &states[3];
    let expiry = work.expiring().expect("work counts down");
    let engaged = work.input_dependent().expect("work is input dependent");
    assert!(engaged.satisfied());
    assert_eq!(expiry.fallback().tag(), PhaseTag::Work);
    assert!(expiry.fallback().expiring().is_none());

    // one engagement, one countdown
    let since = expiry.since().expect("work knows when the hold began");
    assert!(states[3..states.len() - 1]
        .iter()
        .filter_map(|s| s.expiring())
        .all(|e| e.since() == Some(since) && e.deadline() == expiry.deadline()));
}

#[test]
fn running_out_of_time_is_a_recorded_failure() {
    let mut sensor = ScriptedSensor::with_forces(Instant::now(), PERIOD, &[100, 150, 200]);
    let display = RecordingDisplay::new();
    let recorder = MemoryRecorder::new();
    let work = WorkInterval::new(Force::NEWTON * 400, Duration::from_millis(100)).with_timing(fast_timing());

    let started = Instant::now();
    work.run(&Context::background(), &display, &mut sensor, &recorder)
        .expect("a failed hold is not an error");
    assert!(started.elapsed() >= work.safety_deadline());

    let sessions = recorder.sessions();
    assert_eq!(sessions[0].outcome, Some(WorkoutOutcome::Failure));
    assert_eq!(sessions[0].samples.len(), 3);
    assert_eq!(display.last_tag(), Some(PhaseTag::Halt));
}

#[test]
fn running_out_of_time_without_samples_records_nothing() {
    let mut sensor = ScriptedSensor::new();
    let display = RecordingDisplay::new();
    let recorder = MemoryRecorder::new();
    let work = WorkInterval::new(Force::NEWTON * 400, Duration::from_millis(50)).with_timing(fast_timing());

    work.run(&Context::background(), &display, &mut sensor, &recorder)
        .expect("still not an error");
    let sessions = recorder.sessions();
    assert_eq!(sessions[0].outcome, None);
    assert!(sessions[0].closed);
}

#[test]
fn cancellation_is_an_error_and_still_halts() {
    let mut sensor = ScriptedSensor::with_forces(Instant::now(), PERIOD, &[100]);
    let display = RecordingDisplay::new();
    let recorder = MemoryRecorder::new();
    let work = WorkInterval::new(Force::NEWTON * 400, Duration::from_secs(3)).with_timing(fast_timing());

    let ctx = Context::background().with_cancel();
    let canceller = ctx.clone();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(80));
        canceller.cancel();
    });

    let err = work
        .run(&ctx, &display, &mut sensor, &recorder)
        .expect_err("cancelled");
    handle.join().expect("canceller");
    assert!(err.is_cancelled());
    assert_eq!(err.context_error(), Some(ContextError::Cancelled));

    let sessions = recorder.sessions();
    assert_eq!(sessions[0].outcome, None);
    assert!(sessions[0].closed, "session closed on the way out");
    assert_eq!(display.last_tag(), Some(PhaseTag::Halt));
}

#[test]
fn failing_display_aborts_the_interval() {
    let mut sensor = ScriptedSensor::with_forces(Instant::now(), PERIOD, &[500]);
    let display = RecordingDisplay::failing();
    let recorder = MemoryRecorder::new();
    let work = WorkInterval::new(Force::NEWTON * 400, Duration::from_secs(3)).with_timing(fast_timing());

    let err = work
        .run(&Context::background(), &display, &mut sensor, &recorder)
        .expect_err("display error surfaces");
    assert!(matches!(err, hang_core::WorkoutError::Display(_)));
    assert!(recorder.sessions().is_empty(), "nothing started before the tare");
}
