//! Sampler thread lifecycle and freshness.
//!
//! Verifies that:
//! - Threads are cleaned up when the Sampler is dropped or halted
//! - A slow consumer sees the freshest samples, not a backlog
//! - Taring goes through to the sensor and discards queued samples
//! - A read still in flight during a tare never surfaces afterwards

use hang_core::mocks::ScriptedSensor;
use hang_core::sampler::{Sampler, stall_window};
use hang_traits::clock::MonotonicClock;
use hang_traits::{Context, Force, ForceSample, Sensor, SensorError};
use std::time::{Duration, Instant};

const PERIOD: Duration = Duration::from_millis(100);
const STALL: Duration = Duration::from_millis(200);

fn script(newtons: &[i64]) -> ScriptedSensor {
    ScriptedSensor::with_forces(Instant::now(), PERIOD, newtons)
}

#[test]
fn sampler_thread_exits_on_drop() {
    let sampler = Sampler::spawn_event(script(&[]), 8, STALL);
    std::thread::sleep(Duration::from_millis(30));
    // The thread is parked in an exhausted script; drop must unblock and join it.
    drop(sampler);
}

#[test]
fn multiple_samplers_dont_leak_threads() {
    for _ in 0..10 {
        let mut sampler = Sampler::spawn(script(&[1, 2, 3]), 100, 8, STALL, MonotonicClock::new());
        let first = sampler.read(&Context::background()).expect("first sample");
        assert_eq!(first.force, Force::NEWTON);
        drop(sampler);
    }
}

#[test]
fn reads_arrive_in_order_then_stall() {
    let mut sampler = Sampler::spawn_event(script(&[10, 20, 30]), 8, STALL);
    let ctx = Context::background();
    let got: Vec<_> = (0..3)
        .map(|_| sampler.read(&ctx).expect("sample").force.whole_newtons())
        .collect();
    assert_eq!(got, vec![10, 20, 30]);

    let started = Instant::now();
    assert_eq!(sampler.read(&ctx), Err(SensorError::Timeout));
    assert!(started.elapsed() >= STALL);
}

#[test]
fn slow_consumer_gets_the_freshest_samples() {
    let mut sampler = Sampler::spawn_event(script(&[1, 2, 3, 4, 5]), 2, STALL);
    std::thread::sleep(Duration::from_millis(50));
    let ctx = Context::background();
    assert_eq!(sampler.read(&ctx).expect("sample").force, Force::NEWTON * 4);
    assert_eq!(sampler.read(&ctx).expect("sample").force, Force::NEWTON * 5);
}

#[test]
fn tare_discards_samples_queued_before_it() {
    let mut sampler = Sampler::spawn_event(script(&[1, 2, 3]), 8, STALL);
    std::thread::sleep(Duration::from_millis(50));
    let ctx = Context::background();
    sampler.tare(&ctx, 10).expect("tare");
    assert_eq!(sampler.read(&ctx), Err(SensorError::Timeout));
}

#[test]
fn tare_errors_come_from_the_sensor() {
    let mut sampler = Sampler::spawn_event(script(&[]), 8, STALL);
    assert_eq!(
        sampler.tare(&Context::background(), 0),
        Err(SensorError::NotEnoughSamples(0))
    );
}

#[test]
fn read_honours_the_callers_context() {
    let mut sampler = Sampler::spawn_event(script(&[]), 8, Duration::from_secs(5));
    let ctx = Context::background().with_timeout(Duration::from_millis(30));
    assert!(matches!(
        sampler.read(&ctx),
        Err(SensorError::Context(hang_traits::ContextError::DeadlineExceeded))
    ));
}

#[test]
fn halt_stops_the_thread() {
    let mut sampler = Sampler::spawn_event(script(&[]), 8, Duration::from_secs(5));
    sampler.halt().expect("halt");
    let started = Instant::now();
    assert_eq!(
        sampler.read(&Context::background()),
        Err(SensorError::Disconnected)
    );
    assert!(started.elapsed() < Duration::from_secs(5));
}

/// Reads a constant 100N minus whatever the last tare zeroed out.
struct Offset {
    offset: Force,
}

impl Sensor for Offset {
    fn tare(&mut self, ctx: &Context, _samples: usize) -> Result<(), SensorError> {
        ctx.check()?;
        self.offset = Force::NEWTON * 100;
        Ok(())
    }

    fn reset(&mut self, ctx: &Context) -> Result<(), SensorError> {
        ctx.check()?;
        self.offset = Force::ZERO;
        Ok(())
    }

    fn halt(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn read(&mut self, ctx: &Context) -> Result<ForceSample, SensorError> {
        ctx.sleep(Duration::from_millis(2))?;
        Ok(ForceSample::new(Force::NEWTON * 100 - self.offset, Instant::now()))
    }
}

#[test]
fn no_reading_from_before_a_tare_leaks_past_it() {
    let mut sampler = Sampler::spawn_event(Offset { offset: Force::ZERO }, 8, STALL);
    let ctx = Context::background();
    for _ in 0..25 {
        sampler.reset(&ctx).expect("reset");
        assert_eq!(sampler.read(&ctx).expect("sample").force, Force::NEWTON * 100);
        sampler.tare(&ctx, 1).expect("tare");
        assert_eq!(sampler.read(&ctx).expect("sample").force, Force::ZERO);
    }
}

#[test]
fn configured_timeouts_bound_how_long_a_dead_sensor_blocks() {
    // 20ms driver timeout sampled at 100Hz
    let window = stall_window(Duration::from_millis(20), Duration::from_millis(10));
    assert_eq!(window, Duration::from_millis(80));

    let mut sampler = Sampler::spawn_event(script(&[7]), 8, window);
    let ctx = Context::background();
    assert_eq!(sampler.read(&ctx).expect("sample").force, Force::NEWTON * 7);
    let started = Instant::now();
    assert_eq!(sampler.read(&ctx), Err(SensorError::Timeout));
    assert!(started.elapsed() >= window);
}
