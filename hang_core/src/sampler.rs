//! Background sensor sampling.
//!
//! Spawns a thread that reads the sensor continuously and streams samples to
//! the workout over a bounded channel. When the consumer falls behind, the
//! oldest queued samples are dropped so that reads always return fresh data.
//! The sampler is itself a [`Sensor`], so intervals use it like any other
//! sensor; taring and resetting go through to the device and discard any
//! sample read before the call returned, even one still in flight.
//!
//! Safety: Each `Sampler` spawns exactly one thread that is automatically
//! shut down when the `Sampler` is dropped, preventing thread leaks.
use crossbeam_channel as xch;
use hang_traits::clock::Clock;
use hang_traits::context::TICK;
use hang_traits::{Context, ForceSample, Sensor, SensorError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

type Reading = Result<ForceSample, SensorError>;

/// A reading tagged with the exclusive-access generation it was taken in.
type Tagged = (u64, Reading);

/// One sensor read plus the driver's retries after a data-ready timeout.
const READ_ATTEMPTS: u32 = 4;
const MIN_STALL: Duration = Duration::from_millis(1);

pub struct Sampler<S: Sensor + Send + 'static> {
    sensor: Arc<Mutex<S>>,
    /// Set while the consumer needs the sensor; the thread stays off the lock.
    paused: Arc<AtomicBool>,
    /// Bumped by every tare or reset; older readings are stale.
    generation: Arc<AtomicU64>,
    rx: xch::Receiver<Tagged>,
    /// Longest a read waits for the thread before reporting a stall.
    stall_after: Duration,
    /// Cancelled on drop to stop the thread.
    ctx: Context,
    /// Join handle for graceful thread cleanup
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl<S: Sensor + Send + 'static> Sampler<S> {
    /// Event-driven sampler: rely on the sensor's own data-ready timing and
    /// do not add extra sleeps. `sensor.read` should block until data is
    /// ready or its own timeout expires.
    pub fn spawn_event(sensor: S, capacity: usize, stall_after: Duration) -> Self {
        Self::spawn_inner(sensor, capacity, stall_after, None::<(Duration, NoClock)>)
    }

    /// Paced sampler: sleep `1/hz` on `clock` between reads.
    pub fn spawn<C: Clock + Send + 'static>(
        sensor: S,
        hz: u32,
        capacity: usize,
        stall_after: Duration,
        clock: C,
    ) -> Self {
        let period = Duration::from_micros(crate::util::period_us(hz));
        Self::spawn_inner(sensor, capacity, stall_after, Some((period, clock)))
    }

    fn spawn_inner<C: Clock + Send + 'static>(
        sensor: S,
        capacity: usize,
        stall_after: Duration,
        pacing: Option<(Duration, C)>,
    ) -> Self {
        let (tx, rx) = xch::bounded(capacity.max(1));
        let sensor = Arc::new(Mutex::new(sensor));
        let ctx = Context::background().with_cancel();

        let paused = Arc::new(AtomicBool::new(false));
        let generation = Arc::new(AtomicU64::new(0));
        let thread_sensor = Arc::clone(&sensor);
        let thread_paused = Arc::clone(&paused);
        let thread_generation = Arc::clone(&generation);
        let thread_ctx = ctx.clone();
        let stale = rx.clone();
        let join_handle = std::thread::spawn(move || {
            loop {
                if thread_ctx.is_cancelled() {
                    tracing::debug!("Sampler thread received shutdown signal");
                    break;
                }
                if thread_paused.load(Ordering::Acquire) {
                    std::thread::sleep(TICK);
                    continue;
                }

                // Each read is bounded so `exclusive` can always get the lock.
                let taken_in = thread_generation.load(Ordering::Acquire);
                let read_ctx = thread_ctx.with_timeout(stall_after);
                let reading = lock(&thread_sensor).read(&read_ctx);
                match reading {
                    Err(e) if e.is_transient() => {
                        tracing::trace!("sampler dropped a bad read");
                        continue;
                    }
                    Err(SensorError::Context(_)) if thread_ctx.is_cancelled() => break,
                    Err(SensorError::Context(_)) => continue,
                    other => {
                        if !forward(&tx, &stale, (taken_in, other)) {
                            tracing::debug!("Sampler consumer disconnected, exiting thread");
                            break;
                        }
                    }
                }

                if let Some((period, clock)) = &pacing {
                    clock.sleep(*period);
                }
            }
            tracing::trace!("Sampler thread exiting cleanly");
        });

        Self {
            sensor,
            paused,
            generation,
            rx,
            stall_after,
            ctx,
            join_handle: Some(join_handle),
        }
    }

    /// Drop everything queued so far.
    fn drain(&self) -> usize {
        self.rx.try_iter().count()
    }

    /// Run `f` on the sensor with the sampling thread held off, then discard
    /// whatever was sampled before `f` finished. A read that was in flight
    /// when `f` started is tagged with the old generation and dropped by
    /// [`read`](Sensor::read) whenever it lands.
    fn exclusive<T>(&self, f: impl FnOnce(&mut S) -> T) -> T {
        self.paused.store(true, Ordering::Release);
        let out = {
            let mut sensor = lock(&self.sensor);
            let out = f(&mut *sensor);
            self.generation.fetch_add(1, Ordering::AcqRel);
            out
        };
        let dropped = self.drain();
        self.paused.store(false, Ordering::Release);
        tracing::debug!(dropped, "discarded samples queued before exclusive access");
        out
    }
}

/// Send `reading`, evicting the oldest queued reading if the channel is full.
/// Returns false once the consumer is gone.
fn forward(tx: &xch::Sender<Tagged>, stale: &xch::Receiver<Tagged>, reading: Tagged) -> bool {
    match tx.try_send(reading) {
        Ok(()) => true,
        Err(xch::TrySendError::Full(reading)) => {
            let _ = stale.try_recv();
            !matches!(tx.try_send(reading), Err(xch::TrySendError::Disconnected(_)))
        }
        Err(xch::TrySendError::Disconnected(_)) => false,
    }
}

fn lock<S>(m: &Mutex<S>) -> MutexGuard<'_, S> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: Sensor + Send + 'static> Sensor for Sampler<S> {
    fn tare(&mut self, ctx: &Context, samples: usize) -> Result<(), SensorError> {
        self.exclusive(|s| s.tare(ctx, samples))
    }

    fn reset(&mut self, ctx: &Context) -> Result<(), SensorError> {
        self.exclusive(|s| s.reset(ctx))
    }

    fn halt(&mut self) -> Result<(), SensorError> {
        self.ctx.cancel();
        lock(&self.sensor).halt()
    }

    fn read(&mut self, ctx: &Context) -> Result<ForceSample, SensorError> {
        let started = Instant::now();
        loop {
            ctx.check()?;
            let wait = ctx.remaining().map_or(TICK, |r| r.min(TICK));
            match self.rx.recv_timeout(wait) {
                Ok((taken_in, reading)) => {
                    if taken_in >= self.generation.load(Ordering::Acquire) {
                        return reading;
                    }
                    tracing::trace!(taken_in, "dropped a reading from before the last tare");
                }
                Err(xch::RecvTimeoutError::Timeout) => {
                    if started.elapsed() >= self.stall_after {
                        let stalled_ms = started.elapsed().as_millis() as u64;
                        tracing::warn!(stalled_ms, "sensor stalled");
                        return Err(SensorError::Timeout);
                    }
                }
                Err(xch::RecvTimeoutError::Disconnected) => return Err(SensorError::Disconnected),
            }
        }
    }
}

impl<S: Sensor + Send + 'static> Drop for Sampler<S> {
    fn drop(&mut self) {
        self.ctx.cancel();

        // The thread exits between reads, or once the current read returns
        // (bounded by the sensor's own per-read timeout).
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("Sampler thread joined successfully");
                }
                Err(e) => {
                    // Thread panicked; log but don't propagate (we're in Drop)
                    tracing::warn!(?e, "Sampler thread panicked during shutdown");
                }
            }
        }
    }
}

/// Placeholder clock type for the unpaced sampler.
struct NoClock;

impl Clock for NoClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
    fn sleep(&self, _d: Duration) {}
}

/// How long a read may go without a sample before the sensor counts as
/// stalled: every attempt of one driver read, or two sample periods when
/// sampling is slower than that, so one missed sample never trips it.
pub fn stall_window(read_timeout: Duration, period: Duration) -> Duration {
    read_timeout
        .saturating_mul(READ_ATTEMPTS)
        .max(period.saturating_mul(2))
        .max(MIN_STALL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::ScriptedSensor;
    use hang_traits::Force;
    use rstest::rstest;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[rstest]
    #[case::slow_sensor(ms(150), ms(100), ms(600))]
    #[case::slow_sampling(ms(10), ms(1_000), ms(2_000))]
    #[case::both_equal(ms(50), ms(100), ms(200))]
    #[case::nothing_configured(Duration::ZERO, Duration::ZERO, MIN_STALL)]
    #[case::saturates(Duration::MAX, ms(100), Duration::MAX)]
    fn stall_window_covers_a_read_and_two_periods(
        #[case] read_timeout: Duration,
        #[case] period: Duration,
        #[case] window: Duration,
    ) {
        assert_eq!(stall_window(read_timeout, period), window);
    }

    #[test]
    fn a_sensor_gone_quiet_is_reported_after_the_window() {
        let window = stall_window(ms(10), ms(20));
        let mut sampler = Sampler::spawn_event(ScriptedSensor::new(), 4, window);
        let started = Instant::now();
        assert_eq!(
            sampler.read(&Context::background()),
            Err(SensorError::Timeout)
        );
        let waited = started.elapsed();
        assert!(waited >= window, "{waited:?}");
        assert!(waited < window + ms(500), "{waited:?}");
    }

    #[test]
    fn readings_from_an_older_generation_are_skipped() {
        let mut sampler = Sampler::spawn_event(ScriptedSensor::new(), 4, ms(100));
        sampler.generation.store(3, Ordering::Release);
        // stand in for the thread: one reading from before a tare, one after
        let (tx, rx) = xch::bounded::<Tagged>(2);
        sampler.rx = rx;
        let t = Instant::now();
        tx.send((2, Ok(ForceSample::new(Force::NEWTON, t)))).expect("send");
        tx.send((3, Ok(ForceSample::new(Force::NEWTON * 2, t)))).expect("send");

        let got = sampler.read(&Context::background()).expect("fresh sample");
        assert_eq!(got.force, Force::NEWTON * 2);
    }
}
