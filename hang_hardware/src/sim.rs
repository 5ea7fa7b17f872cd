//! A load cell that exists only in software, for demos and self-checks.
use std::time::{Duration, Instant};

use hang_core::calibration::TRUESUN_400_SLOW_REFERENCE;
use hang_traits::clock::Clock;
use hang_traits::{Context, Force};

use crate::RawSource;
use crate::error::{HwError, Result};

/// Unloaded reading of the simulated cell.
const BASELINE: i64 = 8_400;
/// Time for a simulated pull to reach its peak.
const RAMP: Duration = Duration::from_millis(300);

/// What the simulated athlete does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedProfile {
    Constant(Force),
    /// Nothing for `rest`, then a pull to `peak` held for `hold`, over and over.
    Pulls {
        peak: Force,
        hold: Duration,
        rest: Duration,
    },
    /// Nothing for `rest`, then one pull to `peak` that fades linearly to
    /// nothing over `fade`.
    Fatigue {
        peak: Force,
        rest: Duration,
        fade: Duration,
    },
}

impl SimulatedProfile {
    pub fn force_at(&self, t: Duration) -> Force {
        match *self {
            Self::Constant(f) => f,
            Self::Pulls { peak, hold, rest } => {
                let cycle = (hold + rest).as_micros().max(1);
                let phase = t.as_micros() % cycle;
                let Some(pulling) = phase.checked_sub(rest.as_micros()) else {
                    return Force::ZERO;
                };
                let ramp = RAMP.min(hold).as_micros().max(1);
                if pulling >= ramp {
                    return peak;
                }
                scale(peak, pulling, ramp)
            }
            Self::Fatigue { peak, rest, fade } => {
                let Some(pulling) = t.checked_sub(rest) else {
                    return Force::ZERO;
                };
                let ramp = RAMP.as_micros();
                let pulling = pulling.as_micros();
                if pulling < ramp {
                    return scale(peak, pulling, ramp);
                }
                let fade = fade.as_micros().max(1);
                let left = fade.saturating_sub(pulling - ramp);
                scale(peak, left, fade)
            }
        }
    }
}

/// `peak * num / den`
fn scale(peak: Force, num: u128, den: u128) -> Force {
    let nn = i128::from(peak.nanonewtons()) * num as i128 / den as i128;
    Force::from_nanonewtons(nn as i64)
}

/// Produces HX711-like raw counts on a fixed conversion schedule.
pub struct SimulatedCell<C: Clock + Send> {
    clock: C,
    profile: SimulatedProfile,
    period: Duration,
    started: Instant,
    next: Instant,
    counts_per_newton: f64,
    noise_counts: u32,
    rng: u32,
    powered: bool,
}

impl<C: Clock + Send> SimulatedCell<C> {
    /// A cell converting at `hz` with the stock calibration.
    pub fn new(clock: C, profile: SimulatedProfile, hz: u32) -> Self {
        let now = clock.now();
        Self {
            period: Duration::from_micros(hang_core::util::period_us(hz)),
            started: now,
            next: now,
            counts_per_newton: TRUESUN_400_SLOW_REFERENCE as f64 / Force::EARTH_GRAVITY.newtons(),
            noise_counts: 0,
            rng: 0x2545_F491,
            powered: true,
            clock,
            profile,
        }
    }

    /// Add uniform noise of up to ±`counts` to every conversion.
    pub fn with_noise(mut self, counts: u32) -> Self {
        self.noise_counts = counts;
        self
    }

    pub fn with_counts_per_newton(mut self, counts: f64) -> Self {
        self.counts_per_newton = counts;
        self
    }

    fn noise(&mut self) -> i64 {
        if self.noise_counts == 0 {
            return 0;
        }
        // xorshift32
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        let span = u64::from(self.noise_counts) * 2 + 1;
        (u64::from(x) % span) as i64 - i64::from(self.noise_counts)
    }
}

impl<C: Clock + Send> RawSource for SimulatedCell<C> {
    fn read_raw(&mut self, ctx: &Context, timeout: Duration) -> Result<i64> {
        if !self.powered {
            return Err(HwError::Stopped);
        }
        ctx.check()?;
        let wait = self.next.saturating_duration_since(self.clock.now());
        if wait > timeout {
            self.clock.sleep(timeout);
            return Err(HwError::DataReadyTimeout);
        }
        self.clock.sleep(wait);
        ctx.check()?;

        let now = self.clock.now();
        self.next = now + self.period;
        let force = self.profile.force_at(now.saturating_duration_since(self.started));
        let counts = (force.newtons() * self.counts_per_newton).round() as i64;
        Ok(BASELINE + counts + self.noise())
    }

    fn power_down(&mut self) -> Result<()> {
        self.powered = false;
        Ok(())
    }

    fn power_up(&mut self) -> Result<()> {
        self.powered = true;
        self.next = self.clock.now() + self.period;
        Ok(())
    }
}
