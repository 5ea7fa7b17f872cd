//! Phase states shown on a red/yellow/green signal.
use std::time::{Duration, Instant};

use hang_core::{DisplayError, PhaseState, PhaseTag, Render};
use hang_traits::{Lamp, Lights};

/// Red blinks during this last stretch of a timed phase.
const FINAL_STRETCH: Duration = Duration::from_secs(3);
/// Within each second of the final stretch, red is lit past this mark.
const BLINK_ON_AFTER: Duration = Duration::from_millis(750);

/// The lights for `state` at `now`.
///
/// Rest is red, work green, taring and waiting yellow, halt dark. Yellow is
/// added while a required input is unsatisfied, and red blinks through the
/// final three seconds of anything that expires.
pub fn lights_for(state: &PhaseState, now: Instant) -> Lights {
    let mut lights = match state.tag() {
        PhaseTag::Halt => Lights::OFF,
        PhaseTag::Rest => Lights {
            red: true,
            ..Lights::OFF
        },
        PhaseTag::Work => Lights {
            green: true,
            ..Lights::OFF
        },
        PhaseTag::Tare | PhaseTag::Wait => Lights {
            yellow: true,
            ..Lights::OFF
        },
    };
    if state.input_dependent().is_some_and(|d| !d.satisfied()) {
        lights.yellow = true;
    }
    if let Some(expiry) = state.expiring() {
        let ttl = expiry.remaining_at(now);
        if !ttl.is_zero() && ttl <= FINAL_STRETCH {
            let into_second = Duration::from_nanos((ttl.as_nanos() % 1_000_000_000) as u64);
            lights.red = into_second > BLINK_ON_AFTER;
        }
    }
    lights
}

/// Drives a [`Lamp`], touching it only when the lights change.
pub struct TrafficLightRenderer<L: Lamp + Send> {
    lamp: L,
    shown: Option<Lights>,
}

impl<L: Lamp + Send> TrafficLightRenderer<L> {
    pub fn new(lamp: L) -> Self {
        Self { lamp, shown: None }
    }

    pub fn lamp(&self) -> &L {
        &self.lamp
    }

    fn show(&mut self, lights: Lights) -> Result<(), DisplayError> {
        if self.shown == Some(lights) {
            return Ok(());
        }
        self.lamp
            .set(lights)
            .map_err(|e| DisplayError::Sink(format!("traffic light: {e}")))?;
        tracing::trace!(?lights, "traffic light changed");
        self.shown = Some(lights);
        Ok(())
    }
}

impl<L: Lamp + Send> Render for TrafficLightRenderer<L> {
    fn render(&mut self, state: &PhaseState, now: Instant) -> Result<(), DisplayError> {
        self.show(lights_for(state, now))
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.show(Lights::OFF)
    }
}
