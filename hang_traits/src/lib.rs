//! Boundary contracts shared by the engine and its collaborators.
//!
//! The engine only ever talks to hardware through [`Sensor`] and [`Lamp`];
//! concrete drivers live in `hang_hardware`.
pub mod clock;
pub mod context;
pub mod force;

pub use clock::{Clock, MonotonicClock};
pub use context::{Context, ContextError};
pub use force::{Force, ForceSample, ParseForceError};

use thiserror::Error;

/// Errors surfaced by a [`Sensor`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// A single glitched conversion. Callers drop the sample and read again.
    #[error("bad read")]
    BadRead,
    #[error("not enough samples to tare (requested {0})")]
    NotEnoughSamples(usize),
    #[error("sensor read timed out")]
    Timeout,
    #[error("sensor disconnected")]
    Disconnected,
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("sensor fault: {0}")]
    Device(String),
}

impl SensorError {
    /// True for errors that are retried in-loop and never surfaced.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, SensorError::BadRead)
    }
}

/// A force sensor: tare, reset, halt and a blocking read.
pub trait Sensor {
    /// Average `samples` readings and use the result as the zero offset.
    fn tare(&mut self, ctx: &Context, samples: usize) -> Result<(), SensorError>;
    fn reset(&mut self, ctx: &Context) -> Result<(), SensorError>;
    fn halt(&mut self) -> Result<(), SensorError>;
    /// Block until a sample is available, the per-read timeout elapses, or
    /// `ctx` is done.
    fn read(&mut self, ctx: &Context) -> Result<ForceSample, SensorError>;
}

impl<S: Sensor + ?Sized> Sensor for Box<S> {
    fn tare(&mut self, ctx: &Context, samples: usize) -> Result<(), SensorError> {
        (**self).tare(ctx, samples)
    }
    fn reset(&mut self, ctx: &Context) -> Result<(), SensorError> {
        (**self).reset(ctx)
    }
    fn halt(&mut self) -> Result<(), SensorError> {
        (**self).halt()
    }
    fn read(&mut self, ctx: &Context) -> Result<ForceSample, SensorError> {
        (**self).read(ctx)
    }
}

/// Which lights of a three-colour signal are lit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lights {
    pub red: bool,
    pub yellow: bool,
    pub green: bool,
}

impl Lights {
    pub const OFF: Lights = Lights {
        red: false,
        yellow: false,
        green: false,
    };
}

/// A three-colour signal lamp (the "traffic light" next to the board).
pub trait Lamp {
    fn set(&mut self, lights: Lights) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
