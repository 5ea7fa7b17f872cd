use hang_traits::{ContextError, SensorError};
use thiserror::Error;

/// Failures of a display sink.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DisplayError {
    #[error("no state currently set")]
    Uninitialized,
    #[error("display sink failed: {0}")]
    Sink(String),
}

/// Failures of a recorder session.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Write or finish after the session was closed or finished.
    #[error("workout has already been closed")]
    WriteAfterClosed,
    #[error("no data to write out")]
    NoData,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("summary encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("calibration reference reading must be non-zero")]
    ZeroReading,
    #[error("calibration reference force must be non-zero")]
    ZeroForce,
    #[error("calibration reference overflows the amplified range")]
    Overflow,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("week {0} out of range: max hangs are a four week cycle")]
    WeekOutOfRange(u8),
}

/// Everything that can abort a workout run.
#[derive(Debug, Error)]
pub enum WorkoutError {
    #[error(transparent)]
    Sensor(#[from] SensorError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Display(#[from] DisplayError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl WorkoutError {
    /// The context error behind this failure, whether it surfaced directly or
    /// through a sensor read.
    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            WorkoutError::Context(e) | WorkoutError::Sensor(SensorError::Context(e)) => Some(*e),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.context_error() == Some(ContextError::Cancelled)
    }
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
