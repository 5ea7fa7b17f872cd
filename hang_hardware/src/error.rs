use hang_traits::{ContextError, SensorError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("hx711 data-ready timeout")]
    DataReadyTimeout,
    #[error("hx711 is powered down")]
    Stopped,
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;

#[cfg(all(feature = "hardware", target_os = "linux"))]
impl From<rppal::gpio::Error> for HwError {
    fn from(e: rppal::gpio::Error) -> Self {
        HwError::Gpio(e.to_string())
    }
}

impl From<HwError> for SensorError {
    fn from(e: HwError) -> Self {
        match e {
            HwError::DataReadyTimeout => SensorError::Timeout,
            HwError::Context(c) => SensorError::Context(c),
            HwError::Stopped => SensorError::Device("load cell is powered down".into()),
            HwError::Gpio(msg) => SensorError::Device(msg),
            HwError::Io(io) => SensorError::Device(io.to_string()),
        }
    }
}
