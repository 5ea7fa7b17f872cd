#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Load-cell hardware behind the `hang_traits::Sensor` and `Lamp` contracts.
//!
//! The HX711 driver and GPIO traffic light need the `hardware` feature (and
//! a Raspberry Pi); [`SimulatedCell`] works everywhere.
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod hx711;
pub mod loadcell;
pub mod sim;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod traffic_light;
pub mod util;

use hang_traits::Context;
use std::time::Duration;

pub use error::HwError;
pub use loadcell::LoadCellSensor;
pub use sim::{SimulatedCell, SimulatedProfile};

/// Input channel and gain of the next HX711 conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Gain {
    #[default]
    ChannelA128,
    ChannelA64,
    ChannelB32,
}

impl Gain {
    /// Clock pulses after the 24 data bits that select this gain.
    pub fn pulses(self) -> u8 {
        match self {
            Gain::ChannelA128 => 1,
            Gain::ChannelB32 => 2,
            Gain::ChannelA64 => 3,
        }
    }
}

/// A 24-bit ADC that can be read, powered down and woken up.
pub trait RawSource: Send {
    /// Block until a conversion is ready (at most `timeout`) and return it.
    fn read_raw(&mut self, ctx: &Context, timeout: Duration) -> error::Result<i64>;
    fn power_down(&mut self) -> error::Result<()>;
    fn power_up(&mut self) -> error::Result<()>;
}
