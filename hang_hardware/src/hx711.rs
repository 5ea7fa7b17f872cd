use std::time::{Duration, Instant};

use hang_traits::Context;
use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::{sign_extend_24, wait_until_low_with_timeout};
use crate::{Gain, RawSource};

/// PD_SCK held high this long powers the chip down.
const POWER_DOWN: Duration = Duration::from_micros(60);
/// DT is polled at a tenth of the fastest (80 SPS) conversion period.
const READY_POLL: Duration = Duration::from_micros(1250);

pub struct Hx711 {
    dt: InputPin,
    sck: OutputPin,
    gain: Gain,
    powered: bool,
}

impl Hx711 {
    pub fn new(dt_pin: u8, sck_pin: u8, gain: Gain) -> Result<Self> {
        let gpio = Gpio::new()?;
        let dt = gpio.get(dt_pin)?.into_input_pulldown();
        let mut sck = gpio.get(sck_pin)?.into_output();
        sck.set_low(); // clock idle low
        tracing::info!(dt_pin, sck_pin, ?gain, "hx711 ready");
        Ok(Self {
            dt,
            sck,
            gain,
            powered: true,
        })
    }

    fn pulse(&mut self) {
        self.sck.set_high();
        spin_delay_1us();
        self.sck.set_low();
        spin_delay_1us();
    }

    fn shift_in(&mut self) -> i32 {
        // Clock out 24 bits, MSB first
        let mut value: u32 = 0;
        for _ in 0..24 {
            self.sck.set_high();
            spin_delay_1us();
            value = (value << 1) | u32::from(self.dt.is_high());
            self.sck.set_low();
            spin_delay_1us();
        }
        // Extra pulses select gain and channel for the next conversion
        for _ in 0..self.gain.pulses() {
            self.pulse();
        }
        sign_extend_24(value)
    }
}

impl RawSource for Hx711 {
    fn read_raw(&mut self, ctx: &Context, timeout: Duration) -> Result<i64> {
        if !self.powered {
            return Err(HwError::Stopped);
        }
        let dt = &self.dt;
        wait_until_low_with_timeout(ctx, || dt.is_high(), timeout, READY_POLL)?;
        let raw = self.shift_in();
        trace!(raw, "hx711 raw read");
        Ok(i64::from(raw))
    }

    fn power_down(&mut self) -> Result<()> {
        self.sck.set_high();
        let until = Instant::now() + POWER_DOWN;
        while Instant::now() < until {
            std::hint::spin_loop();
        }
        self.powered = false;
        Ok(())
    }

    fn power_up(&mut self) -> Result<()> {
        self.sck.set_low();
        self.powered = true;
        Ok(())
    }
}

#[inline(always)]
fn spin_delay_1us() {
    let until = Instant::now() + Duration::from_micros(1);
    while Instant::now() < until {
        std::hint::spin_loop();
    }
}
