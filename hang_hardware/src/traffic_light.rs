use hang_traits::{Lamp, Lights};
use rppal::gpio::{Gpio, OutputPin};

use crate::error::Result;

/// Three LEDs on GPIO output pins, all off at start.
pub struct GpioTrafficLight {
    green: OutputPin,
    yellow: OutputPin,
    red: OutputPin,
}

impl GpioTrafficLight {
    pub fn new(green_pin: u8, yellow_pin: u8, red_pin: u8) -> Result<Self> {
        let gpio = Gpio::new()?;
        let mut green = gpio.get(green_pin)?.into_output();
        let mut yellow = gpio.get(yellow_pin)?.into_output();
        let mut red = gpio.get(red_pin)?.into_output();
        green.set_low();
        yellow.set_low();
        red.set_low();
        tracing::info!(green_pin, yellow_pin, red_pin, "traffic light ready");
        Ok(Self { green, yellow, red })
    }
}

fn drive(pin: &mut OutputPin, on: bool) {
    if on {
        pin.set_high();
    } else {
        pin.set_low();
    }
}

impl Lamp for GpioTrafficLight {
    fn set(&mut self, lights: Lights) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        drive(&mut self.red, lights.red);
        drive(&mut self.green, lights.green);
        drive(&mut self.yellow, lights.yellow);
        Ok(())
    }
}

impl Drop for GpioTrafficLight {
    fn drop(&mut self) {
        let _ = self.set(Lights::OFF);
    }
}
