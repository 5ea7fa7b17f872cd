//! A calibrated, tareable force sensor on top of a raw ADC.
use std::time::{Duration, Instant};

use hang_core::Calibration;
use hang_traits::{Context, ForceSample, Sensor, SensorError};

use crate::RawSource;
use crate::error::HwError;

pub struct LoadCellSensor<R: RawSource> {
    source: R,
    calibration: Calibration,
    /// Raw reading of the unloaded cell.
    tare: i64,
    read_timeout: Duration,
    /// Data-ready timeouts tolerated per read before giving up.
    retries: u32,
}

impl<R: RawSource> LoadCellSensor<R> {
    pub fn new(source: R, calibration: Calibration, read_timeout: Duration) -> Self {
        Self {
            source,
            calibration,
            tare: 0,
            read_timeout,
            retries: 3,
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn tare_offset(&self) -> i64 {
        self.tare
    }

    fn read_raw(&mut self, ctx: &Context) -> Result<i64, HwError> {
        let mut attempts = 0;
        loop {
            match self.source.read_raw(ctx, self.read_timeout) {
                Err(HwError::DataReadyTimeout) if attempts < self.retries => {
                    attempts += 1;
                    tracing::warn!(retries = attempts, "load cell timeout, retrying");
                }
                other => return other,
            }
        }
    }
}

impl<R: RawSource> Sensor for LoadCellSensor<R> {
    fn tare(&mut self, ctx: &Context, samples: usize) -> Result<(), SensorError> {
        if samples == 0 {
            return Err(SensorError::NotEnoughSamples(samples));
        }
        let mut total: i128 = 0;
        for _ in 0..samples {
            total += i128::from(self.read_raw(ctx)?);
        }
        // the mean of i64 values fits in i64
        self.tare = (total / samples as i128) as i64;
        tracing::info!(offset = self.tare, samples, "load cell tared");
        Ok(())
    }

    fn reset(&mut self, ctx: &Context) -> Result<(), SensorError> {
        self.source.power_up()?;
        // the first conversion after power-up settles the gain selection
        self.read_raw(ctx)?;
        tracing::debug!("load cell reset");
        Ok(())
    }

    fn halt(&mut self) -> Result<(), SensorError> {
        self.source.power_down()?;
        tracing::debug!("load cell powered down");
        Ok(())
    }

    fn read(&mut self, ctx: &Context) -> Result<ForceSample, SensorError> {
        let raw = self.read_raw(ctx)?;
        let time = Instant::now();
        let force = self.calibration.to_force(raw.saturating_sub(self.tare));
        tracing::trace!(raw, %force, "load cell sample");
        Ok(ForceSample::new(force, time))
    }
}
