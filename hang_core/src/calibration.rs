//! Raw load-cell counts to [`Force`].
//!
//! A calibration is built from a single reference point: the raw reading
//! observed while a known force was applied. Depending on how many
//! nano-newtons one count represents, one of three integer encodings is
//! chosen so that conversion never loses more than a count's worth of
//! precision:
//!
//! - **Insensitive**: one count spans at least [`MIN_GAIN`] nN; store nN per count.
//! - **Sensitive**: at least [`MIN_GAIN`] counts per nN; store counts per nN.
//! - **Amplified**: anything in between; store `counts * MIN_GAIN / nN` and
//!   multiply by [`MIN_GAIN`] when converting.
use crate::error::CalibrationError;
use hang_traits::Force;

/// Smallest ratio that is represented directly instead of amplified.
pub const MIN_GAIN: i64 = 1000;

/// Raw reading of the reference TrueSun 400 kg cell (slow mode) under one kgf.
pub const TRUESUN_400_SLOW_REFERENCE: i64 = 7222;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calibration {
    Insensitive { nanonewtons_per_count: i64 },
    Sensitive { counts_per_nanonewton: i64 },
    Amplified { conversion: i64 },
}

impl Calibration {
    /// Build a calibration from one reference pair.
    ///
    /// Negative ratios are fine (a load cell wired in reverse); a zero
    /// reading or zero force has no usable ratio and is rejected.
    pub fn from_reference(reading: i64, actual: Force) -> Result<Self, CalibrationError> {
        if reading == 0 {
            return Err(CalibrationError::ZeroReading);
        }
        let nn = actual.nanonewtons();
        if nn == 0 {
            return Err(CalibrationError::ZeroForce);
        }

        let per_count = nn.checked_div(reading).ok_or(CalibrationError::Overflow)?;
        if per_count.unsigned_abs() >= MIN_GAIN.unsigned_abs() {
            return Ok(Self::Insensitive {
                nanonewtons_per_count: per_count,
            });
        }
        let per_nn = reading.checked_div(nn).ok_or(CalibrationError::Overflow)?;
        if per_nn.unsigned_abs() >= MIN_GAIN.unsigned_abs() {
            return Ok(Self::Sensitive {
                counts_per_nanonewton: per_nn,
            });
        }
        let conversion = reading
            .checked_mul(MIN_GAIN)
            .and_then(|scaled| scaled.checked_div(nn))
            .ok_or(CalibrationError::Overflow)?;
        if conversion == 0 {
            return Err(CalibrationError::Overflow);
        }
        Ok(Self::Amplified { conversion })
    }

    /// Calibration of the stock 400 kg cell at the HX711's slow data rate.
    pub fn truesun_400_slow() -> Self {
        Self::Insensitive {
            nanonewtons_per_count: Force::EARTH_GRAVITY.nanonewtons() / TRUESUN_400_SLOW_REFERENCE,
        }
    }

    /// Convert a raw (already offset-corrected) reading to a force.
    pub fn to_force(&self, raw: i64) -> Force {
        let nn = match *self {
            Self::Insensitive {
                nanonewtons_per_count,
            } => i128::from(raw) * i128::from(nanonewtons_per_count),
            Self::Sensitive {
                counts_per_nanonewton,
            } => i128::from(raw) / i128::from(counts_per_nanonewton),
            Self::Amplified { conversion } => {
                i128::from(raw) * i128::from(MIN_GAIN) / i128::from(conversion)
            }
        };
        Force::from_nanonewtons(clamp_i64(nn))
    }
}

/// Shorthand for [`Calibration::from_reference`].
pub fn calibrate(reading: i64, actual: Force) -> Result<Calibration, CalibrationError> {
    Calibration::from_reference(reading, actual)
}

fn clamp_i64(v: i128) -> i64 {
    i64::try_from(v).unwrap_or(if v < 0 { i64::MIN } else { i64::MAX })
}
