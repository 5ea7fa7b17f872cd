//! Fixed-point force quantity and timestamped samples.
//!
//! Forces are stored as signed nano-newtons in an `i64`, which covers
//! ±9.2 GN with exact integer arithmetic in the sampling path.
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Force(i64);

impl Force {
    pub const ZERO: Force = Force(0);
    pub const NANONEWTON: Force = Force(1);
    pub const NEWTON: Force = Force(1_000_000_000);
    /// 1 lbf = 4.4482216152605 N
    pub const POUND_FORCE: Force = Force(4_448_221_615);
    /// Standard gravity acting on one kilogram (1 kgf).
    pub const EARTH_GRAVITY: Force = Force(9_806_650_000);

    #[inline]
    pub const fn from_nanonewtons(n: i64) -> Self {
        Self(n)
    }

    #[inline]
    pub const fn nanonewtons(self) -> i64 {
        self.0
    }

    /// Round to the nearest nano-newton; non-finite input maps to zero and
    /// out-of-range input saturates.
    pub fn from_newtons(n: f64) -> Self {
        if !n.is_finite() {
            return Self::ZERO;
        }
        Self((n * Self::NEWTON.0 as f64).round() as i64)
    }

    #[inline]
    pub fn newtons(self) -> f64 {
        self.0 as f64 / Self::NEWTON.0 as f64
    }

    /// Whole newtons, truncated toward zero.
    #[inline]
    pub const fn whole_newtons(self) -> i64 {
        self.0 / Self::NEWTON.0
    }

    #[inline]
    pub fn pounds(self) -> f64 {
        self.0 as f64 / Self::POUND_FORCE.0 as f64
    }

    #[inline]
    pub const fn saturating_mul(self, k: i64) -> Self {
        Self(self.0.saturating_mul(k))
    }

    #[inline]
    pub const fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }
}

impl Add for Force {
    type Output = Force;
    fn add(self, rhs: Force) -> Force {
        Force(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Force {
    fn add_assign(&mut self, rhs: Force) {
        *self = *self + rhs;
    }
}

impl Sub for Force {
    type Output = Force;
    fn sub(self, rhs: Force) -> Force {
        Force(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Force {
    fn sub_assign(&mut self, rhs: Force) {
        *self = *self - rhs;
    }
}

impl Mul<i64> for Force {
    type Output = Force;
    fn mul(self, rhs: i64) -> Force {
        self.saturating_mul(rhs)
    }
}

impl Div<i64> for Force {
    type Output = Force;
    fn div(self, rhs: i64) -> Force {
        Force(self.0 / rhs)
    }
}

impl Neg for Force {
    type Output = Force;
    fn neg(self) -> Force {
        Force(self.0.saturating_neg())
    }
}

impl fmt::Display for Force {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}N", self.newtons())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseForceError {
    #[error("empty force value")]
    Empty,
    #[error("invalid force value {0:?}")]
    Invalid(String),
    #[error("unknown force unit {0:?} (expected N, lbf or kgf)")]
    UnknownUnit(String),
}

impl FromStr for Force {
    type Err = ParseForceError;

    /// Accepts a number with an optional unit: `400`, `400N`, `90 lbf`,
    /// `40kgf`. A bare number is newtons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseForceError::Empty);
        }
        let split = s
            .find(|c: char| c.is_ascii_alphabetic())
            .unwrap_or(s.len());
        let (num, unit) = s.split_at(split);
        let value: f64 = num
            .trim()
            .parse()
            .map_err(|_| ParseForceError::Invalid(s.to_string()))?;
        if !value.is_finite() {
            return Err(ParseForceError::Invalid(s.to_string()));
        }
        let per_unit = match unit.trim().to_ascii_lowercase().as_str() {
            "" | "n" => Force::NEWTON,
            "lb" | "lbf" | "lbs" => Force::POUND_FORCE,
            "kg" | "kgf" => Force::EARTH_GRAVITY,
            other => return Err(ParseForceError::UnknownUnit(other.to_string())),
        };
        Ok(Force::from_nanonewtons(
            (value * per_unit.nanonewtons() as f64).round() as i64,
        ))
    }
}

/// A calibrated force reading and the instant it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForceSample {
    pub force: Force,
    pub time: Instant,
}

impl ForceSample {
    #[inline]
    pub fn new(force: Force, time: Instant) -> Self {
        Self { force, time }
    }
}
