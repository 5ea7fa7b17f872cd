//! `From` implementations bridging `hang_config` types to `hang_core` types.

use crate::calibration::Calibration;
use crate::error::CalibrationError;
use crate::interval::IntervalTiming;
use crate::summary::SummaryFormat;
use hang_traits::Force;
use std::time::Duration;

// ── Timing ───────────────────────────────────────────────────────────────────

impl From<&hang_config::TimingCfg> for IntervalTiming {
    fn from(c: &hang_config::TimingCfg) -> Self {
        let d = Self::default();
        let ms = |v: Option<u64>, fallback: Duration| v.map_or(fallback, Duration::from_millis);
        let n = |v: Option<f64>, fallback: Force| v.map_or(fallback, Force::from_newtons);
        Self {
            tare_window: ms(c.tare_window_ms, d.tare_window),
            tare_settle: ms(c.tare_settle_ms, d.tare_settle),
            tare_samples: c.tare_samples.unwrap_or(d.tare_samples),
            setup_tare_window: ms(c.setup_tare_window_ms, d.setup_tare_window),
            setup_tare_settle: ms(c.setup_tare_settle_ms, d.setup_tare_settle),
            setup_tare_samples: c.setup_tare_samples.unwrap_or(d.setup_tare_samples),
            engagement_floor: n(c.engagement_floor_newtons, d.engagement_floor),
            edge_min_delta: n(c.edge_min_delta_newtons, d.edge_min_delta),
            safety_base: ms(c.safety_base_ms, d.safety_base),
        }
    }
}

// ── Calibration ──────────────────────────────────────────────────────────────

impl TryFrom<&hang_config::CalibrationCfg> for Calibration {
    type Error = CalibrationError;

    fn try_from(c: &hang_config::CalibrationCfg) -> Result<Self, Self::Error> {
        Calibration::from_reference(c.reference_raw, Force::from_newtons(c.reference_newtons))
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

impl SummaryFormat {
    /// `None` when summaries are switched off.
    pub fn from_mode(mode: hang_config::SummaryMode) -> Option<Self> {
        match mode {
            hang_config::SummaryMode::Text => Some(Self::Text),
            hang_config::SummaryMode::Json => Some(Self::Json),
            hang_config::SummaryMode::Off => None,
        }
    }
}
