#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the hangboard trainer.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section is optional; an empty file (or no file at all) yields the
//!   stock setup: HX711 on BCM 5/6, traffic light on BCM 11/10/9, the
//!   TrueSun 400 kg cell calibration and the terminal display.
use eyre::WrapErr;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// BCM GPIO numbers.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Pins {
    pub hx711_dt: u8,
    pub hx711_sck: u8,
    pub led_green: Option<u8>,
    pub led_yellow: Option<u8>,
    pub led_red: Option<u8>,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            hx711_dt: 5,
            hx711_sck: 6,
            led_green: Some(11),
            led_yellow: Some(10),
            led_red: Some(9),
        }
    }
}

/// Single reference point: the raw (tared) reading seen under a known load.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct CalibrationCfg {
    pub reference_raw: i64,
    pub reference_newtons: f64,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        // TrueSun 400kg cell, HX711 at 10 SPS, under 1 kgf
        Self {
            reference_raw: 7222,
            reference_newtons: 9.80665,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Hardware {
    /// Max time to wait for HX711 data-ready (DT low) before failing
    pub sensor_read_timeout_ms: u64,
    /// Expected sensor data rate; the HX711 runs at 10 or 80.
    pub sample_rate_hz: u32,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            sensor_read_timeout_ms: 250,
            sample_rate_hz: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayCfg {
    /// Redraw period of self-refreshing displays.
    pub refresh_ms: u64,
    /// Draw the live view in the terminal.
    pub terminal: bool,
    /// Drive the traffic light (needs the `led_*` pins).
    pub leds: bool,
}

impl Default for DisplayCfg {
    fn default() -> Self {
        Self {
            refresh_ms: 20,
            terminal: true,
            leds: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    #[default]
    Text,
    Json,
    Off,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct RecordingCfg {
    /// Where CSV recordings go. Defaults to `~/Documents/workouts`; a
    /// leading `~/` is expanded.
    pub dir: Option<PathBuf>,
    /// Per-interval summary printed after each recorded interval.
    pub summary: SummaryMode,
}

impl RecordingCfg {
    /// The recording directory with `~` expanded against `home`.
    pub fn resolved_dir(&self, home: Option<&Path>) -> PathBuf {
        let home = home.map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        match &self.dir {
            None => home.join("Documents").join("workouts"),
            Some(dir) => match dir.strip_prefix("~") {
                Ok(rest) => home.join(rest),
                Err(_) => dir.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Overrides for interval timing; anything unset keeps the built-in value.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(default)]
pub struct TimingCfg {
    pub tare_window_ms: Option<u64>,
    pub tare_settle_ms: Option<u64>,
    pub tare_samples: Option<usize>,
    pub setup_tare_window_ms: Option<u64>,
    pub setup_tare_settle_ms: Option<u64>,
    pub setup_tare_samples: Option<usize>,
    /// Force that ends setup.
    pub engagement_floor_newtons: Option<f64>,
    /// Rise that counts as a deliberate pull.
    pub edge_min_delta_newtons: Option<f64>,
    /// Work intervals give up after this plus twice the hold time.
    pub safety_base_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub pins: Pins,
    pub calibration: CalibrationCfg,
    pub hardware: Hardware,
    pub display: DisplayCfg,
    pub recording: RecordingCfg,
    pub logging: Logging,
    pub timing: TimingCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read config file {}", path.display()))?;
    let cfg = load_toml(&text)
        .wrap_err_with(|| format!("failed to parse config file {}", path.display()))?;
    cfg.validate()
        .wrap_err_with(|| format!("invalid config file {}", path.display()))?;
    Ok(cfg)
}

/// Like [`load_file`], but a missing file yields the defaults.
pub fn load_or_default(path: &Path) -> eyre::Result<Config> {
    if path.exists() {
        load_file(path)
    } else {
        Ok(Config::default())
    }
}

const MAX_BCM_PIN: u8 = 27;
const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const ROTATIONS: [&str; 3] = ["never", "daily", "hourly"];

fn positive_finite(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        let named = [
            ("pins.hx711_dt", Some(self.pins.hx711_dt)),
            ("pins.hx711_sck", Some(self.pins.hx711_sck)),
            ("pins.led_green", self.pins.led_green),
            ("pins.led_yellow", self.pins.led_yellow),
            ("pins.led_red", self.pins.led_red),
        ];
        for (i, (name, pin)) in named.iter().enumerate() {
            let Some(pin) = pin else { continue };
            if *pin > MAX_BCM_PIN {
                eyre::bail!("{name} must be a BCM pin in 0..={MAX_BCM_PIN}");
            }
            if let Some((other, _)) = named[..i].iter().find(|(_, p)| *p == Some(*pin)) {
                eyre::bail!("{name} must differ from {other} (both are {pin})");
            }
        }

        // Calibration
        if self.calibration.reference_raw == 0 {
            eyre::bail!("calibration.reference_raw must be non-zero");
        }
        if !self.calibration.reference_newtons.is_finite()
            || self.calibration.reference_newtons == 0.0
        {
            eyre::bail!("calibration.reference_newtons must be finite and non-zero");
        }

        // Hardware
        if self.hardware.sensor_read_timeout_ms == 0 {
            eyre::bail!("hardware.sensor_read_timeout_ms must be >= 1");
        }
        if self.hardware.sample_rate_hz == 0 {
            eyre::bail!("hardware.sample_rate_hz must be > 0");
        }

        // Display
        if !(1..=1000).contains(&self.display.refresh_ms) {
            eyre::bail!("display.refresh_ms must be in 1..=1000");
        }
        if self.display.leds
            && (self.pins.led_green.is_none()
                || self.pins.led_yellow.is_none()
                || self.pins.led_red.is_none())
        {
            eyre::bail!("display.leds requires pins.led_green, pins.led_yellow and pins.led_red");
        }

        // Logging
        if let Some(level) = &self.logging.level
            && !LEVELS.contains(&level.to_ascii_lowercase().as_str())
        {
            eyre::bail!("logging.level must be one of {}", LEVELS.join(", "));
        }
        if let Some(rotation) = &self.logging.rotation
            && !ROTATIONS.contains(&rotation.to_ascii_lowercase().as_str())
        {
            eyre::bail!("logging.rotation must be one of {}", ROTATIONS.join(", "));
        }

        // Timing
        if self.timing.tare_samples == Some(0) {
            eyre::bail!("timing.tare_samples must be >= 1");
        }
        if self.timing.setup_tare_samples == Some(0) {
            eyre::bail!("timing.setup_tare_samples must be >= 1");
        }
        if let Some(n) = self.timing.engagement_floor_newtons
            && !positive_finite(n)
        {
            eyre::bail!("timing.engagement_floor_newtons must be > 0");
        }
        if let Some(n) = self.timing.edge_min_delta_newtons
            && !positive_finite(n)
        {
            eyre::bail!("timing.edge_min_delta_newtons must be > 0");
        }

        Ok(())
    }
}
