//! Human-readable error descriptions, exit codes and structured JSON errors.

use hang_core::{CalibrationError, ProtocolError, RecordError, WorkoutError};
use hang_hardware::HwError;
use hang_traits::{ContextError, SensorError};

pub const EXIT_GENERIC: i32 = 1;
pub const EXIT_CANCELLED: i32 = 2;
pub const EXIT_DOMAIN: i32 = 3;
pub const EXIT_SENSOR: i32 = 4;
pub const EXIT_RECORDER: i32 = 5;

/// What kind of failure a report carries, found by downcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Cancelled,
    Domain,
    Sensor,
    Recorder,
    Other,
}

impl Kind {
    pub fn of(err: &eyre::Report) -> Self {
        if let Some(we) = err.downcast_ref::<WorkoutError>() {
            return match we {
                e if e.is_cancelled() => Kind::Cancelled,
                WorkoutError::Sensor(SensorError::Context(_)) => Kind::Domain,
                WorkoutError::Sensor(_) => Kind::Sensor,
                WorkoutError::Record(_) => Kind::Recorder,
                WorkoutError::Context(_) | WorkoutError::Display(_) | WorkoutError::Protocol(_) => {
                    Kind::Domain
                }
            };
        }
        if err.downcast_ref::<ProtocolError>().is_some()
            || err.downcast_ref::<CalibrationError>().is_some()
        {
            return Kind::Domain;
        }
        if let Some(se) = err.downcast_ref::<SensorError>() {
            return match se {
                SensorError::Context(ContextError::Cancelled) => Kind::Cancelled,
                _ => Kind::Sensor,
            };
        }
        if let Some(ce) = err.downcast_ref::<ContextError>() {
            return match ce {
                ContextError::Cancelled => Kind::Cancelled,
                ContextError::DeadlineExceeded => Kind::Domain,
            };
        }
        if err.downcast_ref::<HwError>().is_some() {
            return Kind::Sensor;
        }
        if err.downcast_ref::<RecordError>().is_some() {
            return Kind::Recorder;
        }
        Kind::Other
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Cancelled => "Cancelled",
            Kind::Domain => "Workout",
            Kind::Sensor => "Sensor",
            Kind::Recorder => "Recorder",
            Kind::Other => "Error",
        }
    }
}

pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match Kind::of(err) {
        Kind::Cancelled => EXIT_CANCELLED,
        Kind::Domain => EXIT_DOMAIN,
        Kind::Sensor => EXIT_SENSOR,
        Kind::Recorder => EXIT_RECORDER,
        Kind::Other => EXIT_GENERIC,
    }
}

fn sensor_hint(se: &SensorError) -> String {
    match se {
        SensorError::Timeout => "What happened: The load cell did not produce data within the configured timeout.\nLikely causes: HX711 not wired correctly, no power/ground, or timeout too low.\nHow to fix: Verify the DT/SCK pins and power, and consider increasing hardware.sensor_read_timeout_ms in the config.".to_string(),
        SensorError::Disconnected => "What happened: The sampling thread stopped delivering readings.\nLikely causes: The sensor was halted or the sampler shut down mid-workout.\nHow to fix: Re-run; if it repeats, run `hang self-check` with --log-level=debug.".to_string(),
        SensorError::NotEnoughSamples(n) => format!(
            "What happened: Taring needs at least one sample ({n} requested).\nLikely causes: timing.tare_samples or timing.setup_tare_samples is zero.\nHow to fix: Set a positive sample count in the [timing] section."
        ),
        other => format!(
            "What happened: Load cell error ({other}).\nLikely causes: Wiring, power, or GPIO permissions.\nHow to fix: Check the [pins] section and run `hang self-check`."
        ),
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(we) = err.downcast_ref::<WorkoutError>() {
        if we.is_cancelled() {
            return "Workout cancelled.".to_string();
        }
        return match we {
            WorkoutError::Sensor(SensorError::Context(ContextError::DeadlineExceeded))
            | WorkoutError::Context(ContextError::DeadlineExceeded) => format!(
                "What happened: The interval ran out of time ({err}).\nLikely causes: No pull was detected before the interval's deadline.\nHow to fix: Pull firmly when the light turns yellow; check the threshold is reachable."
            ),
            WorkoutError::Sensor(se) => sensor_hint(se),
            WorkoutError::Record(re) => format!(
                "What happened: Could not record the workout ({re}).\nLikely causes: The recording directory is missing or not writable.\nHow to fix: Check [recording] dir in the config and its permissions."
            ),
            WorkoutError::Display(de) => format!(
                "What happened: A display failed ({de}).\nLikely causes: Terminal closed or LED pins unavailable.\nHow to fix: Disable the failing display in [display] and retry."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<ProtocolError>() {
        return match pe {
            ProtocolError::WeekOutOfRange(w) => format!(
                "What happened: Week {w} out of range: max hangs are a four week cycle.\nHow to fix: Pass --week 1, 2, 3 or 4."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CalibrationError>() {
        return format!(
            "What happened: Invalid calibration ({ce}).\nLikely causes: reference_raw or reference_newtons is zero or out of range.\nHow to fix: Fix the [calibration] section of the config."
        );
    }

    if let Some(se) = err.downcast_ref::<SensorError>() {
        return sensor_hint(se);
    }

    if let Some(he) = err.downcast_ref::<HwError>() {
        return format!(
            "What happened: Failed to initialize hardware ({he}).\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO."
        );
    }

    if let Some(re) = err.downcast_ref::<RecordError>() {
        return format!(
            "What happened: Could not set up recording ({re}).\nLikely causes: The recording directory cannot be created.\nHow to fix: Point [recording] dir at a writable location."
        );
    }

    // String-based heuristics for errors coming from config loading
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();
    if lower.contains("config file") {
        return format!(
            "What happened: Configuration is invalid or unreadable.\nDetails: {msg}\nHow to fix: Edit the TOML config and try again."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    let kind = Kind::of(err);
    json!({
        "reason": kind.name(),
        "exit_code": exit_code_for_error(err),
        "error": format!("{err:#}"),
        "message": humanize(err),
    })
    .to_string()
}
