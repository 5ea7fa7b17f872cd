#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Hangboard workout engine (hardware-agnostic).
//!
//! All hardware interactions go through `hang_traits::Sensor`; the live view
//! goes through [`display::DisplaySink`] and persistence through
//! [`recorder::Recorder`].
//!
//! ## Architecture
//!
//! - **Calibration**: raw counts to [`hang_traits::Force`] (`calibration`)
//! - **Phases**: what the athlete should be doing right now, with expiry and
//!   input dependencies (`phase`, `input`)
//! - **Workouts**: setup, timed work, rest and the max test as composable
//!   [`workout::Workout`]s (`interval`, `workout`, `protocol`)
//! - **Analytics**: peak force, rate of force development, trailing windows
//! - **Recording**: CSV sessions and per-interval summaries (`recorder`, `summary`)
//! - **Sampling**: a background thread that keeps reads fresh (`sampler`)
//!
//! Forces are fixed-point nano-newtons throughout; floating point only shows
//! up at the edges (parsing, display, summaries).

pub mod analytics;
pub mod calibration;
pub mod conversions;
pub mod display;
pub mod error;
pub mod input;
pub mod interval;
pub mod mocks;
pub mod phase;
pub mod protocol;
pub mod recorder;
pub mod runner;
pub mod sampler;
pub mod status;
pub mod summary;
pub mod util;
pub mod workout;

pub use calibration::{Calibration, calibrate};
pub use display::{AutoRefresh, DisplayMux, DisplaySink, RefreshingDisplay, Render, StateHolder};
pub use error::{
    CalibrationError, DisplayError, ProtocolError, RecordError, Report, Result, WorkoutError,
};
pub use input::{ActualInput, EdgeThreshold, EdgeTracker, ExpectedInput};
pub use interval::{IntervalTiming, MaxTest, RestInterval, SetupInterval, WorkInterval};
pub use phase::{PhaseState, PhaseTag};
pub use protocol::{Week, max_hang_program, max_hang_workout, max_test_program};
pub use recorder::{CsvRecorder, MultiRecorder, Recorder, Updater};
pub use runner::{RunReport, run_workout};
pub use sampler::Sampler;
pub use status::WorkoutOutcome;
pub use summary::{SummaryFormat, SummaryRecorder, WorkoutSummary};
pub use workout::{Composite, Workout};

#[cfg(feature = "test-util")]
pub use hang_traits::clock::test_clock::TestClock;
