//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use hang_traits::Force;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "hang", version, about = "Hangboard isometric training")]
pub struct Cli {
    /// Path to config TOML; a missing file means defaults
    #[arg(long, value_name = "FILE", default_value = "etc/hang_config.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty (also disables the terminal view)
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging] level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Use a simulated load cell whose athlete pulls to this force (e.g. 450N, 100lbf)
    #[arg(long, value_name = "FORCE")]
    pub simulate: Option<Force>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a max hang workout from the four-week cycle
    #[command(long_about = "Run a max hang workout.\n\n\
        Max hangs build maximum finger strength with short, near-maximal holds.\n\
        Each week of the four-week cycle repeats 3s, 6s and 9s holds on 30s centers,\n\
        with 90s between sets:\n\n    \
        week 1: 3 sets\n    \
        week 2: 4 sets\n    \
        week 3: 5 sets\n    \
        week 4: 3 sets, with an extra 12s hold")]
    MaxHang {
        /// Week of the cycle (1-4)
        #[arg(long, short)]
        week: u8,
        /// Force to hold above, e.g. 400N or 90lbf; a bare number is newtons
        #[arg(long, short, value_name = "FORCE")]
        threshold: Force,
    },
    /// Pull as hard as possible until the peak stands for a whole hold
    MaxTest {
        /// Hold length in seconds
        #[arg(long, short = 'd', value_name = "SECS", default_value_t = 12.0)]
        hold: f64,
    },
    /// Check the load cell (and lights) work
    SelfCheck {
        /// Samples to read after taring
        #[arg(long, value_name = "N", default_value_t = 10)]
        samples: usize,
    },
}
