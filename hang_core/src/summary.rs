//! Per-interval statistics printed or logged after a session finishes.
use crate::analytics::{
    max_threshold_force_over_interval, peak_force_over_interval, rate_of_force_development,
};
use crate::error::RecordError;
use crate::recorder::{Recorder, SampleBuffer, Updater};
use crate::status::WorkoutOutcome;
use hang_traits::{Context, Force, ForceSample};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Averaging window for the reported peak.
pub const PEAK_WINDOW: Duration = Duration::from_millis(100);
/// Sustained-force windows, in seconds.
pub const SUSTAINED_WINDOWS_S: [u64; 4] = [3, 6, 9, 12];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SustainedForce {
    pub window_s: u64,
    pub newtons: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutSummary {
    pub descriptor: String,
    pub outcome: WorkoutOutcome,
    pub samples: usize,
    pub duration_ms: u64,
    pub peak_newtons: f64,
    /// Time to 90% of peak from the start of the main rise.
    pub rfd_ms: u64,
    /// Only windows holding at least 1N are listed.
    pub sustained: Vec<SustainedForce>,
}

impl WorkoutSummary {
    /// Sorts `samples` in place and derives the summary; empty input is `NoData`.
    pub fn from_samples(
        descriptor: &str,
        outcome: WorkoutOutcome,
        samples: &mut [ForceSample],
    ) -> Result<Self, RecordError> {
        let (Some(first), Some(last)) = (
            samples.iter().map(|s| s.time).min(),
            samples.iter().map(|s| s.time).max(),
        ) else {
            return Err(RecordError::NoData);
        };
        samples.sort_by_key(|s| s.time);

        let peak = peak_force_over_interval(PEAK_WINDOW, samples);
        let rfd = rate_of_force_development(peak.saturating_mul(9) / 10, samples);
        let sustained = SUSTAINED_WINDOWS_S
            .iter()
            .filter_map(|&secs| {
                let f = max_threshold_force_over_interval(Duration::from_secs(secs), samples);
                (f >= Force::NEWTON).then(|| SustainedForce {
                    window_s: secs,
                    newtons: f.newtons(),
                })
            })
            .collect();

        Ok(Self {
            descriptor: descriptor.to_string(),
            outcome,
            samples: samples.len(),
            duration_ms: last.saturating_duration_since(first).as_millis() as u64,
            peak_newtons: peak.newtons(),
            rfd_ms: rfd.as_millis() as u64,
            sustained,
        })
    }
}

impl fmt::Display for WorkoutSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.descriptor, self.outcome)?;
        writeln!(f, "  peak force:         {:.1}N", self.peak_newtons)?;
        writeln!(f, "  rate of force dev.: {}ms to 90% of peak", self.rfd_ms)?;
        for s in &self.sustained {
            writeln!(f, "  sustained {:>2}s:      {:.1}N", s.window_s, s.newtons)?;
        }
        write!(
            f,
            "  {} samples over {:.1}s",
            self.samples,
            self.duration_ms as f64 / 1000.0
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryFormat {
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Prints a [`WorkoutSummary`] for every finished session.
pub struct SummaryRecorder<W: Write + Send + 'static> {
    out: Arc<Mutex<W>>,
    format: SummaryFormat,
}

impl<W: Write + Send + 'static> SummaryRecorder<W> {
    pub fn new(out: W, format: SummaryFormat) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
            format,
        }
    }
}

impl<W: Write + Send + 'static> Recorder for SummaryRecorder<W> {
    fn start(&self, _ctx: &Context, descriptor: &str) -> Result<Box<dyn Updater>, RecordError> {
        Ok(Box::new(SummaryUpdater {
            descriptor: descriptor.to_string(),
            out: Arc::clone(&self.out),
            format: self.format,
            buffer: Mutex::new(SampleBuffer::default()),
        }))
    }
}

struct SummaryUpdater<W: Write + Send> {
    descriptor: String,
    out: Arc<Mutex<W>>,
    format: SummaryFormat,
    buffer: Mutex<SampleBuffer>,
}

impl<W: Write + Send> Updater for SummaryUpdater<W> {
    fn write(&self, samples: &[ForceSample]) -> Result<(), RecordError> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(samples)
    }

    fn finish(&self, outcome: WorkoutOutcome) -> Result<(), RecordError> {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.ensure_open()?;
        let summary = WorkoutSummary::from_samples(&self.descriptor, outcome, buffer.sorted()?)?;
        tracing::info!(
            descriptor = %summary.descriptor,
            outcome = %summary.outcome,
            peak_n = summary.peak_newtons,
            rfd_ms = summary.rfd_ms,
            "interval summary"
        );

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        match self.format {
            SummaryFormat::Text => writeln!(out, "{summary}")?,
            SummaryFormat::Json => {
                serde_json::to_writer(&mut *out, &summary)?;
                writeln!(out)?;
            }
        }
        out.flush()?;
        buffer.close();
        Ok(())
    }

    fn close(&self) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .close();
    }
}
