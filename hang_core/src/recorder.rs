//! Persistence sinks for raw samples and the interval outcome.
//!
//! An interval opens one session with [`Recorder::start`], streams samples
//! through [`Updater::write`], reports the outcome once with
//! [`Updater::finish`] and always [`Updater::close`]s the session. Writing or
//! finishing after the session has been finished or closed is
//! [`RecordError::WriteAfterClosed`].
use crate::error::RecordError;
use crate::status::WorkoutOutcome;
use chrono::Local;
use hang_traits::{Context, ForceSample};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

pub trait Recorder: Send + Sync {
    fn start(&self, ctx: &Context, descriptor: &str) -> Result<Box<dyn Updater>, RecordError>;
}

impl<R: Recorder + ?Sized> Recorder for Arc<R> {
    fn start(&self, ctx: &Context, descriptor: &str) -> Result<Box<dyn Updater>, RecordError> {
        (**self).start(ctx, descriptor)
    }
}

pub trait Updater: Send + Sync {
    fn write(&self, samples: &[ForceSample]) -> Result<(), RecordError>;
    fn finish(&self, outcome: WorkoutOutcome) -> Result<(), RecordError>;
    /// Idempotent.
    fn close(&self);
}

/// Closes the wrapped session when dropped, whatever path the interval exits by.
pub struct CloseOnDrop(Box<dyn Updater>);

impl CloseOnDrop {
    pub fn new(updater: Box<dyn Updater>) -> Self {
        Self(updater)
    }
}

impl Updater for CloseOnDrop {
    fn write(&self, samples: &[ForceSample]) -> Result<(), RecordError> {
        self.0.write(samples)
    }
    fn finish(&self, outcome: WorkoutOutcome) -> Result<(), RecordError> {
        self.0.finish(outcome)
    }
    fn close(&self) {
        self.0.close();
    }
}

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Samples buffered by a session until it is finished.
#[derive(Debug, Default)]
pub(crate) struct SampleBuffer {
    samples: Vec<ForceSample>,
    closed: bool,
}

impl SampleBuffer {
    pub(crate) fn extend(&mut self, samples: &[ForceSample]) -> Result<(), RecordError> {
        self.ensure_open()?;
        self.samples.extend_from_slice(samples);
        Ok(())
    }

    pub(crate) fn ensure_open(&self) -> Result<(), RecordError> {
        if self.closed {
            return Err(RecordError::WriteAfterClosed);
        }
        Ok(())
    }

    /// Time-sorted samples, or `NoData` when nothing was written.
    pub(crate) fn sorted(&mut self) -> Result<&mut [ForceSample], RecordError> {
        if self.samples.is_empty() {
            return Err(RecordError::NoData);
        }
        self.samples.sort_by_key(|s| s.time);
        Ok(&mut self.samples)
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── CSV ─────────────────────────────────────────────────────────────────────

/// Writes one `time,force` CSV per session into a directory.
///
/// Rows are milliseconds since the first sample and whole newtons. A session
/// that saw no samples leaves no file behind.
#[derive(Debug, Clone)]
pub struct CsvRecorder {
    dir: PathBuf,
}

impl CsvRecorder {
    /// Create the directory if it does not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, RecordError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Recorder for CsvRecorder {
    fn start(&self, _ctx: &Context, descriptor: &str) -> Result<Box<dyn Updater>, RecordError> {
        let name = format!(
            "{}-{}.csv",
            Local::now().format("%Y%m%d%H%M%S"),
            file_safe(descriptor)
        );
        let path = self.dir.join(name);
        tracing::debug!(path = %path.display(), "recording session opened");
        Ok(Box::new(CsvUpdater {
            path,
            buffer: Mutex::new(SampleBuffer::default()),
        }))
    }
}

fn file_safe(descriptor: &str) -> String {
    descriptor
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | ',' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

struct CsvUpdater {
    path: PathBuf,
    buffer: Mutex<SampleBuffer>,
}

impl Updater for CsvUpdater {
    fn write(&self, samples: &[ForceSample]) -> Result<(), RecordError> {
        lock(&self.buffer).extend(samples)
    }

    fn finish(&self, outcome: WorkoutOutcome) -> Result<(), RecordError> {
        let mut buffer = lock(&self.buffer);
        buffer.ensure_open()?;
        let samples = buffer.sorted()?;
        let first = samples[0].time;

        let mut out = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        out.write_record(["time", "force"])?;
        for s in samples.iter() {
            let ms = s.time.saturating_duration_since(first).as_millis();
            out.write_record([ms.to_string(), s.force.whole_newtons().to_string()])?;
        }
        let bytes = out
            .into_inner()
            .map_err(|e| RecordError::Io(e.into_error()))?;
        let count = samples.len();
        write_atomic(&self.path, &bytes)?;
        buffer.close();

        tracing::info!(
            path = %self.path.display(),
            samples = count,
            %outcome,
            "recording saved"
        );
        Ok(())
    }

    fn close(&self) {
        lock(&self.buffer).close();
    }
}

/// Write to a sibling temp file, sync, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("new");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}

// ── Fan-out ─────────────────────────────────────────────────────────────────

/// One session recorded by several recorders at once.
#[derive(Default)]
pub struct MultiRecorder {
    recorders: Vec<Arc<dyn Recorder>>,
}

impl MultiRecorder {
    pub fn new(recorders: Vec<Arc<dyn Recorder>>) -> Self {
        Self { recorders }
    }

    pub fn push(&mut self, recorder: Arc<dyn Recorder>) {
        self.recorders.push(recorder);
    }
}

impl Recorder for MultiRecorder {
    fn start(&self, ctx: &Context, descriptor: &str) -> Result<Box<dyn Updater>, RecordError> {
        let mut updaters = Vec::with_capacity(self.recorders.len());
        for recorder in &self.recorders {
            match recorder.start(ctx, descriptor) {
                Ok(u) => updaters.push(u),
                Err(e) => {
                    for u in &updaters {
                        u.close();
                    }
                    return Err(e);
                }
            }
        }
        Ok(Box::new(MultiUpdater { updaters }))
    }
}

struct MultiUpdater {
    updaters: Vec<Box<dyn Updater>>,
}

impl MultiUpdater {
    /// Runs `f` on every updater, even after one fails, and keeps the first error.
    fn each(&self, f: impl Fn(&dyn Updater) -> Result<(), RecordError>) -> Result<(), RecordError> {
        self.updaters
            .iter()
            .map(|u| f(u.as_ref()))
            .fold(Ok(()), |first, next| first.and(next))
    }
}

impl Updater for MultiUpdater {
    fn write(&self, samples: &[ForceSample]) -> Result<(), RecordError> {
        self.each(|u| u.write(samples))
    }

    fn finish(&self, outcome: WorkoutOutcome) -> Result<(), RecordError> {
        self.each(|u| u.finish(outcome))
    }

    fn close(&self) {
        for u in &self.updaters {
            u.close();
        }
    }
}
