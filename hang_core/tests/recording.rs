//! Recorders wired together the way the CLI wires them.

use hang_core::mocks::{MemoryRecorder, RecordingDisplay, ScriptedSensor};
use hang_core::{
    CsvRecorder, IntervalTiming, MultiRecorder, Recorder, RecordError, SummaryFormat,
    SummaryRecorder, WorkInterval, Workout, WorkoutOutcome,
};
use hang_traits::{Context, Force, ForceSample};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().expect("lock").clone()).expect("utf8")
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("lock").write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn a_hold_lands_in_csv_memory_and_summary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let memory = MemoryRecorder::new();
    let summary = SharedBuf::default();
    let recorder = MultiRecorder::new(vec![
        Arc::new(CsvRecorder::new(dir.path()).expect("csv")),
        Arc::new(memory.clone()),
        Arc::new(SummaryRecorder::new(summary.clone(), SummaryFormat::Text)),
    ]);

    let forces: Vec<i64> = (0..=12).map(|i| if i == 0 { 0 } else { 450 }).collect();
    let mut sensor =
        ScriptedSensor::with_forces(Instant::now(), Duration::from_millis(100), &forces);
    let timing = IntervalTiming {
        tare_window: Duration::from_millis(10),
        tare_settle: Duration::ZERO,
        ..IntervalTiming::default()
    };
    WorkInterval::new(Force::NEWTON * 400, Duration::from_secs(1))
        .with_timing(timing)
        .run(&Context::background(), &RecordingDisplay::new(), &mut sensor, &recorder)
        .expect("hold completes");

    let sessions = memory.sessions();
    assert_eq!(sessions[0].outcome, Some(WorkoutOutcome::Success));
    let recorded = sessions[0].samples.len();

    let files: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .map(|e| e.expect("entry").path())
        .collect();
    assert_eq!(files.len(), 1);
    let body = std::fs::read_to_string(&files[0]).expect("csv");
    let mut lines = body.lines();
    assert_eq!(lines.next(), Some("time,force"));
    assert_eq!(lines.next(), Some("0,0"));
    assert_eq!(lines.next(), Some("100,450"));
    assert_eq!(body.lines().count(), recorded + 1);

    let text = summary.text();
    assert!(text.starts_with("static-1s-400.0N (success)"), "{text}");
    assert!(text.contains("peak force:"));
}

#[test]
fn a_failed_start_closes_the_sessions_already_opened() {
    let first = MemoryRecorder::new();
    let recorder = MultiRecorder::new(vec![
        Arc::new(first.clone()),
        Arc::new(MemoryRecorder::failing()),
    ]);
    assert!(matches!(
        recorder.start(&Context::background(), "max-test-5s"),
        Err(RecordError::Io(_))
    ));
    let sessions = first.sessions();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].closed);
}

#[test]
fn fan_out_reports_no_data_and_closes_everything() {
    let a = MemoryRecorder::new();
    let b = MemoryRecorder::new();
    let recorder = MultiRecorder::new(vec![Arc::new(a.clone()), Arc::new(b.clone())]);
    let session = recorder
        .start(&Context::background(), "rest-30s")
        .expect("start");
    assert!(matches!(
        session.finish(WorkoutOutcome::Pass),
        Err(RecordError::NoData)
    ));
    session.close();
    assert!(a.sessions()[0].closed);
    assert!(b.sessions()[0].closed);

    assert!(matches!(
        session.write(&[ForceSample::new(Force::NEWTON, Instant::now())]),
        Err(RecordError::WriteAfterClosed)
    ));
}
