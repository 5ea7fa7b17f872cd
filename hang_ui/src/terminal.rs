//! Single-line terminal view, redrawn in place on every refresh.
//!
//! ```text
//!     Pull    4.21s    ████████░░░░░░░░░░░░    ██████████████░░░░░░░|░░░░░░░░░
//! ```
//!
//! Title, time left, progress through the timed part of the phase, and the
//! received force against the required force with a `|` marking the target.
use std::fmt::Write as _;
use std::io::Write;
use std::time::{Duration, Instant};

use hang_core::input::{ActualInput, ExpectedInput};
use hang_core::{DisplayError, PhaseState, PhaseTag, Render};

const PROGRESS_WIDTH: usize = 20;
const POWER_WIDTH: usize = 30;
const FILLED: char = '█';
const EMPTY: char = '░';
const MARKER: char = '|';
const GAP: &str = "    ";
/// The progress bar turns red once less than this is left.
const HURRY: Duration = Duration::from_secs(3);

const CLEAR_LINE: &str = "\r\x1b[2K";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Yellow,
    Green,
}

impl Color {
    fn ansi(self) -> &'static str {
        match self {
            Color::Red => "\x1b[31m",
            Color::Yellow => "\x1b[33m",
            Color::Green => "\x1b[32m",
        }
    }
}

struct Segment {
    text: String,
    color: Option<Color>,
}

impl Segment {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
        }
    }

    fn colored(text: String, color: Color) -> Self {
        Self {
            text,
            color: Some(color),
        }
    }

    fn write_to(&self, line: &mut String, use_color: bool) {
        match self.color {
            Some(c) if use_color => {
                let _ = write!(line, "{}{}{RESET}", c.ansi(), self.text);
            }
            _ => line.push_str(&self.text),
        }
    }
}

/// Renders phase states onto a terminal-like writer.
pub struct TerminalRenderer<W: Write + Send> {
    out: W,
    color: bool,
}

impl<W: Write + Send> TerminalRenderer<W> {
    /// Plain output; see [`with_color`](Self::with_color).
    pub fn new(out: W) -> Self {
        Self { out, color: false }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) -> Result<(), DisplayError> {
        self.out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|e| DisplayError::Sink(format!("terminal write failed: {e}")))
    }
}

impl<W: Write + Send> Render for TerminalRenderer<W> {
    fn render(&mut self, state: &PhaseState, now: Instant) -> Result<(), DisplayError> {
        let text = format!("{CLEAR_LINE}{}", line(state, now, self.color));
        self.emit(&text)
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.emit(CLEAR_LINE)
    }
}

/// The text drawn for `state` at `now`, without the line-clearing prefix.
pub fn line(state: &PhaseState, now: Instant, use_color: bool) -> String {
    let segments = [
        title(state),
        clock(state, now),
        progress(state, now),
        power(state),
    ];
    let mut out = String::from(GAP);
    let mut first = true;
    for seg in segments.iter().flatten() {
        if !first {
            out.push_str(GAP);
        }
        first = false;
        seg.write_to(&mut out, use_color);
    }
    out
}

fn title(state: &PhaseState) -> Option<Segment> {
    match state.tag() {
        PhaseTag::Halt => None,
        tag => Some(Segment::plain(tag.label())),
    }
}

fn clock(state: &PhaseState, now: Instant) -> Option<Segment> {
    let ttl = state.expiring()?.remaining_at(now);
    Some(Segment::plain(format!("{:5.2}s", ttl.as_secs_f64())))
}

fn progress(state: &PhaseState, now: Instant) -> Option<Segment> {
    let expiry = state.expiring()?;
    let deadline = expiry.deadline();
    let start = expiry.since().or(state.started_at()).unwrap_or(now);
    let total = deadline.saturating_duration_since(start);
    let elapsed = now.saturating_duration_since(start).min(total);
    let color = if total - elapsed < HURRY {
        Color::Red
    } else {
        Color::Green
    };
    Some(Segment::colored(
        bar(elapsed.as_nanos(), total.as_nanos(), PROGRESS_WIDTH),
        color,
    ))
}

fn power(state: &PhaseState) -> Option<Segment> {
    let dependency = state.input_dependent()?;
    let (ExpectedInput::Force(required), ActualInput::Force(received)) =
        (dependency.required(), dependency.received())
    else {
        return None;
    };
    let required = i128::from(required.nanonewtons());
    let received = i128::from(received.nanonewtons());
    let overfill = required * 4 / 3;
    if overfill <= 0 {
        return None;
    }
    let color = if dependency.satisfied() {
        Color::Green
    } else if received > required * 3 / 4 {
        Color::Yellow
    } else {
        Color::Red
    };
    Some(Segment::colored(
        bar_with_marker(received, required, overfill, POWER_WIDTH),
        color,
    ))
}

/// `width` cells, the first `val / max` of them filled. An empty range is full.
pub fn bar(val: u128, max: u128, width: usize) -> String {
    let filled = if max == 0 {
        width
    } else {
        usize::try_from(val.min(max) * width as u128 / max).unwrap_or(width)
    };
    (0..width)
        .map(|i| if i < filled { FILLED } else { EMPTY })
        .collect()
}

/// Like [`bar`] scaled to `overfill`, with a marker after the cell where
/// `threshold` falls.
pub fn bar_with_marker(val: i128, threshold: i128, overfill: i128, width: usize) -> String {
    let scale = width.saturating_sub(1) as i128;
    let cells = |v: i128| usize::try_from((scale * v / overfill).max(0)).unwrap_or(usize::MAX);
    let filled = cells(val).min(width);
    let marker = cells(threshold);
    let mut s = String::with_capacity(width + 1);
    for i in 0..width {
        s.push(if i < filled { FILLED } else { EMPTY });
        if i + 1 == marker {
            s.push(MARKER);
        }
    }
    s
}
