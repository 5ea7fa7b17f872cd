//! Display sinks and the machinery shared by self-refreshing displays.
//!
//! Intervals push [`PhaseState`]s into a [`DisplaySink`]. Simple sinks act
//! on each update; refreshing sinks keep the latest state in a
//! [`StateHolder`] and redraw it on their own tick so countdowns advance
//! between updates.
use crate::error::DisplayError;
use crate::phase::PhaseState;
use hang_traits::{Clock, Context};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub trait DisplaySink: Send + Sync {
    fn update_state(&self, state: PhaseState) -> Result<(), DisplayError>;
}

impl<D: DisplaySink + ?Sized> DisplaySink for Arc<D> {
    fn update_state(&self, state: PhaseState) -> Result<(), DisplayError> {
        (**self).update_state(state)
    }
}

/// A sink that redraws on its own schedule once started.
pub trait AutoRefresh: DisplaySink {
    fn start(&self, ctx: &Context);
}

/// Fans each update out to every sink, in order, stopping at the first error.
#[derive(Default)]
pub struct DisplayMux {
    sinks: Vec<Arc<dyn DisplaySink>>,
}

impl DisplayMux {
    pub fn new(sinks: Vec<Arc<dyn DisplaySink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn DisplaySink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl DisplaySink for DisplayMux {
    fn update_state(&self, state: PhaseState) -> Result<(), DisplayError> {
        for sink in &self.sinks {
            sink.update_state(state.clone())?;
        }
        Ok(())
    }
}

/// Owns the current state and resolves its expiry on every read.
pub struct StateHolder {
    current: Mutex<Option<PhaseState>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl StateHolder {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            current: Mutex::new(None),
            clock,
        }
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// The live state as of the holder's clock.
    pub fn current(&self) -> Result<PhaseState, DisplayError> {
        self.current_at(self.clock.now())
    }

    /// The live state as of `now`, replacing an expired state with its
    /// (started) fallback.
    pub fn current_at(&self, now: Instant) -> Result<PhaseState, DisplayError> {
        let mut guard = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let held = guard.as_ref().ok_or(DisplayError::Uninitialized)?;
        let live = held.resolve(now);
        if !live.same_as(held) {
            tracing::debug!(from = %held.tag(), to = %live.tag(), "phase expired");
            *guard = Some(live.clone());
        }
        Ok(live)
    }
}

impl DisplaySink for StateHolder {
    fn update_state(&self, state: PhaseState) -> Result<(), DisplayError> {
        state.start(self.clock.now());
        tracing::debug!(phase = %state.tag(), "phase update");
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(state);
        Ok(())
    }
}

/// Draws a state onto some output.
pub trait Render: Send {
    fn render(&mut self, state: &PhaseState, now: Instant) -> Result<(), DisplayError>;

    /// Called once when refreshing stops.
    fn clear(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}

/// Self-refreshing sink: holds the latest state and re-renders it every
/// `period` on a background thread until the start context is done or the
/// display is dropped.
pub struct RefreshingDisplay<R: Render + 'static> {
    holder: Arc<StateHolder>,
    renderer: Arc<Mutex<R>>,
    period: Duration,
    running: Mutex<Option<(Context, JoinHandle<()>)>>,
}

impl<R: Render + 'static> RefreshingDisplay<R> {
    pub fn new(renderer: R, period: Duration, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            holder: Arc::new(StateHolder::new(clock)),
            renderer: Arc::new(Mutex::new(renderer)),
            period: period.max(Duration::from_millis(1)),
            running: Mutex::new(None),
        }
    }

    pub fn holder(&self) -> &StateHolder {
        &self.holder
    }

    /// Render the current state once, if there is one.
    pub fn refresh(&self) -> Result<(), DisplayError> {
        refresh_once(&self.holder, &self.renderer)
    }

    /// Stop the refresh thread and wait for it to clear the output.
    pub fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some((ctx, handle)) = running {
            ctx.cancel();
            if handle.join().is_err() {
                tracing::warn!("display refresh thread panicked");
            }
        }
    }
}

fn refresh_once<R: Render>(holder: &StateHolder, renderer: &Mutex<R>) -> Result<(), DisplayError> {
    let now = holder.now();
    match holder.current_at(now) {
        Ok(state) => renderer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .render(&state, now),
        Err(DisplayError::Uninitialized) => Ok(()),
        Err(e) => Err(e),
    }
}

impl<R: Render + 'static> DisplaySink for RefreshingDisplay<R> {
    fn update_state(&self, state: PhaseState) -> Result<(), DisplayError> {
        self.holder.update_state(state)
    }
}

impl<R: Render + 'static> AutoRefresh for RefreshingDisplay<R> {
    /// Spawn the refresh thread; a second call while running is a no-op.
    fn start(&self, ctx: &Context) {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.is_some() {
            return;
        }
        let ctx = ctx.with_cancel();
        let thread_ctx = ctx.clone();
        let holder = Arc::clone(&self.holder);
        let renderer = Arc::clone(&self.renderer);
        let period = self.period;

        let handle = std::thread::spawn(move || {
            loop {
                if let Err(e) = refresh_once(&holder, &renderer) {
                    tracing::warn!(error = %e, "display refresh failed");
                }
                if thread_ctx.sleep(period).is_err() {
                    break;
                }
            }
            if let Err(e) = renderer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clear()
            {
                tracing::warn!(error = %e, "display clear failed");
            }
            tracing::trace!("display refresh thread exiting");
        });
        *running = Some((ctx, handle));
    }
}

impl<R: Render + 'static> Drop for RefreshingDisplay<R> {
    fn drop(&mut self) {
        self.stop();
    }
}
