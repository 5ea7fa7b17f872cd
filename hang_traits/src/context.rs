//! Cancellable, deadline-bearing execution context.
//!
//! A [`Context`] is cheap to clone and forms a parent chain: cancelling a
//! context cancels every context derived from it, and a child's effective
//! deadline is the earliest deadline along its chain. Blocking helpers poll
//! in [`TICK`] steps so cancellation is noticed within one tick.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Polling granularity for blocking waits.
pub const TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    parent: Option<Context>,
    cancelled: AtomicBool,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// Root context: never cancelled unless [`Context::cancel`] is called,
    /// no deadline.
    pub fn background() -> Self {
        Self::derive(None, None)
    }

    fn derive(parent: Option<Context>, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                parent,
                cancelled: AtomicBool::new(false),
                deadline,
            }),
        }
    }

    /// Child that can be cancelled without affecting `self`.
    pub fn with_cancel(&self) -> Self {
        Self::derive(Some(self.clone()), None)
    }

    /// Child whose deadline is `now + timeout` (or the parent's, if earlier).
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.with_cancel(),
        }
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self::derive(Some(self.clone()), Some(deadline))
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// Earliest deadline along the parent chain.
    pub fn deadline(&self) -> Option<Instant> {
        let own = self.inner.deadline;
        let inherited = self.inner.parent.as_ref().and_then(Context::deadline);
        match (own, inherited) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
            || self
                .inner
                .parent
                .as_ref()
                .is_some_and(Context::is_cancelled)
    }

    /// Why this context is done as of `now`, if it is. Cancellation wins
    /// over an elapsed deadline.
    pub fn err_at(&self, now: Instant) -> Option<ContextError> {
        if self.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline() {
            Some(d) if now >= d => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn err(&self) -> Option<ContextError> {
        self.err_at(Instant::now())
    }

    /// `Err` once the context is done.
    pub fn check(&self) -> Result<(), ContextError> {
        match self.err() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Time left before the deadline; `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Sleep for `d`, returning early with the context error if the context
    /// finishes first.
    pub fn sleep(&self, d: Duration) -> Result<(), ContextError> {
        let Some(until) = Instant::now().checked_add(d) else {
            return Err(self.wait());
        };
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= until {
                return Ok(());
            }
            std::thread::sleep((until - now).min(self.step()));
        }
    }

    /// Block until the context is done and report why.
    pub fn wait(&self) -> ContextError {
        loop {
            if let Some(e) = self.err() {
                return e;
            }
            std::thread::sleep(self.step());
        }
    }

    /// One polling step, shortened so a deadline is hit on time.
    fn step(&self) -> Duration {
        match self.remaining() {
            Some(r) if !r.is_zero() => r.min(TICK),
            _ => TICK,
        }
    }
}
