//! What the athlete should currently be doing.
//!
//! A [`PhaseState`] is a base [`PhaseTag`] plus two optional capabilities:
//!
//! - [`Expiry`]: a deadline and the state that takes over once it passes.
//! - [`InputDependency`]: the input the phase waits for and what is being
//!   received right now.
//!
//! States are immutable once built and cheap to clone. Clones share the
//! once-settable start time, so starting any clone starts them all.
use crate::input::{ActualInput, ExpectedInput};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseTag {
    Halt,
    Rest,
    Tare,
    Wait,
    Work,
}

impl PhaseTag {
    /// Short label shown to the athlete.
    pub fn label(self) -> &'static str {
        match self {
            PhaseTag::Halt => "Halt",
            PhaseTag::Rest => "Rest",
            PhaseTag::Tare => "Taring",
            PhaseTag::Wait => "Ready",
            PhaseTag::Work => "Pull",
        }
    }
}

impl fmt::Display for PhaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct Expiry {
    deadline: Instant,
    fallback: PhaseState,
    /// Start of the timed span when it predates the state itself.
    since: Option<Instant>,
}

impl Expiry {
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Where the countdown started, if the state carries it. Successive
    /// states of one timed span share this instant.
    pub fn since(&self) -> Option<Instant> {
        self.since
    }

    pub fn fallback(&self) -> &PhaseState {
        &self.fallback
    }

    /// Strictly after the deadline; the deadline instant itself is still live.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.deadline
    }

    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }
}

#[derive(Debug, Clone)]
pub struct InputDependency {
    required: ExpectedInput,
    received: ActualInput,
}

impl InputDependency {
    pub fn required(&self) -> &ExpectedInput {
        &self.required
    }

    pub fn received(&self) -> &ActualInput {
        &self.received
    }

    pub fn satisfied(&self) -> bool {
        self.received.satisfies(&self.required)
    }
}

#[derive(Debug, Clone)]
pub struct PhaseState {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    tag: PhaseTag,
    expiry: Option<Expiry>,
    input: Option<InputDependency>,
    started: OnceLock<Instant>,
}

impl PhaseState {
    pub fn builder(tag: PhaseTag) -> PhaseStateBuilder {
        PhaseStateBuilder {
            tag,
            expiry: None,
            input: None,
        }
    }

    pub fn tag(&self) -> PhaseTag {
        self.inner.tag
    }

    pub fn expiring(&self) -> Option<&Expiry> {
        self.inner.expiry.as_ref()
    }

    pub fn input_dependent(&self) -> Option<&InputDependency> {
        self.inner.input.as_ref()
    }

    /// Record the start time; later calls are ignored.
    pub fn start(&self, now: Instant) {
        let _ = self.inner.started.set(now);
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.inner.started.get().copied()
    }

    /// Follow expired fallbacks until a live state is reached, starting each
    /// substitute at `now`.
    pub fn resolve(&self, now: Instant) -> PhaseState {
        let mut current = self.clone();
        loop {
            let next = match current.expiring() {
                Some(expiry) if expiry.is_expired_at(now) => expiry.fallback().clone(),
                _ => return current,
            };
            next.start(now);
            current = next;
        }
    }

    /// Same underlying state (not merely equal contents).
    pub fn same_as(&self, other: &PhaseState) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

pub struct PhaseStateBuilder {
    tag: PhaseTag,
    expiry: Option<Expiry>,
    input: Option<InputDependency>,
}

impl PhaseStateBuilder {
    pub fn with_expiry_and_fallback(mut self, deadline: Instant, fallback: PhaseState) -> Self {
        self.expiry = Some(Expiry {
            deadline,
            fallback,
            since: None,
        });
        self
    }

    /// Like [`with_expiry_and_fallback`](Self::with_expiry_and_fallback) for
    /// a span that began at `since`.
    pub fn with_timed_span(
        mut self,
        since: Instant,
        deadline: Instant,
        fallback: PhaseState,
    ) -> Self {
        self.expiry = Some(Expiry {
            deadline,
            fallback,
            since: Some(since),
        });
        self
    }

    pub fn with_expected_input(mut self, required: ExpectedInput, received: ActualInput) -> Self {
        self.input = Some(InputDependency { required, received });
        self
    }

    pub fn build(self) -> PhaseState {
        PhaseState {
            inner: Arc::new(Inner {
                tag: self.tag,
                expiry: self.expiry,
                input: self.input,
                started: OnceLock::new(),
            }),
        }
    }
}

// ── Factories ───────────────────────────────────────────────────────────────

pub fn halt() -> PhaseState {
    PhaseState::builder(PhaseTag::Halt).build()
}

pub fn rest(deadline: Instant) -> PhaseState {
    PhaseState::builder(PhaseTag::Rest)
        .with_expiry_and_fallback(deadline, halt())
        .build()
}

pub fn tare(deadline: Instant) -> PhaseState {
    PhaseState::builder(PhaseTag::Tare)
        .with_expiry_and_fallback(deadline, halt())
        .build()
}

pub fn wait_for_input(required: ExpectedInput, received: ActualInput) -> PhaseState {
    PhaseState::builder(PhaseTag::Wait)
        .with_expected_input(required, received)
        .build()
}

/// A hold that began at `since` and is due at `deadline`. Past the
/// deadline the athlete is still pulling, so it reads back as an untimed
/// `Work` state with the same input.
pub fn work(
    required: ExpectedInput,
    received: ActualInput,
    since: Instant,
    deadline: Instant,
) -> PhaseState {
    let overtime = PhaseState::builder(PhaseTag::Work)
        .with_expected_input(required, received.clone())
        .build();
    PhaseState::builder(PhaseTag::Work)
        .with_expected_input(required, received)
        .with_timed_span(since, deadline, overtime)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hang_traits::Force;

    #[test]
    fn expired_state_reads_back_as_fallback() {
        let now = Instant::now();
        let s = PhaseState::builder(PhaseTag::Work)
            .with_expiry_and_fallback(now - Duration::from_secs(1), halt())
            .build();
        let resolved = s.resolve(now);
        assert_eq!(resolved.tag(), PhaseTag::Halt);
        assert_eq!(resolved.started_at(), Some(now));
    }

    #[test]
    fn deadline_instant_is_still_live() {
        let now = Instant::now();
        let s = rest(now);
        assert!(s.resolve(now).same_as(&s));
        assert_eq!(
            s.resolve(now + Duration::from_millis(1)).tag(),
            PhaseTag::Halt
        );
    }

    #[test]
    fn chained_fallbacks_resolve_recursively() {
        let now = Instant::now();
        let inner = tare(now - Duration::from_secs(1));
        let outer = PhaseState::builder(PhaseTag::Rest)
            .with_expiry_and_fallback(now - Duration::from_secs(2), inner)
            .build();
        assert_eq!(outer.resolve(now).tag(), PhaseTag::Halt);
    }

    #[test]
    fn start_is_once_only_and_shared_by_clones() {
        let now = Instant::now();
        let s = halt();
        let clone = s.clone();
        s.start(now);
        clone.start(now + Duration::from_secs(5));
        assert_eq!(clone.started_at(), Some(now));
    }

    #[test]
    fn capabilities_are_optional() {
        let h = halt();
        assert!(h.expiring().is_none());
        assert!(h.input_dependent().is_none());

        let now = Instant::now();
        let w = work(
            ExpectedInput::Force(Force::NEWTON * 400),
            ActualInput::Force(Force::NEWTON * 450),
            now,
            now,
        );
        assert!(w.expiring().is_some());
        assert!(w.input_dependent().is_some_and(InputDependency::satisfied));
        assert_eq!(w.tag().label(), "Pull");
    }

    #[test]
    fn work_past_its_deadline_stays_work_without_a_clock() {
        let now = Instant::now();
        let since = now - Duration::from_secs(4);
        let w = work(
            ExpectedInput::Force(Force::NEWTON * 400),
            ActualInput::Force(Force::NEWTON * 350),
            since,
            since + Duration::from_secs(3),
        );
        assert_eq!(w.expiring().and_then(Expiry::since), Some(since));

        let live = w.resolve(now);
        assert_eq!(live.tag(), PhaseTag::Work);
        assert!(live.expiring().is_none());
        assert!(live.input_dependent().is_some_and(|d| !d.satisfied()));
    }
}
