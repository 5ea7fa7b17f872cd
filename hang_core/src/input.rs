//! What a phase waits for, and what the athlete is currently giving it.
use hang_traits::{Force, ForceSample};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Minimum rise that counts as a deliberate pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeThreshold {
    pub min_delta: Force,
    pub min_duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedInput {
    /// At least this much force.
    Force(Force),
    /// A rise of at least `min_delta` held for `min_duration`.
    Edge(EdgeThreshold),
    None,
}

impl ExpectedInput {
    pub fn rising_edge(min_delta: Force) -> Self {
        Self::Edge(EdgeThreshold {
            min_delta,
            min_duration: Duration::ZERO,
        })
    }
}

#[derive(Debug, Clone)]
pub enum ActualInput {
    Force(Force),
    Edge(Arc<EdgeTracker>),
    None,
}

impl ActualInput {
    /// Matching variants compare; any mismatch, or no input at all, is unsatisfied.
    pub fn satisfies(&self, expected: &ExpectedInput) -> bool {
        match (self, expected) {
            (ActualInput::Force(got), ExpectedInput::Force(required)) => got >= required,
            (ActualInput::Edge(tracker), ExpectedInput::Edge(threshold)) => {
                tracker.satisfies(threshold)
            }
            (ActualInput::Force(_), ExpectedInput::Edge(_) | ExpectedInput::None)
            | (ActualInput::Edge(_), ExpectedInput::Force(_) | ExpectedInput::None)
            | (ActualInput::None, _) => false,
        }
    }
}

/// Accumulates samples for rising-edge detection.
///
/// Shared between the interval feeding it and the displays reading it.
#[derive(Debug, Default)]
pub struct EdgeTracker {
    samples: Mutex<Vec<ForceSample>>,
}

impl EdgeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, samples: &[ForceSample]) {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(samples);
    }

    /// True once some sample rose more than `min_delta` above the lowest
    /// point before it, at least `min_duration` after that low point.
    pub fn satisfies(&self, threshold: &EdgeThreshold) -> bool {
        let samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        let mut low: Option<ForceSample> = None;
        for s in samples.iter() {
            let anchor = low.get_or_insert(*s);
            if s.force < anchor.force {
                *anchor = *s;
                continue;
            }
            if s.time.saturating_duration_since(anchor.time) >= threshold.min_duration
                && s.force - anchor.force > threshold.min_delta
            {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn force_needs_at_least_the_target() {
        let want = ExpectedInput::Force(Force::NEWTON * 400);
        assert!(ActualInput::Force(Force::NEWTON * 400).satisfies(&want));
        assert!(!ActualInput::Force(Force::NEWTON * 399).satisfies(&want));
    }

    #[test]
    fn mismatched_or_absent_input_never_satisfies() {
        let edge = Arc::new(EdgeTracker::new());
        assert!(!ActualInput::None.satisfies(&ExpectedInput::None));
        assert!(!ActualInput::None.satisfies(&ExpectedInput::Force(Force::ZERO)));
        assert!(!ActualInput::Force(Force::NEWTON).satisfies(&ExpectedInput::None));
        assert!(!ActualInput::Edge(edge).satisfies(&ExpectedInput::Force(Force::ZERO)));
    }

    #[test]
    fn edge_detects_rise_from_the_low_point() {
        let t0 = Instant::now();
        let at = |ms, n| ForceSample::new(Force::NEWTON * n, t0 + Duration::from_millis(ms));
        let tracker = Arc::new(EdgeTracker::new());
        let actual = ActualInput::Edge(tracker.clone());
        let want = ExpectedInput::rising_edge(Force::NEWTON * 100);

        tracker.update(&[at(0, 50), at(100, 10), at(200, 100)]);
        assert!(!actual.satisfies(&want), "90N rise is not enough");

        tracker.update(&[at(300, 111)]);
        assert!(actual.satisfies(&want));
    }
}
