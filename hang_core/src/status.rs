//! Outcome recorded when an interval finishes.
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutOutcome {
    /// The interval's goal was met.
    Success,
    /// Skipped or not graded.
    Pass,
    /// The safety deadline ran out before the goal was met.
    Failure,
}

impl WorkoutOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkoutOutcome::Success => "success",
            WorkoutOutcome::Pass => "pass",
            WorkoutOutcome::Failure => "failure",
        }
    }
}

impl fmt::Display for WorkoutOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
