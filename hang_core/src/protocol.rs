//! The four-week max hang cycle.
//!
//! | week | holds (30s rest between) | sets (90s rest between) |
//! |------|--------------------------|-------------------------|
//! | 1    | 3s, 6s, 9s               | 3                       |
//! | 2    | 3s, 6s, 9s               | 4                       |
//! | 3    | 3s, 6s, 9s               | 5                       |
//! | 4    | 3s, 6s, 9s, 12s          | 3                       |
use crate::error::ProtocolError;
use crate::interval::{IntervalTiming, MaxTest, RestInterval, SetupInterval, WorkInterval};
use crate::workout::{Composite, Workout};
use hang_traits::Force;
use std::sync::Arc;
use std::time::Duration;

pub const SETUP: Duration = Duration::from_secs(60);
pub const REST_BETWEEN_HOLDS: Duration = Duration::from_secs(30);
pub const REST_BETWEEN_SETS: Duration = Duration::from_secs(90);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Week {
    One,
    Two,
    Three,
    Four,
}

impl TryFrom<u8> for Week {
    type Error = ProtocolError;

    fn try_from(week: u8) -> Result<Self, Self::Error> {
        match week {
            1 => Ok(Week::One),
            2 => Ok(Week::Two),
            3 => Ok(Week::Three),
            4 => Ok(Week::Four),
            other => Err(ProtocolError::WeekOutOfRange(other)),
        }
    }
}

impl Week {
    /// Hold lengths in seconds within one set.
    pub fn holds(self) -> &'static [u64] {
        match self {
            Week::One | Week::Two | Week::Three => &[3, 6, 9],
            Week::Four => &[3, 6, 9, 12],
        }
    }

    pub fn sets(self) -> usize {
        match self {
            Week::One | Week::Four => 3,
            Week::Two => 4,
            Week::Three => 5,
        }
    }
}

/// Setup followed by `sets` repetitions of the week's holds.
pub fn max_hang_workout(week: u8, threshold: Force) -> Result<Composite, ProtocolError> {
    Ok(max_hang_program(
        Week::try_from(week)?,
        threshold,
        IntervalTiming::default(),
    ))
}

pub fn max_hang_program(week: Week, threshold: Force, timing: IntervalTiming) -> Composite {
    let mut rep = Composite::default();
    for (i, secs) in week.holds().iter().enumerate() {
        if i > 0 {
            rep.push(Arc::new(RestInterval(REST_BETWEEN_HOLDS)));
        }
        rep.push(Arc::new(
            WorkInterval::new(threshold, Duration::from_secs(*secs)).with_timing(timing),
        ));
    }
    let rep: Arc<dyn Workout> = Arc::new(rep);

    let mut program = Composite::default();
    program.push(Arc::new(SetupInterval::new(SETUP).with_timing(timing)));
    for set in 0..week.sets() {
        if set > 0 {
            program.push(Arc::new(RestInterval(REST_BETWEEN_SETS)));
        }
        program.push(Arc::clone(&rep));
    }
    program
}

/// Setup, then a max test whose peak must stand for `hold`.
pub fn max_test_program(hold: Duration, timing: IntervalTiming) -> Composite {
    let mut program = Composite::default();
    program.push(Arc::new(SetupInterval::new(SETUP).with_timing(timing)));
    program.push(Arc::new(MaxTest::new(hold).with_timing(timing)));
    program
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const REP: &str = "static-3s-400.0N,rest-30s,static-6s-400.0N,rest-30s,static-9s-400.0N";

    #[rstest]
    #[case(1, 3)]
    #[case(2, 4)]
    #[case(3, 5)]
    fn three_hold_weeks(#[case] week: u8, #[case] sets: usize) {
        let program = max_hang_workout(week, Force::NEWTON * 400).expect("program");
        // setup + sets + rests between sets
        assert_eq!(program.len(), 1 + sets + (sets - 1));
        let sets_body = vec![REP; sets].join(",rest-1m30s,");
        assert_eq!(program.to_string(), format!("setup-1m0s,{sets_body}"));
    }

    #[test]
    fn week_four_adds_a_twelve_second_hold() {
        let program = max_hang_workout(4, Force::NEWTON * 400).expect("program");
        let s = program.to_string();
        assert_eq!(s.matches("static-12s-400.0N").count(), 3);
        assert_eq!(s.matches("rest-1m30s").count(), 2);
    }

    #[test]
    fn max_test_is_setup_then_the_test() {
        let program = max_test_program(Duration::from_secs(12), IntervalTiming::default());
        assert_eq!(program.to_string(), "setup-1m0s,max-test-12s");
    }

    #[rstest]
    #[case(0)]
    #[case(5)]
    fn weeks_outside_the_cycle_are_rejected(#[case] week: u8) {
        assert!(matches!(
            max_hang_workout(week, Force::NEWTON),
            Err(ProtocolError::WeekOutOfRange(w)) if w == week
        ));
    }
}
