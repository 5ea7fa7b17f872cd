//! Pure functions over time-ordered force samples.
//!
//! All functions assume `samples` is sorted by time; recorders sort before
//! calling them. Windows are measured between sample timestamps, so gaps in
//! the data stretch a window rather than shrinking it.
use hang_traits::{Force, ForceSample};
use std::collections::VecDeque;
use std::time::Duration;

/// Microseconds between sample `i` and its predecessor; sample 0 weighs nothing.
#[inline]
fn weight(samples: &[ForceSample], i: usize) -> i128 {
    if i == 0 {
        return 0;
    }
    samples[i]
        .time
        .saturating_duration_since(samples[i - 1].time)
        .as_micros() as i128
}

/// Highest time-weighted average force held over any trailing `window`.
///
/// Returns zero when the samples never span a full window.
pub fn peak_force_over_interval(window: Duration, samples: &[ForceSample]) -> Force {
    let mut sum: i128 = 0;
    let mut total: i128 = 0;
    let mut left = 0usize;
    let mut peak = Force::ZERO;

    for (i, s) in samples.iter().enumerate() {
        let w = weight(samples, i);
        sum += w * i128::from(s.force.nanonewtons());
        total += w;

        while left <= i && s.time.saturating_duration_since(samples[left].time) >= window {
            let wl = weight(samples, left);
            sum -= wl * i128::from(samples[left].force.nanonewtons());
            total -= wl;
            left += 1;
        }

        if left > 0 && total > 0 {
            let avg = (sum / total).clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64;
            peak = peak.max(Force::from_nanonewtons(avg));
        }
    }
    peak
}

/// Highest force that was never dropped below for a whole trailing `window`.
///
/// For every sample with a full window behind it, take the window minimum;
/// the result is the largest of those minima (never below zero).
pub fn max_threshold_force_over_interval(window: Duration, samples: &[ForceSample]) -> Force {
    let mut left = 0usize;
    let mut best = Force::ZERO;

    for (i, s) in samples.iter().enumerate() {
        while left <= i && s.time.saturating_duration_since(samples[left].time) >= window {
            left += 1;
        }
        if left == 0 {
            continue;
        }
        let floor = samples[left.min(i)..=i]
            .iter()
            .map(|x| x.force)
            .min()
            .unwrap_or(s.force);
        best = best.max(floor);
    }
    best
}

/// Time from the start of the longest sustained rise until `target` is reached.
///
/// The rise is the longest run of strictly positive central-difference
/// derivative. If `target` is never reached, the time to the largest force
/// after the rise started is returned instead.
pub fn rate_of_force_development(target: Force, samples: &[ForceSample]) -> Duration {
    let n = samples.len();
    if n == 0 {
        return Duration::ZERO;
    }

    let mut rising_run = 0usize;
    let mut best_run = 0usize;
    let mut best_start = 0usize;
    for i in 0..n {
        if derivative(samples, i) > 0.0 {
            rising_run += 1;
            continue;
        }
        if rising_run > best_run {
            best_run = rising_run;
            best_start = i - rising_run;
        }
        rising_run = 0;
    }

    let start = samples[best_start].time;
    let mut max = Force::ZERO;
    let mut time_to_max = Duration::ZERO;
    for s in &samples[best_start..] {
        let since = s.time.saturating_duration_since(start);
        if s.force >= target {
            return since;
        }
        if s.force > max {
            max = s.force;
            time_to_max = since;
        }
    }
    time_to_max
}

/// Central difference in nN per ns; zero at both ends and across zero-length gaps.
fn derivative(samples: &[ForceSample], i: usize) -> f64 {
    if i == 0 || i + 1 >= samples.len() {
        return 0.0;
    }
    let dt = samples[i + 1]
        .time
        .saturating_duration_since(samples[i - 1].time)
        .as_nanos();
    if dt == 0 {
        return 0.0;
    }
    let df = (samples[i + 1].force - samples[i - 1].force).nanonewtons();
    df as f64 / dt as f64
}

/// Sliding window over the most recent `span` of samples.
///
/// Samples older than `span` relative to the newest push are evicted; the
/// window is [`ready`](Self::ready) once anything has been evicted, i.e. it
/// has seen at least one full span of data.
#[derive(Debug, Clone)]
pub struct TrailingWindow {
    span: Duration,
    samples: VecDeque<ForceSample>,
    filled: bool,
}

impl TrailingWindow {
    pub fn new(span: Duration) -> Self {
        Self {
            span,
            samples: VecDeque::new(),
            filled: false,
        }
    }

    pub fn push(&mut self, sample: ForceSample) {
        self.samples.push_back(sample);
        while let Some(front) = self.samples.front() {
            if sample.time.saturating_duration_since(front.time) < self.span {
                break;
            }
            self.samples.pop_front();
            self.filled = true;
        }
    }

    #[inline]
    pub fn ready(&self) -> bool {
        self.filled
    }

    /// Largest force currently in the window, floored at zero.
    pub fn max(&self) -> Force {
        self.samples
            .iter()
            .map(|s| s.force)
            .fold(Force::ZERO, Force::max)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Instant;

    fn series(step_ms: u64, newtons: &[f64]) -> Vec<ForceSample> {
        let t0 = Instant::now();
        newtons
            .iter()
            .enumerate()
            .map(|(i, n)| {
                ForceSample::new(
                    Force::from_newtons(*n),
                    t0 + Duration::from_millis(step_ms * i as u64),
                )
            })
            .collect()
    }

    #[test]
    fn rfd_measures_from_start_of_rise() {
        let s = series(
            100,
            &[0.0, 200.0, 400.0, 600.0, 800.0, 1000.0, 1000.0, 1000.0, 1000.0, 1000.0],
        );
        let rfd = rate_of_force_development(Force::from_newtons(900.0), &s);
        assert_eq!(rfd, Duration::from_millis(400));
    }

    #[test]
    fn rfd_falls_back_to_time_of_max() {
        let s = series(100, &[0.0, 100.0, 300.0, 250.0, 250.0]);
        let rfd = rate_of_force_development(Force::from_newtons(1000.0), &s);
        // rise starts at index 1 (derivative > 0 at 1 and 2), max 300N at index 2
        assert_eq!(rfd, Duration::from_millis(100));
    }

    /// 0N to 1000N in nine equal steps, then `hold` more samples at 1000N.
    fn linear_rise(hold: usize) -> Vec<f64> {
        (0..10u32)
            .map(|i| f64::from(i) * 1000.0 / 9.0)
            .chain(std::iter::repeat_n(1000.0, hold))
            .collect()
    }

    // The rise starts at the first sample with a positive slope (index 1,
    // t=100ms). 888.9N at index 8 is short of 900N, so 90% of peak lands on
    // index 9 at t=900ms.
    #[rstest]
    #[case::rise_then_hold(linear_rise(5), 900.0, 800)]
    #[case::rise_only(linear_rise(0), 900.0, 800)]
    #[case::half_of_peak(linear_rise(5), 500.0, 400)]
    #[case::never_reached_uses_time_of_max(linear_rise(5), 1100.0, 800)]
    #[case::single_sample_at_target(vec![500.0], 450.0, 0)]
    #[case::single_sample_short(vec![300.0], 450.0, 0)]
    #[case::two_samples_reaching(vec![0.0, 500.0], 450.0, 100)]
    #[case::two_samples_short(vec![0.0, 300.0], 450.0, 100)]
    #[case::two_samples_falling(vec![500.0, 0.0], 1000.0, 0)]
    fn rfd_on_hand_computed_series(
        #[case] newtons: Vec<f64>,
        #[case] target: f64,
        #[case] expected_ms: u64,
    ) {
        let s = series(100, &newtons);
        assert_eq!(
            rate_of_force_development(Force::from_newtons(target), &s),
            Duration::from_millis(expected_ms)
        );
    }

    #[test]
    fn rfd_of_empty_is_zero() {
        assert_eq!(rate_of_force_development(Force::NEWTON, &[]), Duration::ZERO);
    }

    #[test]
    fn peak_is_zero_until_window_fills() {
        let s = series(100, &[500.0, 500.0, 500.0]);
        assert_eq!(peak_force_over_interval(Duration::from_secs(1), &s), Force::ZERO);
    }

    #[test]
    fn peak_averages_over_window() {
        let s = series(100, &[0.0, 100.0, 100.0, 300.0, 300.0, 0.0]);
        // 200ms window: best pair is (300, 300) at indices 3..=4
        let peak = peak_force_over_interval(Duration::from_millis(200), &s);
        assert_eq!(peak, Force::from_newtons(300.0));
    }

    #[test]
    fn threshold_takes_best_window_floor() {
        let s = series(100, &[100.0, 400.0, 380.0, 420.0, 50.0, 500.0]);
        // 300ms window; floors: idx3 -> min(400,380,420)=380 is the best
        let floor = max_threshold_force_over_interval(Duration::from_millis(300), &s);
        assert_eq!(floor, Force::from_newtons(380.0));
    }

    #[test]
    fn trailing_window_evicts_and_becomes_ready() {
        let s = series(500, &[10.0, 30.0, 20.0, 5.0]);
        let mut w = TrailingWindow::new(Duration::from_secs(1));
        w.push(s[0]);
        w.push(s[1]);
        assert!(!w.ready());
        assert_eq!(w.max(), Force::from_newtons(30.0));
        w.push(s[2]);
        assert!(w.ready());
        assert_eq!(w.len(), 2);
        w.push(s[3]);
        assert_eq!(w.max(), Force::from_newtons(20.0));
    }
}
