//! Common time/period helpers for hang_core.
use std::time::Duration;

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;
/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Compute the period in microseconds for a given sampling rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Compute the period in milliseconds for a given sampling rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 millisecond.
#[inline]
pub fn period_ms(hz: u32) -> u64 {
    (MILLIS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Compact duration for descriptors and file names: `500ms`, `3s`, `1.5s`,
/// `1m0s`, `1h2m3s`.
pub fn fmt_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        return format!("{}ms", d.as_millis());
    }
    let total = d.as_secs();
    let (h, m, s) = (total / 3600, total / 60 % 60, total % 60);
    let frac = d.subsec_millis();
    let secs = if frac == 0 {
        format!("{s}s")
    } else {
        format!("{}s", format!("{s}.{frac:03}").trim_end_matches('0'))
    };
    match (h, m) {
        (0, 0) => secs,
        (0, m) => format!("{m}m{secs}"),
        (h, m) => format!("{h}h{m}m{secs}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Duration::from_millis(250), "250ms")]
    #[case(Duration::from_secs(3), "3s")]
    #[case(Duration::from_millis(1500), "1.5s")]
    #[case(Duration::from_secs(60), "1m0s")]
    #[case(Duration::from_secs(90), "1m30s")]
    #[case(Duration::from_secs(3723), "1h2m3s")]
    fn formats_like_a_stopwatch(#[case] d: Duration, #[case] want: &str) {
        assert_eq!(fmt_duration(d), want);
    }

    #[test]
    fn periods_clamp_zero_hz() {
        assert_eq!(period_ms(0), 1000);
        assert_eq!(period_us(10), 100_000);
        assert_eq!(period_ms(10_000), 1);
    }
}
