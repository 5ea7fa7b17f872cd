use std::time::{Duration, Instant};

use hang_traits::Context;

use crate::error::{HwError, Result};

/// Wait until the provided `is_high` predicate becomes false (i.e., line goes low),
/// the timeout expires, or `ctx` is done. Sleeps in small intervals to avoid CPU spinning.
pub fn wait_until_low_with_timeout(
    ctx: &Context,
    mut is_high: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while is_high() {
        ctx.check()?;
        if Instant::now() >= deadline {
            return Err(HwError::DataReadyTimeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}

/// Sign-extend a 24-bit two's complement value.
#[inline]
pub fn sign_extend_24(raw: u32) -> i32 {
    ((raw << 8) as i32) >> 8
}

#[cfg(test)]
mod tests {
    use super::sign_extend_24;
    use rstest::rstest;

    #[rstest]
    #[case(0x000000, 0)]
    #[case(0x000001, 1)]
    #[case(0x7FFFFF, 8_388_607)]
    #[case(0x800000, -8_388_608)]
    #[case(0xFFFFFF, -1)]
    fn extends_the_sign_bit(#[case] raw: u32, #[case] expected: i32) {
        assert_eq!(sign_extend_24(raw), expected);
    }
}
