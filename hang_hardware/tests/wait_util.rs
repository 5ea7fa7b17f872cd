use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};

use hang_hardware::error::HwError;
use hang_hardware::util::wait_until_low_with_timeout;
use hang_traits::{Context, ContextError};

#[test]
fn wait_until_low_success_path() {
    let high = Arc::new(AtomicBool::new(true));
    let high_bg = high.clone();
    // Flip low after a short delay
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        high_bg.store(false, Ordering::Relaxed);
    });

    let res = wait_until_low_with_timeout(
        &Context::background(),
        || high.load(Ordering::Relaxed),
        Duration::from_millis(50),
        Duration::from_micros(200),
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
}

#[test]
fn wait_until_low_timeout_path() {
    let high = Arc::new(AtomicBool::new(true));

    let err = wait_until_low_with_timeout(
        &Context::background(),
        || high.load(Ordering::Relaxed),
        Duration::from_millis(5),
        Duration::from_micros(200),
    )
    .expect_err("expected timeout error");

    match err {
        HwError::DataReadyTimeout => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn wait_until_low_stops_on_cancel() {
    let ctx = Context::background().with_cancel();
    let remote = ctx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(5));
        remote.cancel();
    });

    let started = Instant::now();
    let err = wait_until_low_with_timeout(
        &ctx,
        || true,
        Duration::from_secs(10),
        Duration::from_micros(200),
    )
    .expect_err("cancelled");
    assert!(matches!(err, HwError::Context(ContextError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(1));
}
