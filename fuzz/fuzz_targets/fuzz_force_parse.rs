#![no_main]
use hang_traits::Force;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(f) = data.parse::<Force>() {
        // Display output must parse back to the same tenth of a newton.
        let shown = f.to_string();
        let back: Force = shown.parse().expect("displayed force parses");
        assert!((back - f).abs() <= Force::NEWTON / 10, "{data:?} -> {shown}");
    }
});
