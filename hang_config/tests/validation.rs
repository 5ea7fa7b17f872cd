use hang_config::{SummaryMode, load_file, load_or_default, load_toml};
use rstest::rstest;
use std::io::Write;

fn rejects(toml: &str, needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    let msg = format!("{err}").to_lowercase();
    assert!(msg.contains(needle), "{msg:?} does not mention {needle:?}");
}

#[test]
fn full_file_round_trips_into_config() {
    let toml = r#"
[pins]
hx711_dt = 17
hx711_sck = 27
led_green = 22
led_yellow = 23
led_red = 24

[calibration]
reference_raw = -21500
reference_newtons = 196.133

[hardware]
sensor_read_timeout_ms = 400
sample_rate_hz = 80

[display]
refresh_ms = 50
terminal = false
leds = true

[recording]
dir = "/tmp/hangs"
summary = "json"

[logging]
level = "debug"
rotation = "daily"

[timing]
tare_samples = 10
engagement_floor_newtons = 50.0
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid");
    assert_eq!(cfg.pins.hx711_dt, 17);
    assert_eq!(cfg.pins.led_red, Some(24));
    assert_eq!(cfg.calibration.reference_raw, -21500);
    assert_eq!(cfg.hardware.sample_rate_hz, 80);
    assert!(cfg.display.leds);
    assert_eq!(cfg.recording.summary, SummaryMode::Json);
    assert_eq!(cfg.timing.tare_samples, Some(10));
    assert_eq!(cfg.timing.tare_window_ms, None);
}

#[test]
fn unknown_sections_are_a_parse_error() {
    assert!(load_toml("[motor]\nspeed = 3\n").is_err());
}

#[rstest]
#[case("[hardware]\nsample_rate_hz = 0\n", "sample_rate_hz must be > 0")]
#[case("[hardware]\nsensor_read_timeout_ms = 0\n", "sensor_read_timeout_ms must be >= 1")]
#[case("[calibration]\nreference_raw = 0\n", "calibration.reference_raw must be non-zero")]
#[case("[calibration]\nreference_newtons = 0.0\n", "reference_newtons must be finite")]
#[case("[calibration]\nreference_newtons = nan\n", "reference_newtons must be finite")]
#[case("[pins]\nhx711_dt = 40\n", "pins.hx711_dt must be a bcm pin")]
#[case("[pins]\nhx711_sck = 5\n", "pins.hx711_sck must differ from pins.hx711_dt")]
#[case("[pins]\nled_red = 11\n", "pins.led_red must differ from pins.led_green")]
#[case("[display]\nrefresh_ms = 0\n", "display.refresh_ms must be in 1..=1000")]
#[case("[logging]\nlevel = \"loud\"\n", "logging.level must be one of")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation must be one of")]
#[case("[timing]\ntare_samples = 0\n", "timing.tare_samples must be >= 1")]
#[case("[timing]\nsetup_tare_samples = 0\n", "timing.setup_tare_samples must be >= 1")]
#[case(
    "[timing]\nengagement_floor_newtons = -3.0\n",
    "timing.engagement_floor_newtons must be > 0"
)]
#[case("[timing]\nedge_min_delta_newtons = 0.0\n", "edge_min_delta_newtons must be > 0")]
fn invalid_values_name_the_field(#[case] toml: &str, #[case] needle: &str) {
    rejects(toml, needle);
}

#[test]
fn leds_need_all_three_pins() {
    let toml = r#"
[pins]
led_yellow = 10
led_red = 9

[display]
leds = true
"#;
    // fields left out of a table keep their defaults
    let cfg = load_toml(toml).expect("parse");
    assert_eq!(cfg.pins.led_green, Some(11));
    cfg.validate().expect("defaults fill the missing pin");

    let mut cfg = cfg;
    cfg.pins.led_green = None;
    let err = cfg.validate().expect_err("missing green pin");
    assert!(format!("{err}").contains("display.leds requires"));
}

#[test]
fn load_file_reports_the_path() {
    let mut f = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(f, "[hardware]\nsample_rate_hz = 0").expect("write");
    let err = load_file(f.path()).expect_err("invalid file");
    let chain = format!("{err:#}");
    assert!(chain.contains("invalid config file"));
    assert!(chain.contains("sample_rate_hz must be > 0"));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = load_or_default(&dir.path().join("absent.toml")).expect("defaults");
    assert_eq!(cfg.hardware.sample_rate_hz, 10);
    assert!(cfg.display.terminal);
}
