use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

#[rstest]
fn load_cell_timeout_bubbles_to_cli() {
    let dir = tempdir().unwrap();
    // One conversion a second against a 10ms read timeout: every read after
    // the first times out, retries included.
    let toml = format!(
        r#"
[hardware]
sensor_read_timeout_ms = 10
sample_rate_hz = 1

[recording]
dir = '{}'

[timing]
tare_samples = 4
"#,
        dir.path().join("workouts").display()
    );
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, toml).unwrap();

    let mut cmd = Command::cargo_bin("hang").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .args(["--simulate", "400N", "self-check"]);
    cmd.assert()
        .code(4)
        .stderr(predicate::str::contains(
            "What happened: The load cell did not produce data",
        ));
}
