use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

// Fast timings so a simulated workout finishes in a couple of seconds
fn write_valid_config(dir: &Path) -> PathBuf {
    let toml = format!(
        r#"
[hardware]
sensor_read_timeout_ms = 100
sample_rate_hz = 80

[display]
# no terminal view: stderr stays readable in tests
terminal = false

[recording]
dir = '{}'
summary = "text"

[timing]
setup_tare_window_ms = 100
setup_tare_settle_ms = 0
setup_tare_samples = 4
tare_window_ms = 50
tare_settle_ms = 0
tare_samples = 4
"#,
        dir.join("workouts").display()
    );
    let path = dir.join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn hang(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("hang").unwrap();
    cmd.arg("--config").arg(cfg).arg("--log-level").arg("warn");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["max-hang", "--help"], 0, "four-week", "stdout")]
#[case(&["max-hang", "--week", "1"], 2, "required", "stderr")]
#[case(&["max-hang", "--week", "1", "--threshold", "lots"], 2, "invalid value", "stderr")]
#[case(&["--simulate", "400N", "max-hang", "--week", "7", "--threshold", "400N"], 3, "Week 7 out of range", "stderr")]
#[case(&["--simulate", "400N", "max-test", "--hold", "0"], 1, "hold must be a positive", "stderr")]
#[case(&["--simulate", "400N", "self-check", "--samples", "5"], 0, "self-check ok: backend=simulated samples=5", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());

    let assert = hang(&cfg).args(args).assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn simulated_max_test_records_and_summarises() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());

    hang(&cfg)
        .args(["--simulate", "400N", "max-test", "--hold", "0.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max-test-500ms (success)"))
        .stdout(predicate::str::contains(
            "workout complete: setup-1m0s,max-test-500ms",
        ));

    let csvs: Vec<_> = fs::read_dir(dir.path().join("workouts"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(csvs.len(), 1, "setup records nothing: {csvs:?}");
    let name = csvs[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.ends_with("-max-test-500ms.csv"), "{name}");
    let body = fs::read_to_string(&csvs[0]).unwrap();
    assert!(body.starts_with("time,force\n"), "{body}");
}

#[rstest]
fn invalid_config_is_reported_with_its_path() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[hardware]\nsample_rate_hz = 0\n").unwrap();

    hang(&cfg)
        .args(["--simulate", "400N", "self-check"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid config file"))
        .stderr(predicate::str::contains("sample_rate_hz"));
}

#[rstest]
fn unwritable_recording_dir_exits_with_recorder_code() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        format!(
            "[recording]\ndir = '{}'\n",
            blocker.join("workouts").display()
        ),
    )
    .unwrap();

    hang(&cfg)
        .args(["--simulate", "400N", "max-test"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("recording"));
}
