#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `hang`: max hangs, max tests and a hardware self-check.

mod cli;
mod error_fmt;
mod session;

use clap::Parser;
use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use error_fmt::{exit_code_for_error, format_error_json, humanize};
use eyre::WrapErr;
use hang_config::Config;
use hang_core::RunReport;
use hang_traits::Context;
use session::{Backend, CheckReport};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    let cli = Cli::parse();
    if let Err(e) = color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .install()
    {
        eprintln!("warning: could not install error report hooks: {e}");
    }
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = try_main(cli) {
        let code = exit_code_for_error(&err);
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("error: {err:#}\n\n{}", humanize(&err));
        }
        std::process::exit(code);
    }
}

fn try_main(cli: Cli) -> eyre::Result<()> {
    let cfg = hang_config::load_or_default(&cli.config)?;
    init_tracing(&cfg, cli.json, cli.log_level.as_deref())?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    let root = Context::background().with_cancel();
    let on_signal = root.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::warn!("interrupt received; stopping");
        on_signal.cancel();
    }) {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }

    let backend = Backend::select(cli.simulate);
    tracing::info!(backend = backend.name(), "sensor backend");

    match cli.cmd {
        Commands::MaxHang { week, threshold } => {
            let report = session::run_max_hang(&root, &cfg, backend, cli.json, week, threshold)?;
            print_report(&report, cli.json);
        }
        Commands::MaxTest { hold } => {
            let report = session::run_max_test(&root, &cfg, backend, cli.json, hold)?;
            print_report(&report, cli.json);
        }
        Commands::SelfCheck { samples } => {
            let report = session::self_check(&root, &cfg, backend, samples)?;
            print_check(&report, cli.json);
        }
    }
    Ok(())
}

fn print_report(report: &RunReport, json: bool) {
    let elapsed_ms = report.elapsed.as_millis() as u64;
    if json {
        println!(
            "{}",
            serde_json::json!({
                "status": "complete",
                "workout": report.descriptor,
                "elapsed_ms": elapsed_ms,
            })
        );
    } else {
        println!(
            "workout complete: {} in {:.1}s",
            report.descriptor,
            report.elapsed.as_secs_f64()
        );
    }
}

fn print_check(report: &CheckReport, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "backend": report.backend,
                "samples": report.samples,
                "mean_newtons": report.mean.newtons(),
                "min_newtons": report.min.newtons(),
                "max_newtons": report.max.newtons(),
                "lights": report.lights,
            })
        );
    } else {
        println!(
            "self-check ok: backend={} samples={} mean={} min={} max={} lights={}",
            report.backend,
            report.samples,
            report.mean,
            report.min,
            report.max,
            if report.lights { "ok" } else { "off" },
        );
    }
}

/// Console logs on stderr (pretty or JSON lines), plus an optional JSON
/// file appender from `[logging]`.
fn init_tracing(cfg: &Config, json: bool, cli_level: Option<&str>) -> eyre::Result<()> {
    let level = cli_level
        .or(cfg.logging.level.as_deref())
        .unwrap_or("info");
    let filter = match std::env::var("RUST_LOG") {
        Ok(directive) => EnvFilter::try_new(directive),
        Err(_) => EnvFilter::try_new(level),
    }
    .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let file = match &cfg.logging.file {
        Some(path) => {
            let path = std::path::Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
            let appender = match cfg.logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_writer(writer).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
