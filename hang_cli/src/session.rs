//! Assembly of sensor, displays and recorders from the config, and the
//! commands that run on top of them.

use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::Duration;

use eyre::{WrapErr, bail};
use hang_config::Config;
use hang_core::sampler::stall_window;
use hang_core::{
    AutoRefresh, Calibration, Composite, CsvRecorder, DisplayMux, IntervalTiming, MultiRecorder,
    RefreshingDisplay, Render, RunReport, Sampler, SummaryFormat, SummaryRecorder, Week,
    max_hang_program, max_test_program, run_workout,
};
use hang_hardware::{LoadCellSensor, SimulatedCell, SimulatedProfile};
use hang_traits::clock::{Clock, MonotonicClock};
use hang_traits::{Context, Force, Sensor};
use hang_ui::TerminalRenderer;

type BoxedSensor = Box<dyn Sensor + Send>;

/// Simulated athlete used when `--simulate` is not given and there is no hardware.
const DEFAULT_SIM_PEAK: Force = Force::NEWTON.saturating_mul(450);
/// Longest hold of any week, plus a margin.
const SIM_HOLD: Duration = Duration::from_secs(13);
const SIM_FADE: Duration = Duration::from_secs(20);
const SAMPLER_CAPACITY: usize = 64;

/// Where force readings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Simulated(Force),
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    Hx711,
}

impl Backend {
    pub fn select(simulate: Option<Force>) -> Self {
        #[cfg(all(feature = "hardware", target_os = "linux"))]
        {
            simulate.map_or(Backend::Hx711, Backend::Simulated)
        }
        #[cfg(not(all(feature = "hardware", target_os = "linux")))]
        {
            Backend::Simulated(simulate.unwrap_or(DEFAULT_SIM_PEAK))
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Backend::Simulated(_) => "simulated",
            #[cfg(all(feature = "hardware", target_os = "linux"))]
            Backend::Hx711 => "hx711",
        }
    }
}

/// What the simulated athlete does for each kind of run. The first rest
/// covers the setup tare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drill {
    Holds,
    MaxEffort,
}

fn sim_profile(peak: Force, drill: Drill, timing: &IntervalTiming) -> SimulatedProfile {
    let rest = timing.setup_tare_window + Duration::from_secs(1);
    match drill {
        Drill::Holds => SimulatedProfile::Pulls {
            peak,
            hold: SIM_HOLD,
            rest,
        },
        Drill::MaxEffort => SimulatedProfile::Fatigue {
            peak,
            rest,
            fade: SIM_FADE,
        },
    }
}

fn open_sensor(cfg: &Config, backend: Backend, drill: Drill) -> eyre::Result<BoxedSensor> {
    let calibration = Calibration::try_from(&cfg.calibration)?;
    let timeout = Duration::from_millis(cfg.hardware.sensor_read_timeout_ms);
    match backend {
        Backend::Simulated(peak) => {
            let timing = IntervalTiming::from(&cfg.timing);
            let cell = SimulatedCell::new(
                MonotonicClock::new(),
                sim_profile(peak, drill, &timing),
                cfg.hardware.sample_rate_hz,
            )
            .with_counts_per_newton(
                cfg.calibration.reference_raw as f64 / cfg.calibration.reference_newtons,
            );
            tracing::info!(%peak, hz = cfg.hardware.sample_rate_hz, "using simulated load cell");
            Ok(Box::new(LoadCellSensor::new(cell, calibration, timeout)))
        }
        #[cfg(all(feature = "hardware", target_os = "linux"))]
        Backend::Hx711 => {
            let hx = hang_hardware::hx711::Hx711::new(
                cfg.pins.hx711_dt,
                cfg.pins.hx711_sck,
                hang_hardware::Gain::default(),
            )
            .wrap_err("open hx711")?;
            Ok(Box::new(LoadCellSensor::new(hx, calibration, timeout)))
        }
    }
}

/// The sensor behind a sampling thread.
pub fn open_sampler(
    cfg: &Config,
    backend: Backend,
    drill: Drill,
) -> eyre::Result<Sampler<BoxedSensor>> {
    let sensor = open_sensor(cfg, backend, drill)?;
    let stall = stall_window(
        Duration::from_millis(cfg.hardware.sensor_read_timeout_ms),
        Duration::from_millis(hang_core::util::period_ms(cfg.hardware.sample_rate_hz)),
    );
    tracing::debug!(stall_ms = stall.as_millis() as u64, "sampler started");
    Ok(Sampler::spawn_event(sensor, SAMPLER_CAPACITY, stall))
}

/// Every configured display behind one sink. Refreshing stops on drop.
pub struct Displays {
    mux: DisplayMux,
    refreshers: Vec<Arc<dyn AutoRefresh>>,
    ctx: Context,
    period: Duration,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl Displays {
    pub fn open(cfg: &Config, json: bool, parent: &Context) -> eyre::Result<Self> {
        let mut displays = Self {
            mux: DisplayMux::default(),
            refreshers: Vec::new(),
            ctx: parent.with_cancel(),
            period: Duration::from_millis(cfg.display.refresh_ms),
            clock: Arc::new(MonotonicClock::new()),
        };
        if cfg.display.terminal && !json {
            let color = io::stderr().is_terminal();
            displays.attach(TerminalRenderer::new(io::stderr()).with_color(color));
        }
        if cfg.display.leds {
            displays.attach_lights(cfg)?;
        }
        if displays.mux.is_empty() {
            tracing::info!("no displays configured");
        }
        Ok(displays)
    }

    #[cfg(all(feature = "hardware", target_os = "linux"))]
    fn attach_lights(&mut self, cfg: &Config) -> eyre::Result<()> {
        let (Some(green), Some(yellow), Some(red)) =
            (cfg.pins.led_green, cfg.pins.led_yellow, cfg.pins.led_red)
        else {
            bail!("display.leds needs pins.led_green, pins.led_yellow and pins.led_red");
        };
        let lamp = hang_hardware::traffic_light::GpioTrafficLight::new(green, yellow, red)
            .wrap_err("open traffic light pins")?;
        self.attach(hang_ui::TrafficLightRenderer::new(lamp));
        Ok(())
    }

    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    fn attach_lights(&mut self, _cfg: &Config) -> eyre::Result<()> {
        tracing::warn!("display.leds needs the `hardware` feature; lights disabled");
        Ok(())
    }

    fn attach<R: Render + 'static>(&mut self, renderer: R) {
        let display = Arc::new(RefreshingDisplay::new(
            renderer,
            self.period,
            Arc::clone(&self.clock),
        ));
        self.mux.push(display.clone());
        self.refreshers.push(display);
    }

    pub fn start(&self) {
        for r in &self.refreshers {
            r.start(&self.ctx);
        }
    }

    pub fn sink(&self) -> &DisplayMux {
        &self.mux
    }
}

impl Drop for Displays {
    fn drop(&mut self) {
        self.ctx.cancel();
    }
}

/// CSV recordings plus, unless switched off, per-interval summaries on stdout.
pub fn open_recorder(cfg: &Config) -> eyre::Result<MultiRecorder> {
    let dir = cfg.recording.resolved_dir(dirs::home_dir().as_deref());
    let csv = CsvRecorder::new(dir.clone())
        .wrap_err_with(|| format!("open recording dir {}", dir.display()))?;
    tracing::info!(dir = %dir.display(), "recording workouts");
    let mut recorder = MultiRecorder::new(vec![Arc::new(csv)]);
    if let Some(format) = SummaryFormat::from_mode(cfg.recording.summary) {
        recorder.push(Arc::new(SummaryRecorder::new(io::stdout(), format)));
    }
    Ok(recorder)
}

fn run(
    ctx: &Context,
    cfg: &Config,
    backend: Backend,
    drill: Drill,
    json: bool,
    workout: &Composite,
) -> eyre::Result<RunReport> {
    let recorder = open_recorder(cfg)?;
    let mut sampler = open_sampler(cfg, backend, drill)?;
    let displays = Displays::open(cfg, json, ctx)?;
    displays.start();
    let report = run_workout(ctx, workout, displays.sink(), &mut sampler, &recorder);
    drop(displays);
    if let Err(e) = sampler.halt() {
        tracing::warn!(error = %e, "sensor halt failed");
    }
    report
}

pub fn run_max_hang(
    ctx: &Context,
    cfg: &Config,
    backend: Backend,
    json: bool,
    week: u8,
    threshold: Force,
) -> eyre::Result<RunReport> {
    let week = Week::try_from(week)?;
    if threshold <= Force::ZERO {
        bail!("threshold must be positive, got {threshold}");
    }
    let program = max_hang_program(week, threshold, IntervalTiming::from(&cfg.timing));
    tracing::info!(?week, %threshold, "max hang");
    run(ctx, cfg, backend, Drill::Holds, json, &program)
}

pub fn run_max_test(
    ctx: &Context,
    cfg: &Config,
    backend: Backend,
    json: bool,
    hold_secs: f64,
) -> eyre::Result<RunReport> {
    let hold = match Duration::try_from_secs_f64(hold_secs) {
        Ok(d) if !d.is_zero() => d,
        _ => bail!("hold must be a positive number of seconds, got {hold_secs}"),
    };
    let program = max_test_program(hold, IntervalTiming::from(&cfg.timing));
    run(ctx, cfg, backend, Drill::MaxEffort, json, &program)
}

/// Result of a self-check.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub backend: &'static str,
    pub samples: usize,
    pub mean: Force,
    pub min: Force,
    pub max: Force,
    pub lights: bool,
}

/// Cycle the lights, tare, then read `samples` readings.
pub fn self_check(
    ctx: &Context,
    cfg: &Config,
    backend: Backend,
    samples: usize,
) -> eyre::Result<CheckReport> {
    if samples == 0 {
        bail!("self-check needs at least one sample");
    }
    let lights = lamp_test(ctx, cfg)?;
    let timing = IntervalTiming::from(&cfg.timing);
    let mut sampler = open_sampler(cfg, backend, Drill::Holds)?;
    sampler.tare(ctx, timing.tare_samples)?;

    let mut forces = Vec::with_capacity(samples);
    for _ in 0..samples {
        forces.push(sampler.read(ctx)?.force);
    }
    if let Err(e) = sampler.halt() {
        tracing::warn!(error = %e, "sensor halt failed");
    }

    let total: i128 = forces.iter().map(|f| i128::from(f.nanonewtons())).sum();
    let mean = Force::from_nanonewtons((total / forces.len() as i128) as i64);
    let min = forces.iter().copied().min().unwrap_or_default();
    let max = forces.iter().copied().max().unwrap_or_default();
    tracing::info!(%mean, %min, %max, samples, "self-check readings");
    Ok(CheckReport {
        backend: backend.name(),
        samples,
        mean,
        min,
        max,
        lights,
    })
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn lamp_test(ctx: &Context, cfg: &Config) -> eyre::Result<bool> {
    use hang_traits::{Lamp, Lights};
    const LAMP_STEP: Duration = Duration::from_millis(250);
    if !cfg.display.leds {
        return Ok(false);
    }
    let (Some(green), Some(yellow), Some(red)) =
        (cfg.pins.led_green, cfg.pins.led_yellow, cfg.pins.led_red)
    else {
        bail!("display.leds needs pins.led_green, pins.led_yellow and pins.led_red");
    };
    let mut lamp = hang_hardware::traffic_light::GpioTrafficLight::new(green, yellow, red)
        .wrap_err("open traffic light pins")?;
    let steps = [
        Lights { red: true, ..Lights::OFF },
        Lights { yellow: true, ..Lights::OFF },
        Lights { green: true, ..Lights::OFF },
    ];
    for lights in steps {
        lamp.set(lights)
            .map_err(|e| eyre::eyre!("traffic light: {e}"))?;
        ctx.sleep(LAMP_STEP)?;
        lamp.set(Lights::OFF)
            .map_err(|e| eyre::eyre!("traffic light: {e}"))?;
        ctx.sleep(LAMP_STEP)?;
    }
    Ok(true)
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn lamp_test(_ctx: &Context, cfg: &Config) -> eyre::Result<bool> {
    if cfg.display.leds {
        tracing::warn!("display.leds needs the `hardware` feature; skipping lamp test");
    }
    Ok(false)
}
