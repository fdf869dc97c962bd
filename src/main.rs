//! # Station Monitor Application Entry Point
//!
//! This binary wires the library together: configuration, logging, the glyph
//! table, the HTTP transport and the display, then hands control to the
//! station monitor loop. It supports both production mode (e-ink display) and
//! development mode (ASCII output).
//!
//! ```text
//! station-monitor [--stdout] [--once] [--config <path>]
//! ```


#[cfg(all(target_os = "linux", feature = "hardware"))]
mod hardware;

use anyhow::Context;
use env_logger::Env;
use log::{error, info};
use std::env;
use std::path::PathBuf;
use station_monitor_lib::active_hours::SystemClock;
use station_monitor_lib::arrival_data::{ArrivalFetcher, HttpTransport};
use station_monitor_lib::config::Config;
use station_monitor_lib::glyphs::GlyphTable;
use station_monitor_lib::monitor::StationMonitor;
use station_monitor_lib::panel::{HeadlessPanel, Panel};
use station_monitor_lib::renderer::draw_ascii;
use tokio::runtime::Runtime;

/// Command line options.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Args {
    /// Development mode: in-memory panel, board printed to stdout
    pub development_mode: bool,
    /// Run one cycle and exit
    pub once: bool,
    /// Alternative to station-config.toml
    pub config_path: Option<PathBuf>,
}

impl Args {
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Self> {
        let mut parsed = Args::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--stdout" => parsed.development_mode = true,
                "--once" => parsed.once = true,
                "--config" => {
                    let path = args.next().context("--config needs a path")?;
                    parsed.config_path = Some(PathBuf::from(path));
                }
                other => anyhow::bail!("unknown argument: {other}"),
            }
        }
        Ok(parsed)
    }

    pub fn max_cycles(&self) -> Option<u64> {
        self.once.then_some(1)
    }
}

type Monitor<'g, P> = StationMonitor<'g, HttpTransport, SystemClock, P>;

fn build_monitor<'g, P: Panel>(
    config: &Config,
    glyphs: &'g GlyphTable,
    panel: P,
) -> anyhow::Result<Monitor<'g, P>> {
    let transport = HttpTransport::new().context("build HTTP client")?;
    let clock = SystemClock::with_utc_offset_hours(config.schedule.utc_offset_hours)
        .with_context(|| {
            format!(
                "invalid utc_offset_hours {}",
                config.schedule.utc_offset_hours
            )
        })?;
    Ok(StationMonitor::new(
        ArrivalFetcher::new(transport, config.api.url.clone()),
        clock,
        panel,
        glyphs,
        config.schedule(),
    ))
}

/// Run against an in-memory panel, printing the board after every cycle.
fn run_headless(
    rt: &Runtime,
    config: &Config,
    glyphs: &GlyphTable,
    max_cycles: Option<u64>,
) -> anyhow::Result<()> {
    let mut monitor = build_monitor(config, glyphs, HeadlessPanel::portrait())?;
    monitor.show_splash()?;
    rt.block_on(monitor.run(max_cycles, |_, arrivals| draw_ascii(arrivals)));
    Ok(())
}

#[cfg(all(target_os = "linux", feature = "hardware"))]
fn run_eink(
    rt: &Runtime,
    config: &Config,
    glyphs: &GlyphTable,
    max_cycles: Option<u64>,
) -> anyhow::Result<()> {
    let panel = hardware::open_panel(&config.display.hardware)?;
    let mut monitor = build_monitor(config, glyphs, panel)?;
    monitor.show_splash().context("draw splash screen")?;
    rt.block_on(monitor.run(max_cycles, |_, _| {}));
    monitor.panel_mut().sleep().context("put display to sleep")?;
    Ok(())
}

#[cfg(not(all(target_os = "linux", feature = "hardware")))]
fn run_eink(
    rt: &Runtime,
    config: &Config,
    glyphs: &GlyphTable,
    max_cycles: Option<u64>,
) -> anyhow::Result<()> {
    log::warn!(
        "E-ink display support not enabled. Rebuild on Linux with --features hardware; \
         showing ASCII output instead"
    );
    run_headless(rt, config, glyphs, max_cycles)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse(env::args().skip(1))?;
    let config = match &args.config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    let glyphs = GlyphTable::load_from_dir(&config.display.glyph_dir);

    // Single-threaded: the loop is sequential and nothing is spawned
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("start tokio runtime")?;

    info!(
        "Station monitor starting ({} mode)",
        if args.development_mode { "stdout" } else { "e-ink" }
    );
    let result = if args.development_mode {
        run_headless(&rt, &config, &glyphs, args.max_cycles())
    } else {
        run_eink(&rt, &config, &glyphs, args.max_cycles())
    };

    if let Err(e) = &result {
        error!("Station monitor stopped: {:#}", e);
    }
    result
}
