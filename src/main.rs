//! gesture-pointer: hand-gesture pointer engine, headless driver.
//!
//! Runs a pointer session against a scripted camera and detector and prints
//! the final session status as an s-expression.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use gesture_pointer::headless::{self, HeadlessOptions};
use gesture_pointer::pointer::Viewport;
use gesture_pointer::PointerConfig;

#[derive(Parser, Debug)]
#[command(name = "gesture-pointer", about = "Hand-gesture pointer engine (headless driver)")]
struct Cli {
    /// Exit after N seconds
    #[arg(long, default_value_t = 10)]
    duration_secs: u64,

    /// Detector callback rate (Hz)
    #[arg(long, default_value_t = 24.0)]
    detector_hz: f64,

    /// Display refresh rate (Hz)
    #[arg(long, default_value_t = 60.0)]
    render_hz: f64,

    /// Viewport size as WIDTHxHEIGHT
    #[arg(long, default_value = "1920x1080")]
    viewport: String,

    /// Config plist file overriding the tuned constants
    #[arg(long)]
    config: Option<PathBuf>,

    /// Activations allowed by the usage gate
    #[arg(long, default_value_t = 3)]
    quota: u32,

    /// Simulate a camera permission denial
    #[arg(long)]
    deny_camera: bool,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("gesture-pointer {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gesture_pointer=info".into()),
        )
        .init();

    info!("gesture-pointer v{} starting", env!("CARGO_PKG_VERSION"));

    let viewport = Viewport::parse(&cli.viewport)
        .ok_or_else(|| anyhow::anyhow!("invalid --viewport {:?}, expected WIDTHxHEIGHT", cli.viewport))?;

    let config = match cli.config {
        Some(ref path) => PointerConfig::load(path)?,
        None => PointerConfig::default(),
    };
    info!("config: {}", config.config_sexp());

    headless::install_signal_handlers();

    let report = headless::run(HeadlessOptions {
        duration: Duration::from_secs(cli.duration_secs),
        detector_hz: cli.detector_hz,
        render_hz: cli.render_hz,
        viewport,
        quota: cli.quota,
        deny_camera: cli.deny_camera,
        config,
    })?;

    info!(
        "Headless run finished: {:?}, {} click(s), {} scroll request(s), offset {:.0}px",
        report.activation, report.clicks, report.scroll_requests, report.scroll_total
    );
    println!("{}", report.status);
    Ok(())
}
